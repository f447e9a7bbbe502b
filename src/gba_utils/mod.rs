pub mod addr;
pub mod rom;
pub mod rom_data;

/// Serde support for byte arrays longer than the 32 elements serde derives
/// handle out of the box. Annotate the field with
/// `#[serde(with = "crate::gba_utils::byte_array")]`.
pub mod byte_array {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        let len = bytes.len();
        bytes.try_into().map_err(|_| D::Error::invalid_length(len, &"a fixed-length byte array"))
    }
}
