use nom::{multi::many0, number::complete::le_u16};
use serde::{Deserialize, Serialize};

/// Colors a track palette holds.
pub const TRACK_PALETTE_LEN: usize = 64;
/// Colors an obstacle palette holds.
pub const OBSTACLE_PALETTE_LEN: usize = 48;

const CHANNEL_MAX: u16 = 0b11111;

/// GBA 15-bit color, `0bbbbbgg gggrrrrr` little-endian on the wire.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Bgr555(pub u16);

impl Bgr555 {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self((u16::from(r) & CHANNEL_MAX) | ((u16::from(g) & CHANNEL_MAX) << 5) | ((u16::from(b) & CHANNEL_MAX) << 10))
    }

    pub fn r(self) -> u8 {
        (self.0 & CHANNEL_MAX) as u8
    }

    pub fn g(self) -> u8 {
        ((self.0 >> 5) & CHANNEL_MAX) as u8
    }

    pub fn b(self) -> u8 {
        ((self.0 >> 10) & CHANNEL_MAX) as u8
    }

    pub fn to_rgba(self) -> [f32; 4] {
        let cmf = CHANNEL_MAX as f32;
        [self.r() as f32 / cmf, self.g() as f32 / cmf, self.b() as f32 / cmf, 1.]
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<Bgr555>,
}

impl Palette {
    pub fn new(len: usize) -> Self {
        Self { colors: vec![Bgr555::default(); len] }
    }

    pub fn from_bytes(bytes: &[u8], len: usize) -> Self {
        let mut colors: Vec<Bgr555> = many0(le_u16::<_, nom::error::Error<&[u8]>>)(bytes)
            .map(|(_, raw)| raw.into_iter().map(Bgr555).collect())
            .unwrap_or_default();
        colors.truncate(len);
        colors.resize(len, Bgr555::default());
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn color(&self, index: usize) -> Bgr555 {
        self.colors[index]
    }

    pub fn set_color(&mut self, index: usize, color: Bgr555) {
        self.colors[index] = color;
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.colors.iter().flat_map(|c| c.0.to_le_bytes()).collect()
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_packing() {
        let c = Bgr555::from_rgb(31, 0, 31);
        assert_eq!(c.0, 0b111_1100_0001_1111);
        assert_eq!((c.r(), c.g(), c.b()), (31, 0, 31));
    }

    #[test]
    fn test_byte_round_trip() {
        let bytes = [0x1F, 0x00, 0xE0, 0x03, 0x00, 0x7C];
        let palette = Palette::from_bytes(&bytes, 3);
        assert_eq!((palette.color(0).r(), palette.color(1).g(), palette.color(2).b()), (31, 31, 31));
        assert_eq!(palette.to_bytes(), bytes);
    }
}
