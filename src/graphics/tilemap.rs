use serde::{Deserialize, Serialize};

/// Row-major grid of byte tile indices backing a GBA affine background.
/// Track tilemaps are `units * 128` tiles on a side.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AffineTilemap {
    width:   usize,
    height:  usize,
    indices: Vec<u8>,
}

impl AffineTilemap {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, indices: vec![0; width * height] }
    }

    /// Builds a map from decompressed layout bytes, truncating or zero-padding
    /// to the expected dimensions.
    pub fn from_bytes(bytes: &[u8], width: usize, height: usize) -> Self {
        let mut indices = bytes.to_vec();
        indices.resize(width * height, 0);
        Self { width, height, indices }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.indices[x + y * self.width]
    }

    pub fn set(&mut self, x: usize, y: usize, index: u8) {
        self.indices[x + y * self.width] = index;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.indices
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_indexing() {
        let mut map = AffineTilemap::new(4, 2);
        map.set(3, 1, 0xAA);
        assert_eq!(map.as_bytes()[7], 0xAA);
        assert_eq!(map.get(3, 1), 0xAA);
    }

    #[test]
    fn test_from_bytes_pads_short_input() {
        let map = AffineTilemap::from_bytes(&[1, 2, 3], 2, 2);
        assert_eq!(map.as_bytes(), &[1, 2, 3, 0]);
    }
}
