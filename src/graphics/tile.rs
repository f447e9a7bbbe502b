use nom::{bytes::complete::take, IResult};
use serde::{Deserialize, Serialize};

pub const TILE_SIZE: usize = 8;
pub const N_PIXELS_IN_TILE: usize = TILE_SIZE * TILE_SIZE;

/// Bits per palette index of a tile's pixels.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PixelFormat {
    Bpp4,
    Bpp8,
}

impl PixelFormat {
    /// Encoded size of one tile in bytes.
    pub fn tile_data_size(self) -> usize {
        match self {
            PixelFormat::Bpp4 => 32,
            PixelFormat::Bpp8 => 64,
        }
    }

    pub fn index_mask(self) -> u8 {
        match self {
            PixelFormat::Bpp4 => 0x0F,
            PixelFormat::Bpp8 => 0xFF,
        }
    }
}

/// One 8x8 tile of palette indices, stored unpacked regardless of the wire
/// format it was decoded from.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    #[serde(with = "crate::gba_utils::byte_array")]
    pixels: [u8; N_PIXELS_IN_TILE],
}

impl Default for Tile {
    fn default() -> Self {
        Self { pixels: [0; N_PIXELS_IN_TILE] }
    }
}

impl Tile {
    pub fn parse(input: &[u8], format: PixelFormat) -> IResult<&[u8], Self> {
        match format {
            PixelFormat::Bpp4 => Self::from_4bpp(input),
            PixelFormat::Bpp8 => Self::from_8bpp(input),
        }
    }

    /// Two pixels per byte, low nibble first.
    pub fn from_4bpp(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, bytes) = take(32usize)(input)?;
        let mut tile = Tile::default();
        for (i, byte) in bytes.iter().enumerate() {
            tile.pixels[i * 2] = byte & 0xF;
            tile.pixels[i * 2 + 1] = byte >> 4;
        }
        Ok((input, tile))
    }

    pub fn from_8bpp(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, bytes) = take(N_PIXELS_IN_TILE)(input)?;
        let mut tile = Tile::default();
        tile.pixels.copy_from_slice(bytes);
        Ok((input, tile))
    }

    pub fn write_to(&self, format: PixelFormat, out: &mut Vec<u8>) {
        match format {
            PixelFormat::Bpp4 => {
                for pair in self.pixels.chunks_exact(2) {
                    out.push(((pair[1] & 0xF) << 4) | (pair[0] & 0xF));
                }
            }
            PixelFormat::Bpp8 => out.extend_from_slice(&self.pixels),
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[x + y * TILE_SIZE]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, index: u8, format: PixelFormat) {
        self.pixels[x + y * TILE_SIZE] = index & format.index_mask();
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_4bpp_nibble_order() {
        let mut data = vec![0u8; 32];
        data[0] = 0x21; // pixel 0 = 1, pixel 1 = 2
        let (_, tile) = Tile::from_4bpp(&data).unwrap();
        assert_eq!(tile.pixel(0, 0), 1);
        assert_eq!(tile.pixel(1, 0), 2);

        let mut out = Vec::new();
        tile.write_to(PixelFormat::Bpp4, &mut out);
        assert_eq!(out, data);
    }

    #[test]
    fn test_8bpp_round_trip() {
        let data: Vec<u8> = (0..64).collect();
        let (_, tile) = Tile::from_8bpp(&data).unwrap();
        assert_eq!(tile.pixel(7, 7), 63);

        let mut out = Vec::new();
        tile.write_to(PixelFormat::Bpp8, &mut out);
        assert_eq!(out, data);
    }

    #[test]
    fn test_serde_round_trip() {
        let data: Vec<u8> = (0..64).collect();
        let (_, tile) = Tile::from_8bpp(&data).unwrap();
        let json = serde_json::to_string(&tile).unwrap();
        let restored: Tile = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, tile);
    }

    #[test]
    fn test_set_pixel_masks_by_format() {
        let mut tile = Tile::default();
        tile.set_pixel(3, 3, 0xAB, PixelFormat::Bpp4);
        assert_eq!(tile.pixel(3, 3), 0x0B);
        tile.set_pixel(3, 3, 0xAB, PixelFormat::Bpp8);
        assert_eq!(tile.pixel(3, 3), 0xAB);
    }
}
