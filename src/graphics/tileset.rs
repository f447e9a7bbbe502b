use nom::multi::many0;
use serde::{Deserialize, Serialize};

use crate::graphics::tile::{PixelFormat, Tile};

/// Number of tiles in a track tileset and in obstacle graphics.
pub const TRACK_TILESET_LEN: usize = 256;
/// Number of tiles in a minimap.
pub const MINIMAP_TILESET_LEN: usize = 64;

/// An ordered run of same-format tiles.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Tileset {
    format: PixelFormat,
    tiles:  Vec<Tile>,
}

impl Tileset {
    pub fn new(tile_count: usize, format: PixelFormat) -> Self {
        Self { format, tiles: vec![Tile::default(); tile_count] }
    }

    /// Decodes `tile_count` tiles from `bytes`. Short input is padded with
    /// empty tiles; some ROM sections decompress to less than a full set.
    pub fn from_bytes(bytes: &[u8], tile_count: usize, format: PixelFormat) -> Self {
        let mut tiles = many0(|i| Tile::parse(i, format))(bytes).map(|(_, tiles)| tiles).unwrap_or_default();
        tiles.truncate(tile_count);
        tiles.resize_with(tile_count, Tile::default);
        Self { format, tiles }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile(&self, index: usize) -> &Tile {
        &self.tiles[index]
    }

    pub fn tile_mut(&mut self, index: usize) -> &mut Tile {
        &mut self.tiles[index]
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.tiles.len() * self.format.tile_data_size());
        for tile in &self.tiles {
            tile.write_to(self.format, &mut out);
        }
        out
    }
}

// -------------------------------------------------------------------------------------------------

/// A track either owns its tileset or borrows another track's by relative
/// definition index. The borrow is resolved lazily so tracks can load in any
/// order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TilesetSource {
    Owned(Tileset),
    Shared(i8),
}

impl TilesetSource {
    pub fn owned(&self) -> Option<&Tileset> {
        match self {
            TilesetSource::Owned(tileset) => Some(tileset),
            TilesetSource::Shared(_) => None,
        }
    }

    pub fn shared_index(&self) -> Option<i8> {
        match self {
            TilesetSource::Owned(_) => None,
            TilesetSource::Shared(index) => Some(*index),
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_round_trip() {
        let bytes: Vec<u8> = (0..128).map(|i| (i * 7) as u8).collect();
        let tileset = Tileset::from_bytes(&bytes, 2, PixelFormat::Bpp8);
        assert_eq!(tileset.len(), 2);
        assert_eq!(tileset.to_bytes(), bytes);
    }

    #[test]
    fn test_short_input_padded_with_empty_tiles() {
        let tileset = Tileset::from_bytes(&[0xFF; 64], 4, PixelFormat::Bpp8);
        assert_eq!(tileset.len(), 4);
        assert_eq!(tileset.tile(0).pixel(0, 0), 0xFF);
        assert_eq!(tileset.tile(3).pixel(0, 0), 0);
    }
}
