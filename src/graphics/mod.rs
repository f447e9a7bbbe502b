pub mod palette;
pub mod tile;
pub mod tilemap;
pub mod tileset;

pub use self::{
    palette::{Bgr555, Palette, OBSTACLE_PALETTE_LEN, TRACK_PALETTE_LEN},
    tile::{PixelFormat, Tile},
    tilemap::AffineTilemap,
    tileset::{Tileset, TilesetSource, MINIMAP_TILESET_LEN, TRACK_TILESET_LEN},
};
