//! The 256-byte track header. All section offsets are u32s relative to the
//! header's own address; an offset of 0 means the section is absent. The
//! writer never emits a section at offset 0 (the header itself occupies the
//! first 0x100 bytes of a track blob), so the sentinel cannot collide with
//! real data.

use nom::{
    bytes::complete::take,
    number::complete::{le_i8, le_u16, le_u32, le_u8},
    IResult,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::TrackHeaderError,
    gba_utils::{addr::AddrRom, rom::Rom},
};

pub const MAGIC: u8 = 0x01;
pub const HEADER_SIZE: usize = 0x100;

// -------------------------------------------------------------------------------------------------

/// Which sections are stored as split blocks. Recomputed at write time from
/// the actual section sizes, never trusted from an edited header.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TrackFlags(u8);

impl TrackFlags {
    pub const SPLIT_TILESET: TrackFlags = TrackFlags(1);
    pub const SPLIT_TILEMAP: TrackFlags = TrackFlags(2);
    pub const SPLIT_OBJECTS: TrackFlags = TrackFlags(4);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: TrackFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: TrackFlags) {
        self.0 |= other.0;
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TrackHeader {
    /// Where the header was read from; base of every offset below.
    pub address: AddrRom,

    pub compressed_tileset: bool,
    pub flags: TrackFlags,
    /// Track size in 128-tile units.
    pub track_width: u8,
    pub track_height: u8,
    /// 0 = this track owns its tileset, otherwise a relative definition index.
    pub shared_tileset: i8,

    pub tilemap_offset: u32,
    pub tileset_offset: u32,
    pub tileset_palette_offset: u32,
    pub behaviors_offset: u32,
    pub obstacles_offset: u32,
    pub coins_offset: u32,
    pub item_box_offset: u32,
    pub start_position_offset: u32,
    pub minimap_offset: u32,
    pub ai_offset: u32,
    pub obstacle_gfx_offset: u32,
    pub obstacle_palette_offset: u32,
    pub shared_obstacle_gfx: i8,
}

impl TrackHeader {
    pub fn read(rom: &Rom, address: AddrRom) -> Result<Self, TrackHeaderError> {
        let bytes = rom.slice_at(address, HEADER_SIZE).map_err(TrackHeaderError::IsolatingData)?;
        let magic = bytes[0];
        if magic != MAGIC {
            return Err(TrackHeaderError::Magic(magic));
        }
        let (_, mut header) = Self::parse(bytes).map_err(|_| TrackHeaderError::Magic(magic))?;
        header.address = address;
        Ok(header)
    }

    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, _magic) = le_u8(input)?;
        let (input, compressed_tileset) = le_u16(input)?;
        let (input, flag_bits) = le_u8(input)?;
        let (input, track_width) = le_u8(input)?;
        let (input, track_height) = le_u8(input)?;
        let (input, _) = take(42usize)(input)?;
        let (input, shared_tileset) = le_i8(input)?;
        let (input, _) = take(15usize)(input)?;
        let (input, tilemap_offset) = le_u32(input)?;
        let (input, _) = take(60usize)(input)?;
        let (input, tileset_offset) = le_u32(input)?;
        let (input, tileset_palette_offset) = le_u32(input)?;
        let (input, behaviors_offset) = le_u32(input)?;
        let (input, obstacles_offset) = le_u32(input)?;
        let (input, coins_offset) = le_u32(input)?;
        let (input, item_box_offset) = le_u32(input)?;
        let (input, start_position_offset) = le_u32(input)?;
        let (input, _) = take(40usize)(input)?;
        let (input, minimap_offset) = le_u32(input)?;
        let (input, _) = take(4usize)(input)?;
        let (input, ai_offset) = le_u32(input)?;
        let (input, _) = take(20usize)(input)?;
        let (input, obstacle_gfx_offset) = le_u32(input)?;
        let (input, obstacle_palette_offset) = le_u32(input)?;
        let (input, shared_obstacle_gfx) = le_i8(input)?;
        let (input, _) = take(19usize)(input)?;

        Ok((input, Self {
            address: AddrRom::default(),
            compressed_tileset: compressed_tileset != 0,
            flags: TrackFlags::from_bits(flag_bits),
            track_width,
            track_height,
            shared_tileset,
            tilemap_offset,
            tileset_offset,
            tileset_palette_offset,
            behaviors_offset,
            obstacles_offset,
            coins_offset,
            item_box_offset,
            start_position_offset,
            minimap_offset,
            ai_offset,
            obstacle_gfx_offset,
            obstacle_palette_offset,
            shared_obstacle_gfx,
        }))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        out.push(MAGIC);
        out.extend_from_slice(&u16::from(self.compressed_tileset).to_le_bytes());
        out.push(self.flags.bits());
        out.push(self.track_width);
        out.push(self.track_height);
        out.extend_from_slice(&[0; 42]);
        out.push(self.shared_tileset as u8);
        out.extend_from_slice(&[0; 15]);
        out.extend_from_slice(&self.tilemap_offset.to_le_bytes());
        out.extend_from_slice(&[0; 60]);
        for offset in [
            self.tileset_offset,
            self.tileset_palette_offset,
            self.behaviors_offset,
            self.obstacles_offset,
            self.coins_offset,
            self.item_box_offset,
            self.start_position_offset,
        ] {
            out.extend_from_slice(&offset.to_le_bytes());
        }
        out.extend_from_slice(&[0; 40]);
        out.extend_from_slice(&self.minimap_offset.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&self.ai_offset.to_le_bytes());
        out.extend_from_slice(&[0; 20]);
        out.extend_from_slice(&self.obstacle_gfx_offset.to_le_bytes());
        out.extend_from_slice(&self.obstacle_palette_offset.to_le_bytes());
        out.push(self.shared_obstacle_gfx as u8);
        out.extend_from_slice(&[0; 19]);
        debug_assert_eq!(out.len(), HEADER_SIZE);
        out
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> TrackHeader {
        TrackHeader {
            address: AddrRom(0x258000),
            compressed_tileset: true,
            flags: TrackFlags::from_bits(0b101),
            track_width: 2,
            track_height: 3,
            shared_tileset: -4,
            tilemap_offset: 0x100,
            tileset_offset: 0xDEAD_BEE0,
            tileset_palette_offset: 0x2000,
            behaviors_offset: 0x3000,
            obstacles_offset: 0x4000,
            coins_offset: 0x5000,
            item_box_offset: 0x6000,
            start_position_offset: 0x7000,
            minimap_offset: 0x8000,
            ai_offset: 0x9000,
            obstacle_gfx_offset: 0xA000,
            obstacle_palette_offset: 0xFFFF_FFFF,
            shared_obstacle_gfx: 7,
        }
    }

    #[test]
    fn test_round_trip() {
        let header = sample_header();
        let mut rom_bytes = header.to_bytes();
        rom_bytes.resize(0x200, 0);
        let rom = Rom::new(rom_bytes).unwrap();
        let restored = TrackHeader::read(&rom, AddrRom(0)).unwrap();
        assert_eq!(restored, TrackHeader { address: AddrRom(0), ..header });
    }

    #[test]
    fn test_header_is_one_page() {
        assert_eq!(sample_header().to_bytes().len(), HEADER_SIZE);
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let mut bytes = sample_header().to_bytes();
        bytes[0] = 0xEE;
        let rom = Rom::new(bytes).unwrap();
        assert!(matches!(TrackHeader::read(&rom, AddrRom(0)), Err(TrackHeaderError::Magic(0xEE))));
    }

    #[test]
    fn test_flag_set_operations() {
        let mut flags = TrackFlags::default();
        flags.insert(TrackFlags::SPLIT_TILEMAP);
        assert!(flags.contains(TrackFlags::SPLIT_TILEMAP));
        assert!(!flags.contains(TrackFlags::SPLIT_TILESET));
        assert_eq!(flags.bits(), 2);
    }
}
