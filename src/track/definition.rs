//! Per-slot track metadata: the 56-byte definition record pointed at by the
//! definition pointer table, plus the two small records it references through
//! raw bus pointers (turn markers and battle target options).

use nom::{
    bytes::complete::take,
    multi::count,
    number::complete::{le_i32, le_u32, le_u8},
    IResult,
};
use serde::{Deserialize, Serialize};

use crate::gba_utils::addr::Pointer;

pub const DEFINITION_SIZE: usize = 56;
pub const MIN_LAPS: u32 = 1;
pub const MAX_LAPS: u32 = 5;

// -------------------------------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TrackDefinition {
    /// Relative offset into the track table, in table entries.
    pub header_index: i32,
    pub background: u32,
    pub background_behavior: u32,
    pub palette_behavior: u32,
    pub theme: u32,
    pub turns: Pointer,
    pub song_id: u32,
    pub target_options: Pointer,
    pub cover_gfx: Pointer,
    pub cover_palette: Pointer,
    pub locked_palette: Pointer,
    pub name_gfx: Pointer,
    laps: u32,
}

impl TrackDefinition {
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, header_index) = le_i32(input)?;
        let (input, background) = le_u32(input)?;
        let (input, background_behavior) = le_u32(input)?;
        let (input, palette_behavior) = le_u32(input)?;
        let (input, theme) = le_u32(input)?;
        let (input, turns) = le_u32(input)?;
        let (input, song_id) = le_u32(input)?;
        let (input, target_options) = le_u32(input)?;
        let (input, _) = take(4usize)(input)?;
        let (input, cover_gfx) = le_u32(input)?;
        let (input, cover_palette) = le_u32(input)?;
        let (input, locked_palette) = le_u32(input)?;
        let (input, name_gfx) = le_u32(input)?;
        let (input, laps) = le_u32(input)?;

        Ok((input, Self {
            header_index,
            background,
            background_behavior,
            palette_behavior,
            theme,
            turns: Pointer::new(turns),
            song_id,
            target_options: Pointer::new(target_options),
            cover_gfx: Pointer::new(cover_gfx),
            cover_palette: Pointer::new(cover_palette),
            locked_palette: Pointer::new(locked_palette),
            name_gfx: Pointer::new(name_gfx),
            laps: laps.clamp(MIN_LAPS, MAX_LAPS),
        }))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(DEFINITION_SIZE);
        out.extend_from_slice(&self.header_index.to_le_bytes());
        for word in [self.background, self.background_behavior, self.palette_behavior, self.theme] {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out.extend_from_slice(&self.turns.raw().to_le_bytes());
        out.extend_from_slice(&self.song_id.to_le_bytes());
        out.extend_from_slice(&self.target_options.raw().to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        for ptr in [self.cover_gfx, self.cover_palette, self.locked_palette, self.name_gfx] {
            out.extend_from_slice(&ptr.raw().to_le_bytes());
        }
        out.extend_from_slice(&self.laps.to_le_bytes());
        debug_assert_eq!(out.len(), DEFINITION_SIZE);
        out
    }

    pub fn laps(&self) -> u32 {
        self.laps
    }

    /// Lap counts outside 1..=5 hang the game's results screen.
    pub fn set_laps(&mut self, laps: u32) {
        self.laps = laps.clamp(MIN_LAPS, MAX_LAPS);
    }
}

// -------------------------------------------------------------------------------------------------

pub const TURN_MARKER_SIZE: usize = 4;

/// One entry of a track's turn arrow list. `sprite` of -1 hides the arrow.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TurnMarker {
    pub zone:    u8,
    pub time:    u8,
    pub sprite:  i8,
    pub unknown: u8,
}

impl TurnMarker {
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, zone) = le_u8(input)?;
        let (input, time) = le_u8(input)?;
        let (input, sprite) = le_u8(input)?;
        let (input, unknown) = le_u8(input)?;
        Ok((input, Self { zone, time, sprite: sprite as i8, unknown }))
    }

    pub fn to_bytes(self) -> [u8; TURN_MARKER_SIZE] {
        [self.zone, self.time, self.sprite as u8, self.unknown]
    }
}

// -------------------------------------------------------------------------------------------------

const PLACE_OPTIONS: usize = 5;
const PLACES: usize = 8;

/// Battle-mode target option grid: 5 option bytes for each of 8 finishing
/// places, stored place-major.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TargetOptions {
    #[serde(with = "crate::gba_utils::byte_array")]
    options: [u8; PLACE_OPTIONS * PLACES],
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self { options: [0; PLACE_OPTIONS * PLACES] }
    }
}

impl TargetOptions {
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, bytes) = count(le_u8, PLACE_OPTIONS * PLACES)(input)?;
        let mut options = [0; PLACE_OPTIONS * PLACES];
        options.copy_from_slice(&bytes);
        Ok((input, Self { options }))
    }

    pub fn to_bytes(&self) -> [u8; PLACE_OPTIONS * PLACES] {
        self.options
    }

    pub fn get(&self, option: usize, place: usize) -> u8 {
        self.options[option + place * PLACE_OPTIONS]
    }

    pub fn set(&mut self, option: usize, place: usize, value: u8) {
        self.options[option + place * PLACE_OPTIONS] = value;
    }

    /// How many target sets the options refer to; options index sets, so the
    /// count is one past the highest index used.
    pub fn set_count(&self) -> usize {
        self.options.iter().copied().max().unwrap_or(0) as usize + 1
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_round_trip() {
        let mut definition = TrackDefinition {
            header_index: -3,
            background: 2,
            background_behavior: 7,
            palette_behavior: 1,
            theme: 4,
            turns: Pointer::new(0x25_9000),
            song_id: 21,
            target_options: Pointer::NULL,
            cover_gfx: Pointer::new(0x30_0000),
            cover_palette: Pointer::new(0x30_0200),
            locked_palette: Pointer::NULL,
            name_gfx: Pointer::new(0x31_0000),
            laps: 0,
        };
        definition.set_laps(3);
        let bytes = definition.to_bytes();
        assert_eq!(bytes.len(), DEFINITION_SIZE);
        let (rest, restored) = TrackDefinition::parse(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(restored, definition);
    }

    #[test]
    fn test_laps_are_clamped() {
        let mut definition = TrackDefinition::default();
        definition.set_laps(99);
        assert_eq!(definition.laps(), MAX_LAPS);
        definition.set_laps(0);
        assert_eq!(definition.laps(), MIN_LAPS);

        let mut bytes = definition.to_bytes();
        bytes[DEFINITION_SIZE - 4..].copy_from_slice(&200u32.to_le_bytes());
        let (_, restored) = TrackDefinition::parse(&bytes).unwrap();
        assert_eq!(restored.laps(), MAX_LAPS);
    }

    #[test]
    fn test_turn_marker_round_trip() {
        let marker = TurnMarker { zone: 3, time: 60, sprite: -1, unknown: 0 };
        let (_, restored) = TurnMarker::parse(&marker.to_bytes()).unwrap();
        assert_eq!(restored, marker);
    }

    #[test]
    fn test_target_options_layout_is_place_major() {
        let mut options = TargetOptions::default();
        options.set(2, 3, 0xAB);
        assert_eq!(options.to_bytes()[2 + 3 * 5], 0xAB);
        assert_eq!(options.get(2, 3), 0xAB);
    }

    #[test]
    fn test_target_options_serde_round_trip() {
        let mut options = TargetOptions::default();
        options.set(4, 7, 0xCD);
        let json = serde_json::to_string(&options).unwrap();
        let restored: TargetOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, options);
    }

    #[test]
    fn test_set_count_is_max_plus_one() {
        let mut options = TargetOptions::default();
        assert_eq!(options.set_count(), 1);
        options.set(0, 0, 2);
        assert_eq!(options.set_count(), 3);
    }
}
