//! Display names for the stock cups and tracks, keyed by header index.

use crate::gba_utils::rom_data::{CUP_COUNT, TRACKS_PER_CUP};

pub const CUP_NAMES: [&str; CUP_COUNT] = [
    "Retro Mushroom Cup",
    "Retro Flower Cup",
    "Retro Lightning Cup",
    "Retro Star Cup",
    "Retro Special Cup",
    "Retro Battle",
    "Mushroom Cup",
    "Flower Cup",
    "Lightning Cup",
    "Star Cup",
    "Special Cup",
    "Battle",
];

/// Header index of each cup slot, cup-major. The SNES tracks sit at the end
/// of the header table; the MKSC tracks are stored out of play order.
const CUP_TRACKS: [i32; CUP_COUNT * TRACKS_PER_CUP] = [
    32, 33, 34, 35, // SNES Mushroom
    36, 37, 38, 39, // SNES Flower
    40, 41, 42, 43, // SNES Lightning
    44, 45, 46, 47, // SNES Star
    48, 49, 50, 51, // SNES Special
    52, 53, 54, 55, // SNES Battle
    4, 5, 9, 7, // Mushroom
    12, 17, 18, 11, // Flower
    8, 20, 13, 6, // Lightning
    16, 14, 10, 15, // Star
    23, 21, 22, 19, // Special
    24, 25, 26, 27, // Battle
];

const TRACK_NAMES: [&str; CUP_COUNT * TRACKS_PER_CUP] = [
    "SNES Mario Circuit 1",
    "SNES Donut Plains 1",
    "SNES Ghost Valley 1",
    "SNES Bowser Castle 1",
    "SNES Mario Circuit 2",
    "SNES Choco Island 1",
    "SNES Ghost Valley 2",
    "SNES Donut Plains 2",
    "SNES Bowser Castle 2",
    "SNES Mario Circuit 3",
    "SNES Koopa Beach 1",
    "SNES Choco Island 2",
    "SNES Vanilla Lake 1",
    "SNES Bowser Castle 3",
    "SNES Mario Circuit 4",
    "SNES Donut Plains 3",
    "SNES Koopa Beach 2",
    "SNES Ghost Valley 3",
    "SNES Vanilla Lake 2",
    "SNES Rainbow Road",
    "SNES Battle Course 1",
    "SNES Battle Course 2",
    "SNES Battle Course 3",
    "SNES Battle Course 4",
    "Peach Circuit",
    "Shy Guy Beach",
    "Riverside Park",
    "Bowser Castle 1",
    "Mario Circuit",
    "Boo Lake",
    "Cheese Land",
    "Bowser Castle 2",
    "Luigi Circuit",
    "Sky Garden",
    "Cheep Cheep Island",
    "Sunset Wilds",
    "Snow Land",
    "Ribbon Road",
    "Yoshi Desert",
    "Bowser Castle 3",
    "Lakeside Park",
    "Broken Pier",
    "Bowser Castle 4",
    "Rainbow Road",
    "Battle Course 1",
    "Battle Course 2",
    "Battle Course 3",
    "Battle Course 4",
];

/// Name of the track a header index belongs to, if it is a stock slot.
pub fn name_from_header_index(header_index: i32) -> Option<&'static str> {
    CUP_TRACKS.iter().position(|&idx| idx == header_index).map(|i| TRACK_NAMES[i])
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_lookups() {
        assert_eq!(name_from_header_index(4), Some("Peach Circuit"));
        assert_eq!(name_from_header_index(32), Some("SNES Mario Circuit 1"));
        assert_eq!(name_from_header_index(19), Some("Rainbow Road"));
        assert_eq!(name_from_header_index(0), None);
    }

    #[test]
    fn test_every_cup_slot_has_a_name() {
        for idx in CUP_TRACKS {
            assert!(name_from_header_index(idx).is_some());
        }
    }
}
