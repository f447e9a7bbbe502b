//! Fixed ROM addresses of the game's data tables, per region.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::gba_utils::addr::AddrRom;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Region {
    #[default]
    Usa = 0,
    Japan = 1,
    Europe = 2,
    China = 3,
}

impl Region {
    /// Table of per-cup track definition indices, 4 slots of 4 bytes per cup.
    pub fn cups_table(self) -> Option<AddrRom> {
        match self {
            Region::Usa => Some(AddrRom(0x0E7464)),
            _ => None,
        }
    }

    /// Table of u32 offsets (relative to the table itself) to track headers.
    pub fn track_table(self) -> Option<AddrRom> {
        match self {
            Region::Usa | Region::Europe => Some(AddrRom(0x258000)),
            _ => None,
        }
    }

    /// Pointer table to per-track definition records.
    pub fn definition_table(self) -> Option<AddrRom> {
        match self {
            Region::Usa => Some(AddrRom(0x0E7FEC)),
            _ => None,
        }
    }

    /// Jump table of the obstacle-loader switch; each case hides a pointer to
    /// the track's obstacle table.
    pub fn obstacle_case_table(self) -> Option<AddrRom> {
        match self {
            Region::Usa => Some(AddrRom(0x053DE8)),
            _ => None,
        }
    }
}

/// Case handler address of the loader's default branch (global obstacle table).
pub const OBSTACLE_DEFAULT_CASE: AddrRom = AddrRom(0x053ED4);
/// Address of the global obstacle table used by tracks without a custom one.
pub const OBSTACLE_GLOBAL_TABLE: AddrRom = AddrRom(0x0F1008);

pub const CUP_COUNT: usize = 12;
pub const TRACKS_PER_CUP: usize = 4;
pub const TRACK_COUNT: usize = CUP_COUNT * TRACKS_PER_CUP;
