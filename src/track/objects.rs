//! Object data: placement lists (obstacles, item boxes, coins, start
//! positions) and the per-track obstacle table the placement ids index into.

use itertools::Itertools;
use nom::{
    number::complete::{le_i16, le_u8},
    sequence::tuple,
    IResult,
};
use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};

use crate::{
    allocator::RomAllocator,
    error::{ObjectParseError, TrackWriteError},
    gba_utils::{
        addr::{AddrRom, Pointer},
        rom::Rom,
        rom_data::{Region, OBSTACLE_DEFAULT_CASE, OBSTACLE_GLOBAL_TABLE},
    },
};

pub const OBJECT_PLACEMENT_SIZE: usize = 4;

/// Tracks whose definition index falls outside this range share the global
/// obstacle table and cannot carry a custom one.
pub const CUSTOM_TABLE_INDICES: std::ops::Range<usize> = 4..30;
/// Number of slots in the obstacle-loader jump table.
pub const OBSTACLE_CASE_COUNT: usize = 24;

/// Placement ids 0 and 1 are the two fixed entries every table starts with;
/// real obstacles are indexed from 2.
pub const OBSTACLE_INDEX_BIAS: usize = 2;

/// Thumb code of a replacement case stub: `ldr r1, [pc, #4]; ldr r0, [pc, #8];
/// bx r0`, padded to a word. Expects the table address and the loader-tail
/// address in the following two words.
const STUB_CODE: [u8; 8] = [0x01, 0x49, 0x02, 0x48, 0x00, 0x47, 0x00, 0x00];
/// Address of the loader tail the replacement stub jumps back into.
const STUB_RETURN: [u8; 4] = [0xD7, 0x3E, 0x05, 0x08];

// -------------------------------------------------------------------------------------------------

/// One entry of a placement list. `zone` is the AI zone map cell under the
/// object, regenerated at write time. A zero `id` terminates a list.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ObjectPlacement {
    pub id:   u8,
    pub x:    u8,
    pub y:    u8,
    pub zone: u8,
}

impl ObjectPlacement {
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, (id, x, y, zone)) = tuple((le_u8, le_u8, le_u8, le_u8))(input)?;
        Ok((input, Self { id, x, y, zone }))
    }

    pub fn to_bytes(self) -> [u8; OBJECT_PLACEMENT_SIZE] {
        [self.id, self.x, self.y, self.zone]
    }
}

/// Reads placements until an entry with a zero id.
pub fn read_placement_list(rom: &Rom, addr: AddrRom) -> Result<Vec<ObjectPlacement>, ObjectParseError> {
    let mut placements = Vec::new();
    let mut at = addr;
    loop {
        let placement =
            rom.parse_at(at, ObjectPlacement::parse).map_err(|e| ObjectParseError::PlacementRead(addr, e))?;
        if placement.id == 0 {
            break;
        }
        placements.push(placement);
        at += OBJECT_PLACEMENT_SIZE;
    }
    Ok(placements)
}

pub fn write_placement_list(placements: &[ObjectPlacement], out: &mut Vec<u8>) {
    for placement in placements {
        out.extend_from_slice(&placement.to_bytes());
    }
    out.extend_from_slice(&[0; OBJECT_PLACEMENT_SIZE]);
}

// -------------------------------------------------------------------------------------------------

/// An obstacle kind with its spawn parameter, as stored in obstacle tables
/// (parameter first, kind second on the wire).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Obstacle {
    pub kind:      i16,
    pub parameter: i16,
}

impl Obstacle {
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, (parameter, kind)) = tuple((le_i16, le_i16))(input)?;
        Ok((input, Self { kind, parameter }))
    }

    pub fn to_bytes(self) -> [u8; 4] {
        let mut out = [0; 4];
        out[0..2].copy_from_slice(&self.parameter.to_le_bytes());
        out[2..4].copy_from_slice(&self.kind.to_le_bytes());
        out
    }
}

/// The obstacle table a track's placement ids resolve through. Holds only the
/// real obstacles; the two fixed lead entries (a null and a `kind = -1`
/// marker) are implicit and re-emitted on write.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObstacleTable {
    obstacles: Vec<Obstacle>,
}

impl ObstacleTable {
    /// Builds a table of the distinct obstacles the placements use, in first
    /// occurrence order.
    pub fn from_placements(placements: &[ObstaclePlacement]) -> Self {
        Self { obstacles: placements.iter().map(|p| p.obstacle).unique().collect() }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Resolves a placement id. Ids below [`OBSTACLE_INDEX_BIAS`] are the
    /// fixed lead entries.
    pub fn get(&self, id: usize) -> Option<Obstacle> {
        match id {
            0 => Some(Obstacle { kind: 0, parameter: 0 }),
            1 => Some(Obstacle { kind: -1, parameter: 0 }),
            _ => self.obstacles.get(id - OBSTACLE_INDEX_BIAS).copied(),
        }
    }

    /// Placement id of `obstacle` in this table.
    pub fn index_of(&self, obstacle: Obstacle) -> Result<usize, ObjectParseError> {
        self.obstacles
            .iter()
            .position(|o| *o == obstacle)
            .map(|i| i + OBSTACLE_INDEX_BIAS)
            .ok_or(ObjectParseError::UnknownObstacle(obstacle))
    }

    /// Serialized table size in bytes, lead entries and terminator included.
    pub fn byte_size(&self) -> u32 {
        (self.obstacles.len() as u32 + 3) * 4
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_size() as usize);
        out.extend_from_slice(&Obstacle { kind: 0, parameter: 0 }.to_bytes());
        out.extend_from_slice(&Obstacle { kind: -1, parameter: 0 }.to_bytes());
        for obstacle in &self.obstacles {
            out.extend_from_slice(&obstacle.to_bytes());
        }
        // Second zero-kind entry terminates the table.
        out.extend_from_slice(&[0; 4]);
        out
    }

    /// Locates and reads the obstacle table for a track: follow the loader's
    /// jump table slot; the table pointer sits 4 bytes into the game's own
    /// case stubs and 8 bytes into a replacement stub, and the default case
    /// uses the fixed global table.
    pub fn read_from_rom(rom: &Rom, track_index: usize) -> Result<Self, ObjectParseError> {
        let case_table = Region::default()
            .obstacle_case_table()
            .ok_or(ObjectParseError::NoCustomTable(track_index))?;

        let case_index = track_index.wrapping_sub(4);
        let table_addr = if case_index < OBSTACLE_CASE_COUNT {
            let case_ptr =
                rom.read_pointer_at(case_table + case_index * 4).map_err(ObjectParseError::TableRead)?;
            let case_addr = case_ptr.address();
            if case_addr == OBSTACLE_DEFAULT_CASE {
                OBSTACLE_GLOBAL_TABLE
            } else {
                let pointer_slot = match rom.slice_at(case_addr, STUB_CODE.len()) {
                    Ok(code) if code == STUB_CODE => case_addr + STUB_CODE.len(),
                    _ => case_addr + 4usize,
                };
                rom.read_pointer_at(pointer_slot).map_err(ObjectParseError::TableRead)?.address()
            }
        } else {
            OBSTACLE_GLOBAL_TABLE
        };

        Self::read_at(rom, table_addr)
    }

    /// Reads a raw table: entries until the second zero kind (the first is the
    /// fixed null lead entry), then strips the lead entries back off.
    pub fn read_at(rom: &Rom, addr: AddrRom) -> Result<Self, ObjectParseError> {
        let mut entries = Vec::new();
        let mut at = addr;
        let mut zero_seen = false;
        loop {
            let obstacle = rom.parse_at(at, Obstacle::parse).map_err(ObjectParseError::TableRead)?;
            at += 4usize;
            if obstacle.kind == 0 {
                if zero_seen {
                    break;
                }
                zero_seen = true;
            }
            entries.push(obstacle);
        }
        let obstacles = if entries.len() > OBSTACLE_INDEX_BIAS { entries.split_off(OBSTACLE_INDEX_BIAS) } else { Vec::new() };
        Ok(Self { obstacles })
    }

    /// Writes this table into freshly allocated space and repoints the
    /// track's jump-table slot at a 16-byte thumb stub that jumps to the
    /// shared loader tail with the new table address.
    pub fn write_to_rom(
        &self,
        rom: &mut Rom,
        allocator: &mut RomAllocator,
        track_index: usize,
    ) -> Result<Pointer, TrackWriteError> {
        if !CUSTOM_TABLE_INDICES.contains(&track_index) {
            return Err(TrackWriteError::Objects(ObjectParseError::NoCustomTable(track_index)));
        }
        let case_table = Region::default()
            .obstacle_case_table()
            .ok_or(TrackWriteError::Objects(ObjectParseError::NoCustomTable(track_index)))?;

        let stub_ptr = allocator.allocate(0x10).map_err(TrackWriteError::Alloc)?;
        let table_ptr = allocator.allocate(self.byte_size()).map_err(TrackWriteError::Alloc)?;

        rom.write_at(table_ptr.address(), &self.to_bytes())
            .map_err(|e| TrackWriteError::SectionWrite("obstacle table", e))?;

        let mut stub = Vec::with_capacity(0x10);
        stub.extend_from_slice(&STUB_CODE);
        stub.extend_from_slice(&table_ptr.raw().to_le_bytes());
        stub.extend_from_slice(&STUB_RETURN);
        rom.write_at(stub_ptr.address(), &stub)
            .map_err(|e| TrackWriteError::SectionWrite("obstacle stub", e))?;

        rom.write_pointer_at(case_table + (track_index - 4) * 4, stub_ptr)
            .map_err(|e| TrackWriteError::SectionWrite("obstacle case slot", e))?;

        Ok(table_ptr)
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, IntoPrimitive, FromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum StartingPlace {
    #[default]
    First = 1,
    Second = 2,
    Third = 3,
    Fourth = 4,
    Fifth = 5,
    Sixth = 6,
    Seventh = 7,
    Eighth = 8,
    SinglePakFirst = 9,
    SinglePakSecond = 10,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StartPosition {
    pub x:     u8,
    pub y:     u8,
    pub place: StartingPlace,
}

impl StartPosition {
    /// The stored id carries the place in its low bits; bit 7 is a runtime
    /// flag the loader ignores.
    pub fn from_placement(placement: ObjectPlacement) -> Self {
        Self { x: placement.x, y: placement.y, place: StartingPlace::from(placement.id & !0x80) }
    }

    pub fn to_placement(self, zone: u8) -> ObjectPlacement {
        ObjectPlacement { id: self.place.into(), x: self.x, y: self.y, zone }
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ObstaclePlacement {
    pub obstacle: Obstacle,
    pub x:        u8,
    pub y:        u8,
}

/// Everything placeable on a track.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackObjects {
    pub obstacles:       Vec<ObstaclePlacement>,
    pub item_boxes:      Vec<(u8, u8)>,
    pub coins:           Vec<(u8, u8)>,
    pub start_positions: Vec<StartPosition>,
}

impl TrackObjects {
    /// The distinct obstacles in placement order, ready to become this
    /// track's table.
    pub fn obstacle_table(&self) -> ObstacleTable {
        ObstacleTable::from_placements(&self.obstacles)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_from(mut bytes: Vec<u8>) -> Rom {
        bytes.resize((bytes.len() + 3) & !3, 0);
        Rom::new(bytes).unwrap()
    }

    #[test]
    fn test_placement_list_stops_at_zero_id() {
        let rom = rom_from(vec![5, 10, 20, 1, 0, 0, 0, 0]);
        let placements = read_placement_list(&rom, AddrRom(0)).unwrap();
        assert_eq!(placements, vec![ObjectPlacement { id: 5, x: 10, y: 20, zone: 1 }]);
    }

    #[test]
    fn test_placement_list_round_trip() {
        let placements = vec![
            ObjectPlacement { id: 2, x: 1, y: 2, zone: 3 },
            ObjectPlacement { id: 3, x: 4, y: 5, zone: 6 },
        ];
        let mut bytes = Vec::new();
        write_placement_list(&placements, &mut bytes);
        assert_eq!(bytes.len(), 12);
        let restored = read_placement_list(&rom_from(bytes), AddrRom(0)).unwrap();
        assert_eq!(restored, placements);
    }

    #[test]
    fn test_obstacle_wire_order_is_parameter_first() {
        let obstacle = Obstacle { kind: 0x0102, parameter: 0x0304 };
        assert_eq!(obstacle.to_bytes(), [0x04, 0x03, 0x02, 0x01]);
        let (_, restored) = Obstacle::parse(&obstacle.to_bytes()).unwrap();
        assert_eq!(restored, obstacle);
    }

    #[test]
    fn test_table_round_trip_through_raw_bytes() {
        let table = ObstacleTable {
            obstacles: vec![Obstacle { kind: 3, parameter: 1 }, Obstacle { kind: 7, parameter: 0 }],
        };
        let bytes = table.to_bytes();
        assert_eq!(bytes.len(), table.byte_size() as usize);
        let restored = ObstacleTable::read_at(&rom_from(bytes), AddrRom(0)).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn test_table_indexing_is_biased_past_lead_entries() {
        let table = ObstacleTable { obstacles: vec![Obstacle { kind: 9, parameter: 2 }] };
        assert_eq!(table.index_of(Obstacle { kind: 9, parameter: 2 }).unwrap(), 2);
        assert_eq!(table.get(2), Some(Obstacle { kind: 9, parameter: 2 }));
        assert_eq!(table.get(1), Some(Obstacle { kind: -1, parameter: 0 }));
        assert!(table.get(3).is_none());
        assert!(matches!(
            table.index_of(Obstacle { kind: 1, parameter: 1 }),
            Err(ObjectParseError::UnknownObstacle(_))
        ));
    }

    #[test]
    fn test_from_placements_dedups_in_order() {
        let a = Obstacle { kind: 1, parameter: 0 };
        let b = Obstacle { kind: 2, parameter: 0 };
        let placements = vec![
            ObstaclePlacement { obstacle: a, x: 0, y: 0 },
            ObstaclePlacement { obstacle: b, x: 1, y: 0 },
            ObstaclePlacement { obstacle: a, x: 2, y: 0 },
        ];
        assert_eq!(ObstacleTable::from_placements(&placements).obstacles(), &[a, b]);
    }

    #[test]
    fn test_custom_table_write_patches_case_slot() {
        let case_table = Region::Usa.obstacle_case_table().unwrap();
        let mut rom = Rom::new(vec![0; 0x60000]).unwrap();
        let mut allocator = RomAllocator::new(vec![crate::allocator::RomSpan {
            address: 0x58000,
            length: 0x1000,
        }]);
        let table = ObstacleTable { obstacles: vec![Obstacle { kind: 4, parameter: 0 }] };
        let table_ptr = table.write_to_rom(&mut rom, &mut allocator, 6).unwrap();

        let stub_ptr = rom.read_pointer_at(case_table + 2usize * 4).unwrap();
        let stub = rom.slice_at(stub_ptr.address(), 16).unwrap();
        assert_eq!(&stub[..8], &STUB_CODE);
        assert_eq!(&stub[8..12], &table_ptr.raw().to_le_bytes());
        assert_eq!(&stub[12..], &STUB_RETURN);

        let restored = ObstacleTable::read_from_rom(&rom, 6).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn test_shared_table_tracks_reject_custom_writes() {
        let mut rom = Rom::new(vec![0; 4]).unwrap();
        let mut allocator = RomAllocator::default();
        let table = ObstacleTable::default();
        assert!(matches!(
            table.write_to_rom(&mut rom, &mut allocator, 1),
            Err(TrackWriteError::Objects(ObjectParseError::NoCustomTable(1)))
        ));
    }

    #[test]
    fn test_start_position_id_masks_the_runtime_flag() {
        let placement = ObjectPlacement { id: 0x83, x: 7, y: 9, zone: 0 };
        let start = StartPosition::from_placement(placement);
        assert_eq!(start.place, StartingPlace::Third);
        assert_eq!(start.to_placement(5), ObjectPlacement { id: 3, x: 7, y: 9, zone: 5 });
    }
}
