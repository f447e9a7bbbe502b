//! Track AI data: a list of shaped zones plus three parallel target sets,
//! one target per zone per set. The game consumes zones through a rasterized
//! zone map, regenerated from the zone list on every export.

use nom::{
    number::complete::{le_u16, le_u8},
    sequence::tuple,
    IResult,
};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AiEditError, AiParseError, ParseErr, RomError},
    gba_utils::{addr::AddrRom, rom::Rom},
};

pub const AI_HEADER_SIZE: usize = 5;
pub const AI_ZONE_SIZE: usize = 12;
pub const AI_TARGET_SIZE: usize = 8;
/// The game always reads three target sets, one per difficulty.
pub const TARGET_SET_COUNT: usize = 3;
/// The wire header counts zones in a single byte.
pub const MAX_ZONES: usize = 255;

/// Zone map cell value for "no zone here".
pub const NO_ZONE: u8 = 0x7F;
/// Or'd into the first and last zone ids in the rasterized map; marks the
/// lap-line endpoints for the rubber-banding code.
pub const ENDPOINT_FLAG: u8 = 0x80;

// -------------------------------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum ZoneShape {
    #[default]
    Rectangle = 0,
    TriangleTopLeft = 1,
    TriangleTopRight = 2,
    TriangleBottomRight = 3,
    TriangleBottomLeft = 4,
}

impl ZoneShape {
    pub fn is_triangle(self) -> bool {
        !matches!(self, ZoneShape::Rectangle)
    }

    /// Step direction away from the right-angle vertex at `(x, y)`, as
    /// `(row_step, col_step)`. `None` for rectangles. Every consumer of
    /// triangle geometry (rasterizer, hit-test, bounds) goes through this so
    /// the four variants cannot drift apart.
    pub fn triangle_steps(self) -> Option<(i32, i32)> {
        match self {
            ZoneShape::Rectangle => None,
            ZoneShape::TriangleTopLeft => Some((1, 1)),
            ZoneShape::TriangleTopRight => Some((1, -1)),
            ZoneShape::TriangleBottomRight => Some((-1, -1)),
            ZoneShape::TriangleBottomLeft => Some((-1, 1)),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// One AI zone. Coordinates and sizes are in zone-map cells (2px each).
/// Triangles keep `width == height`; the right angle sits at `(x, y)` and the
/// hypotenuse runs away from it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct AiZone {
    pub shape:  ZoneShape,
    pub x:      u16,
    pub y:      u16,
    width:      u16,
    height:     u16,
}

impl AiZone {
    pub fn new(x: u16, y: u16, width: u16, height: u16, shape: ZoneShape) -> Self {
        let mut zone = Self { shape, x, y, width: 0, height: 0 };
        zone.resize(width, height);
        zone
    }

    pub fn read(rom: &Rom, addr: AddrRom, index: usize) -> Result<Self, AiParseError> {
        let bytes = rom.slice_at(addr, AI_ZONE_SIZE).map_err(|e| AiParseError::ZoneRead(index, e))?;
        let shape = ZoneShape::try_from(bytes[0]).map_err(|_| AiParseError::ZoneShape(bytes[0]))?;
        let (_, (x, y, width, height)) = tuple((le_u16, le_u16, le_u16, le_u16))(&bytes[1..])
            .map_err(|_: ParseErr| AiParseError::ZoneRead(index, RomError::Parse(addr)))?;
        Ok(Self { shape, x, y, width, height })
    }

    pub fn to_bytes(self) -> [u8; AI_ZONE_SIZE] {
        let mut out = [0; AI_ZONE_SIZE];
        out[0] = self.shape.into();
        out[1..3].copy_from_slice(&self.x.to_le_bytes());
        out[3..5].copy_from_slice(&self.y.to_le_bytes());
        out[5..7].copy_from_slice(&self.width.to_le_bytes());
        out[7..9].copy_from_slice(&self.height.to_le_bytes());
        out
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Sets the zone size. Triangles are kept square: both dimensions become
    /// the larger of the two, so dragging either edge grows the whole shape.
    pub fn resize(&mut self, width: u16, height: u16) {
        if self.shape.is_triangle() {
            let side = width.max(height);
            self.width = side;
            self.height = side;
        } else {
            self.width = width;
            self.height = height;
        }
    }

    /// Inclusive cell bounds `(x0, y0, x1, y1)` of the filled area, saturated
    /// at the ends of the u16 range. Decoded zones may extend past the
    /// coordinate limit.
    pub fn bounding_rect(&self) -> (u16, u16, u16, u16) {
        match self.shape.triangle_steps() {
            None => (self.x, self.y, self.x.saturating_add(self.width), self.y.saturating_add(self.height)),
            Some((row_step, col_step)) => {
                let reach = self.width; // side length minus one
                let (x0, x1) = if col_step > 0 {
                    (self.x, self.x.saturating_add(reach))
                } else {
                    (self.x.saturating_sub(reach), self.x)
                };
                let (y0, y1) = if row_step > 0 {
                    (self.y, self.y.saturating_add(reach))
                } else {
                    (self.y.saturating_sub(reach), self.y)
                };
                (x0, y0, x1, y1)
            }
        }
    }

    pub fn contains(&self, px: u16, py: u16) -> bool {
        match self.shape.triangle_steps() {
            None => {
                let dx = i32::from(px) - i32::from(self.x);
                let dy = i32::from(py) - i32::from(self.y);
                (0..=i32::from(self.width)).contains(&dx) && (0..=i32::from(self.height)).contains(&dy)
            }
            Some((row_step, col_step)) => {
                let side = i32::from(self.width) + 1;
                let dy = (i32::from(py) - i32::from(self.y)) * row_step;
                let dx = (i32::from(px) - i32::from(self.x)) * col_step;
                (0..side).contains(&dy) && (0..side - dy).contains(&dx)
            }
        }
    }

    /// Stamps this zone's id onto a square zone map of `map_width` cells per
    /// side. Rectangle fills are inclusive of both edges; triangles fill
    /// `side - dy` cells on each row walking away from the right angle.
    /// Out-of-bounds cells are skipped.
    pub fn write_zone_map(&self, id: u8, map: &mut [u8], map_width: usize) {
        let in_bounds = |v: i32| (0..map_width as i32).contains(&v);
        match self.shape.triangle_steps() {
            None => {
                for dy in 0..=i32::from(self.height) {
                    let row_y = i32::from(self.y) + dy;
                    if !in_bounds(row_y) {
                        continue;
                    }
                    for dx in 0..=i32::from(self.width) {
                        let col_x = i32::from(self.x) + dx;
                        if in_bounds(col_x) {
                            map[col_x as usize + row_y as usize * map_width] = id;
                        }
                    }
                }
            }
            Some((row_step, col_step)) => {
                let side = i32::from(self.width) + 1;
                for dy in 0..side {
                    let row_y = i32::from(self.y) + dy * row_step;
                    if !in_bounds(row_y) {
                        continue;
                    }
                    for dx in 0..side - dy {
                        let col_x = i32::from(self.x) + dx * col_step;
                        if in_bounds(col_x) {
                            map[col_x as usize + row_y as usize * map_width] = id;
                        }
                    }
                }
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct AiTarget {
    pub x: u16,
    pub y: u16,
    /// 0 (slowest) to 3.
    pub speed: u8,
    /// Set where zone paths cross so the AI does not snap between them.
    pub intersection: bool,
}

impl AiTarget {
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, (x, y, union)) = tuple((le_u16, le_u16, le_u8))(input)?;
        let (input, _) = nom::bytes::complete::take(3usize)(input)?;
        Ok((input, Self { x, y, speed: union & 0x3, intersection: union & 0x80 != 0 }))
    }

    pub fn to_bytes(self) -> [u8; AI_TARGET_SIZE] {
        let union = (self.speed & 0x3) | if self.intersection { 0x80 } else { 0 };
        let mut out = [0; AI_TARGET_SIZE];
        out[0..2].copy_from_slice(&self.x.to_le_bytes());
        out[2..4].copy_from_slice(&self.y.to_le_bytes());
        out[4] = union;
        out
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct AiHeader {
    pub zone_count:     u8,
    pub zones_offset:   u16,
    pub targets_offset: u16,
}

impl AiHeader {
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, (zone_count, zones_offset, targets_offset)) = tuple((le_u8, le_u16, le_u16))(input)?;
        Ok((input, Self { zone_count, zones_offset, targets_offset }))
    }

    pub fn to_bytes(self) -> [u8; AI_HEADER_SIZE] {
        let mut out = [0; AI_HEADER_SIZE];
        out[0] = self.zone_count;
        out[1..3].copy_from_slice(&self.zones_offset.to_le_bytes());
        out[3..5].copy_from_slice(&self.targets_offset.to_le_bytes());
        out
    }
}

// -------------------------------------------------------------------------------------------------

/// Zones plus their targets. Every mutation keeps the three target sets the
/// same length as the zone list; a zone and its targets are inserted and
/// removed together.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackAi {
    zones:       Vec<AiZone>,
    target_sets: [Vec<AiTarget>; TARGET_SET_COUNT],
}

impl TrackAi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(rom: &Rom, addr: AddrRom) -> Result<Self, AiParseError> {
        let header = rom.parse_at(addr, AiHeader::parse).map_err(AiParseError::HeaderRead)?;

        let mut zones = Vec::with_capacity(usize::from(header.zone_count));
        let mut zone_addr = addr + usize::from(header.zones_offset);
        for i in 0..usize::from(header.zone_count) {
            zones.push(AiZone::read(rom, zone_addr, i)?);
            zone_addr += AI_ZONE_SIZE;
        }

        let mut target_sets: [Vec<AiTarget>; TARGET_SET_COUNT] = Default::default();
        let mut target_addr = addr + usize::from(header.targets_offset);
        for (set_index, set) in target_sets.iter_mut().enumerate() {
            for zone_index in 0..usize::from(header.zone_count) {
                let target = rom
                    .parse_at(target_addr, AiTarget::parse)
                    .map_err(|e| AiParseError::TargetRead(set_index, zone_index, e))?;
                set.push(target);
                target_addr += AI_TARGET_SIZE;
            }
        }

        Ok(Self { zones, target_sets })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let header = AiHeader {
            zone_count:     self.zones.len() as u8,
            zones_offset:   AI_HEADER_SIZE as u16,
            targets_offset: (AI_HEADER_SIZE + AI_ZONE_SIZE * self.zones.len()) as u16,
        };
        let mut out = Vec::with_capacity(
            AI_HEADER_SIZE + self.zones.len() * (AI_ZONE_SIZE + TARGET_SET_COUNT * AI_TARGET_SIZE),
        );
        out.extend_from_slice(&header.to_bytes());
        for zone in &self.zones {
            out.extend_from_slice(&zone.to_bytes());
        }
        for set in &self.target_sets {
            for target in set {
                out.extend_from_slice(&target.to_bytes());
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn zones(&self) -> &[AiZone] {
        &self.zones
    }

    pub fn zone(&self, index: usize) -> &AiZone {
        &self.zones[index]
    }

    pub fn zone_mut(&mut self, index: usize) -> &mut AiZone {
        &mut self.zones[index]
    }

    pub fn target(&self, set: usize, index: usize) -> &AiTarget {
        &self.target_sets[set][index]
    }

    pub fn target_mut(&mut self, set: usize, index: usize) -> &mut AiTarget {
        &mut self.target_sets[set][index]
    }

    pub fn insert_zone(&mut self, index: usize, zone: AiZone) -> Result<(), AiEditError> {
        if self.zones.len() >= MAX_ZONES {
            return Err(AiEditError::TooManyZones);
        }
        self.zones.insert(index, zone);
        for set in &mut self.target_sets {
            set.insert(index, AiTarget { x: zone.x, y: zone.y, ..AiTarget::default() });
        }
        Ok(())
    }

    pub fn push_zone(&mut self, zone: AiZone) -> Result<(), AiEditError> {
        self.insert_zone(self.zones.len(), zone)
    }

    pub fn remove_zone(&mut self, index: usize) -> AiZone {
        for set in &mut self.target_sets {
            set.remove(index);
        }
        self.zones.remove(index)
    }

    /// Rasterizes all zones onto a fresh `(track_width * 64)²` map. Cells no
    /// zone covers hold [`NO_ZONE`]; the first and last zone ids carry
    /// [`ENDPOINT_FLAG`]. Later zones overwrite earlier ones.
    pub fn generate_zone_map(&self, track_width: usize) -> Vec<u8> {
        let map_width = track_width * 64;
        let mut map = vec![NO_ZONE; map_width * map_width];
        for (i, zone) in self.zones.iter().enumerate() {
            let mut id = i as u8;
            if i == 0 || i == self.zones.len() - 1 {
                id |= ENDPOINT_FLAG;
            }
            zone.write_zone_map(id, &mut map, map_width);
        }
        map
    }
}

// -------------------------------------------------------------------------------------------------
