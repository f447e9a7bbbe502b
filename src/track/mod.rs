//! The track model and its full ROM load/save pipeline.

pub mod ai;
pub mod definition;
pub mod header;
pub mod objects;

use crate::{
    allocator::RomAllocator,
    compression::{lz77, split::{split_compress, split_decompress}, MAX_PARTS},
    error::{ObjectParseError, RomError, TrackParseError, TrackWriteError},
    gba_utils::{
        addr::{AddrRom, Pointer},
        rom::Rom,
        rom_data::{Region, TRACK_COUNT},
    },
    graphics::{
        AffineTilemap, Palette, PixelFormat, Tileset, TilesetSource, MINIMAP_TILESET_LEN, OBSTACLE_PALETTE_LEN,
        TRACK_PALETTE_LEN, TRACK_TILESET_LEN,
    },
    track::{
        ai::TrackAi,
        definition::TrackDefinition,
        header::{TrackFlags, TrackHeader, HEADER_SIZE},
        objects::{
            read_placement_list, write_placement_list, ObjectPlacement, ObstaclePlacement, StartPosition,
            TrackObjects,
        },
    },
};

pub const BEHAVIORS_SIZE: usize = 256;
/// Track dimensions are stored in units of 128 tiles.
pub const TILES_PER_UNIT: usize = 128;

// -------------------------------------------------------------------------------------------------

/// The gameplay settings split between the definition and the header.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackConfig {
    /// Size in 128-tile units.
    pub width:  u8,
    pub height: u8,
    pub background: u32,
    pub background_behavior: u32,
    pub palette_behavior: u32,
    pub theme: u32,
    pub song_id: u32,
    pub laps: u32,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            width: 2,
            height: 2,
            background: 0,
            background_behavior: 1,
            palette_behavior: 1,
            theme: 2,
            song_id: 25,
            laps: 3,
        }
    }
}

// -------------------------------------------------------------------------------------------------

pub struct Track {
    pub config: TrackConfig,
    /// The raw definition record; carries the pointers this crate does not
    /// model (covers, name graphics) through a round trip untouched.
    pub definition: TrackDefinition,
    pub tileset: TilesetSource,
    pub tileset_palette: Palette,
    pub tilemap: AffineTilemap,
    pub minimap: Tileset,
    pub behaviors: Vec<u8>,
    pub obstacle_gfx: Option<TilesetSource>,
    pub obstacle_palette: Option<Palette>,
    pub objects: TrackObjects,
    pub ai: TrackAi,
}

impl Default for Track {
    fn default() -> Self {
        let config = TrackConfig::default();
        let side = usize::from(config.width) * TILES_PER_UNIT;
        Self {
            tileset: TilesetSource::Owned(Tileset::new(TRACK_TILESET_LEN, PixelFormat::Bpp8)),
            tileset_palette: Palette::new(TRACK_PALETTE_LEN),
            tilemap: AffineTilemap::new(side, side),
            minimap: Tileset::new(MINIMAP_TILESET_LEN, PixelFormat::Bpp4),
            behaviors: vec![0; BEHAVIORS_SIZE],
            obstacle_gfx: Some(TilesetSource::Owned(Tileset::new(TRACK_TILESET_LEN, PixelFormat::Bpp4))),
            obstacle_palette: Some(Palette::new(OBSTACLE_PALETTE_LEN)),
            objects: TrackObjects::default(),
            ai: TrackAi::new(),
            definition: TrackDefinition::default(),
            config,
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Loading

pub(crate) fn read_definition(rom: &Rom, index: usize) -> Result<(TrackDefinition, AddrRom), TrackParseError> {
    if index >= TRACK_COUNT {
        return Err(TrackParseError::InvalidIndex(index));
    }
    let table = Region::default().definition_table().ok_or(TrackParseError::InvalidIndex(index))?;
    let ptr = rom.read_pointer_at(table + index * 4).map_err(TrackParseError::DefinitionRead)?;
    let (_, definition) = TrackDefinition::parse(
        rom.slice_at(ptr.address(), definition::DEFINITION_SIZE).map_err(TrackParseError::DefinitionRead)?,
    )
    .map_err(|_| TrackParseError::DefinitionRead(RomError::Parse(ptr.address())))?;
    Ok((definition, ptr.address()))
}

pub(crate) fn read_header(rom: &Rom, header_index: i32) -> Result<TrackHeader, TrackParseError> {
    let table = Region::default()
        .track_table()
        .ok_or(TrackParseError::InvalidIndex(header_index as usize))?;
    let offset = rom
        .parse_at(table + header_index as usize * 4, nom::number::complete::le_u32)
        .map_err(TrackParseError::HeaderRead)?;
    // Table offsets are the 32-bit difference the game adds back with
    // wraparound; blobs placed below the table store a wrapped value.
    let address = AddrRom((table.0 as u32).wrapping_add(offset) as usize);
    TrackHeader::read(rom, address).map_err(TrackParseError::Header)
}

/// Decompresses a section, plain or split depending on the header flag that
/// covers it.
fn read_section(
    rom: &Rom,
    header: &TrackHeader,
    offset: u32,
    split: bool,
    name: &'static str,
) -> Result<Vec<u8>, TrackParseError> {
    let source = rom
        .slice_from(header.address + offset as usize)
        .map_err(|e| TrackParseError::SectionRead(name, e))?;
    if split {
        split_decompress(source, MAX_PARTS)
            .map_err(|e| TrackParseError::SectionDecompress(name, e.into()))
    } else {
        lz77::decompress(source).map_err(|e| TrackParseError::SectionDecompress(name, e.into()))
    }
}

impl Track {
    pub fn from_rom(rom: &Rom, track_index: usize) -> Result<Self, TrackParseError> {
        let (definition, _) = read_definition(rom, track_index)?;
        let header = read_header(rom, definition.header_index)?;

        let config = TrackConfig {
            width: header.track_width,
            height: header.track_height,
            background: definition.background,
            background_behavior: definition.background_behavior,
            palette_behavior: definition.palette_behavior,
            theme: definition.theme,
            song_id: definition.song_id,
            laps: definition.laps(),
        };

        let palette_bytes = rom
            .slice_at(header.address + header.tileset_palette_offset as usize, TRACK_PALETTE_LEN * 2)
            .map_err(|e| TrackParseError::SectionRead("palette", e))?;
        let tileset_palette = Palette::from_bytes(palette_bytes, TRACK_PALETTE_LEN);

        let tileset = if header.shared_tileset != 0 {
            TilesetSource::Shared(header.shared_tileset)
        } else {
            let bytes = read_section(
                rom,
                &header,
                header.tileset_offset,
                header.flags.contains(TrackFlags::SPLIT_TILESET),
                "tileset",
            )?;
            TilesetSource::Owned(Tileset::from_bytes(&bytes, TRACK_TILESET_LEN, PixelFormat::Bpp8))
        };

        let side_w = usize::from(header.track_width) * TILES_PER_UNIT;
        let side_h = usize::from(header.track_height) * TILES_PER_UNIT;
        let tilemap_bytes = read_section(
            rom,
            &header,
            header.tilemap_offset,
            header.flags.contains(TrackFlags::SPLIT_TILEMAP),
            "tilemap",
        )?;
        let tilemap = AffineTilemap::from_bytes(&tilemap_bytes, side_w, side_h);

        let minimap_bytes = read_section(rom, &header, header.minimap_offset, false, "minimap")?;
        let minimap = Tileset::from_bytes(&minimap_bytes, MINIMAP_TILESET_LEN, PixelFormat::Bpp4);

        let behaviors = rom
            .slice_at(header.address + header.behaviors_offset as usize, BEHAVIORS_SIZE)
            .map_err(|e| TrackParseError::SectionRead("behaviors", e))?
            .to_vec();

        let obstacle_gfx = if header.obstacle_gfx_offset == 0 {
            None
        } else if header.shared_obstacle_gfx != 0 {
            Some(TilesetSource::Shared(header.shared_obstacle_gfx))
        } else {
            let bytes = read_section(
                rom,
                &header,
                header.obstacle_gfx_offset,
                header.flags.contains(TrackFlags::SPLIT_OBJECTS),
                "obstacle gfx",
            )?;
            Some(TilesetSource::Owned(Tileset::from_bytes(&bytes, TRACK_TILESET_LEN, PixelFormat::Bpp4)))
        };

        let obstacle_palette = if header.obstacle_palette_offset == 0 {
            None
        } else {
            let bytes = rom
                .slice_at(header.address + header.obstacle_palette_offset as usize, OBSTACLE_PALETTE_LEN * 2)
                .map_err(|e| TrackParseError::SectionRead("obstacle palette", e))?;
            Some(Palette::from_bytes(bytes, OBSTACLE_PALETTE_LEN))
        };

        let objects = Self::read_objects(rom, &header, track_index).map_err(TrackParseError::Objects)?;

        let ai = if header.ai_offset == 0 {
            TrackAi::new()
        } else {
            TrackAi::read(rom, header.address + header.ai_offset as usize).map_err(TrackParseError::Ai)?
        };

        Ok(Self {
            config,
            definition,
            tileset,
            tileset_palette,
            tilemap,
            minimap,
            behaviors,
            obstacle_gfx,
            obstacle_palette,
            objects,
            ai,
        })
    }

    fn read_objects(rom: &Rom, header: &TrackHeader, track_index: usize) -> Result<TrackObjects, ObjectParseError> {
        let table = objects::ObstacleTable::read_from_rom(rom, track_index)?;
        let mut result = TrackObjects::default();

        if header.obstacles_offset != 0 {
            for placement in read_placement_list(rom, header.address + header.obstacles_offset as usize)? {
                let obstacle = table
                    .get(usize::from(placement.id))
                    .ok_or(ObjectParseError::UnknownPlacementId(placement.id))?;
                result.obstacles.push(ObstaclePlacement { obstacle, x: placement.x, y: placement.y });
            }
        }
        if header.item_box_offset != 0 {
            for placement in read_placement_list(rom, header.address + header.item_box_offset as usize)? {
                result.item_boxes.push((placement.x, placement.y));
            }
        }
        if header.coins_offset != 0 {
            for placement in read_placement_list(rom, header.address + header.coins_offset as usize)? {
                result.coins.push((placement.x, placement.y));
            }
        }
        if header.start_position_offset != 0 {
            for placement in read_placement_list(rom, header.address + header.start_position_offset as usize)? {
                result.start_positions.push(StartPosition::from_placement(placement));
            }
        }
        Ok(result)
    }
}

// -------------------------------------------------------------------------------------------------
// Saving

fn align_blob(blob: &mut Vec<u8>) {
    blob.resize((blob.len() + 3) & !3, 0);
}

impl Track {
    /// Serializes the track into a fresh blob, places it through the
    /// allocator, and repoints the track table and definition record at it.
    ///
    /// Sections land in a fixed order behind the header, each starting on a
    /// 4-byte boundary: tilemap, minimap, tileset and palette, behaviors, AI,
    /// obstacle graphics and palette, then the placement lists.
    pub fn write_to_rom(
        &self,
        rom: &mut Rom,
        allocator: &mut RomAllocator,
        track_index: usize,
    ) -> Result<Pointer, TrackWriteError> {
        if track_index >= TRACK_COUNT {
            return Err(TrackWriteError::InvalidIndex(track_index));
        }
        let definition_table = Region::default()
            .definition_table()
            .ok_or(TrackWriteError::InvalidIndex(track_index))?;
        let track_table = Region::default()
            .track_table()
            .ok_or(TrackWriteError::InvalidIndex(track_index))?;
        let definition_ptr = rom
            .read_pointer_at(definition_table + track_index * 4)
            .map_err(|_| TrackWriteError::InvalidIndex(track_index))?;

        let mut header = TrackHeader {
            compressed_tileset: true,
            track_width: self.config.width,
            track_height: self.config.height,
            ..TrackHeader::default()
        };
        let mut blob = vec![0u8; HEADER_SIZE];

        // Tilemap.
        header.flags.insert(TrackFlags::SPLIT_TILEMAP);
        header.tilemap_offset = blob.len() as u32;
        let compressed = split_compress(self.tilemap.as_bytes(), MAX_PARTS)
            .map_err(|e| TrackWriteError::SectionCompress("tilemap", e))?;
        blob.extend_from_slice(&compressed);

        // Minimap, plain-compressed.
        align_blob(&mut blob);
        header.minimap_offset = blob.len() as u32;
        blob.extend_from_slice(&lz77::compress(&self.minimap.to_bytes()));

        // Tileset and its palette. A shared tileset contributes no data; the
        // offset stays nonzero so the loader still consults the shared index.
        align_blob(&mut blob);
        match &self.tileset {
            TilesetSource::Owned(tileset) => {
                header.flags.insert(TrackFlags::SPLIT_TILESET);
                header.tileset_offset = blob.len() as u32;
                let compressed = split_compress(&tileset.to_bytes(), MAX_PARTS)
                    .map_err(|e| TrackWriteError::SectionCompress("tileset", e))?;
                blob.extend_from_slice(&compressed);
            }
            TilesetSource::Shared(index) => {
                header.shared_tileset = *index;
                header.tileset_offset = blob.len() as u32;
            }
        }
        align_blob(&mut blob);
        header.tileset_palette_offset = blob.len() as u32;
        blob.extend_from_slice(&self.tileset_palette.to_bytes());

        // Behaviors, raw.
        align_blob(&mut blob);
        header.behaviors_offset = blob.len() as u32;
        blob.extend_from_slice(&self.behaviors[..BEHAVIORS_SIZE.min(self.behaviors.len())]);
        blob.resize(header.behaviors_offset as usize + BEHAVIORS_SIZE, 0);

        // AI.
        align_blob(&mut blob);
        header.ai_offset = blob.len() as u32;
        blob.extend_from_slice(&self.ai.to_bytes());

        // Obstacle graphics and palette.
        match &self.obstacle_gfx {
            None => header.obstacle_gfx_offset = 0,
            Some(TilesetSource::Owned(tileset)) => {
                align_blob(&mut blob);
                header.flags.insert(TrackFlags::SPLIT_OBJECTS);
                header.obstacle_gfx_offset = blob.len() as u32;
                let compressed = split_compress(&tileset.to_bytes(), MAX_PARTS)
                    .map_err(|e| TrackWriteError::SectionCompress("obstacle gfx", e))?;
                blob.extend_from_slice(&compressed);
            }
            Some(TilesetSource::Shared(index)) => {
                align_blob(&mut blob);
                header.shared_obstacle_gfx = *index;
                header.obstacle_gfx_offset = blob.len() as u32;
            }
        }
        if let Some(palette) = &self.obstacle_palette {
            align_blob(&mut blob);
            header.obstacle_palette_offset = blob.len() as u32;
            blob.extend_from_slice(&palette.to_bytes());
        }

        // The obstacle table lives outside the blob; placement ids below
        // resolve through it.
        let table = self.objects.obstacle_table();
        if !table.obstacles().is_empty() {
            table.write_to_rom(rom, allocator, track_index)?;
        }

        // Placement lists, zone bytes refreshed from the current AI zones.
        let zone_map = self.ai.generate_zone_map(usize::from(self.config.width));
        let map_width = usize::from(self.config.width) * 64;
        let zone_at = |x: u8, y: u8| {
            zone_map.get(usize::from(x) + usize::from(y) * map_width).copied().unwrap_or(ai::NO_ZONE)
        };

        align_blob(&mut blob);
        header.obstacles_offset = blob.len() as u32;
        let mut placements = Vec::with_capacity(self.objects.obstacles.len());
        for placement in &self.objects.obstacles {
            let id = table.index_of(placement.obstacle).map_err(TrackWriteError::Objects)? as u8;
            placements.push(ObjectPlacement {
                id,
                x: placement.x,
                y: placement.y,
                zone: zone_at(placement.x, placement.y),
            });
        }
        write_placement_list(&placements, &mut blob);

        align_blob(&mut blob);
        header.coins_offset = blob.len() as u32;
        let coins: Vec<ObjectPlacement> = self
            .objects
            .coins
            .iter()
            .map(|&(x, y)| ObjectPlacement { id: 1, x, y, zone: zone_at(x, y) })
            .collect();
        write_placement_list(&coins, &mut blob);

        align_blob(&mut blob);
        header.item_box_offset = blob.len() as u32;
        let boxes: Vec<ObjectPlacement> = self
            .objects
            .item_boxes
            .iter()
            .map(|&(x, y)| ObjectPlacement { id: 1, x, y, zone: zone_at(x, y) })
            .collect();
        write_placement_list(&boxes, &mut blob);

        align_blob(&mut blob);
        header.start_position_offset = blob.len() as u32;
        let starts: Vec<ObjectPlacement> = self
            .objects
            .start_positions
            .iter()
            .map(|start| start.to_placement(zone_at(start.x, start.y)))
            .collect();
        write_placement_list(&starts, &mut blob);

        align_blob(&mut blob);

        // Header lands at the blob start once every offset is known.
        blob[..HEADER_SIZE].copy_from_slice(&header.to_bytes());

        let blob_ptr = allocator.allocate(blob.len() as u32).map_err(TrackWriteError::Alloc)?;
        rom.write_at(blob_ptr.address(), &blob)
            .map_err(|e| TrackWriteError::SectionWrite("track blob", e))?;

        // Repoint the track table slot at the new blob. Wrapping keeps blobs
        // allocated below the table representable.
        let table_offset = (blob_ptr.address().0 as u32).wrapping_sub(track_table.0 as u32);
        rom.write_u32_at(track_table + self.definition.header_index as usize * 4, table_offset)
            .map_err(|e| TrackWriteError::SectionWrite("track table", e))?;

        // Refresh the definition record with the current config.
        let mut definition = self.definition.clone();
        definition.background = self.config.background;
        definition.background_behavior = self.config.background_behavior;
        definition.palette_behavior = self.config.palette_behavior;
        definition.theme = self.config.theme;
        definition.song_id = self.config.song_id;
        definition.set_laps(self.config.laps);
        rom.write_at(definition_ptr.address(), &definition.to_bytes())
            .map_err(|e| TrackWriteError::SectionWrite("definition", e))?;

        log::info!("Wrote track {} ({} bytes at {})", track_index, blob.len(), blob_ptr.address());
        Ok(blob_ptr)
    }
}
