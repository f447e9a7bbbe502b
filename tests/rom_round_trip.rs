//! Whole-track round trips on a synthetic in-memory ROM image.

use adve_rom::{
    allocator::{RomAllocator, RomSpan},
    gba_utils::{
        addr::{AddrRom, Pointer},
        rom::Rom,
        rom_data::Region,
    },
    graphics::{Bgr555, PixelFormat, Tileset, TilesetSource},
    track::{
        ai::{AiZone, ZoneShape},
        objects::{Obstacle, ObstaclePlacement, StartPosition, StartingPlace},
        Track,
    },
};

const TRACK_INDEX: usize = 5;
const DEFINITION_ADDR: AddrRom = AddrRom(0x300000);

/// A blank 4MB image with a definition-table slot wired up for one track.
fn blank_rom() -> Rom {
    let mut rom = Rom::new(vec![0; 0x400000]).unwrap();
    let definition_table = Region::Usa.definition_table().unwrap();
    rom.write_pointer_at(definition_table + TRACK_INDEX * 4, Pointer::from(DEFINITION_ADDR)).unwrap();
    rom
}

fn sample_track() -> Track {
    let mut track = Track::default();
    track.definition.header_index = TRACK_INDEX as i32;
    track.config.song_id = 21;
    track.config.theme = 4;
    track.config.laps = 3;

    // Give every section recognizable content.
    if let TilesetSource::Owned(tileset) = &mut track.tileset {
        for i in 0..tileset.len() {
            tileset.tile_mut(i).set_pixel(i % 8, i / 64, (i % 251) as u8, PixelFormat::Bpp8);
        }
    }
    for i in 0..track.tileset_palette.len() {
        track.tileset_palette.set_color(i, Bgr555::from_rgb(i as u8, (63 - i) as u8, (i / 2) as u8));
    }
    for y in 0..track.tilemap.height() {
        for x in 0..track.tilemap.width() {
            track.tilemap.set(x, y, ((x * 7 + y * 3) % 256) as u8);
        }
    }
    for i in 0..track.minimap.len() {
        track.minimap.tile_mut(i).set_pixel(i % 8, (i / 8) % 8, (i % 16) as u8, PixelFormat::Bpp4);
    }
    track.behaviors = (0..=255).collect();

    track.ai.push_zone(AiZone::new(4, 4, 20, 8, ZoneShape::Rectangle)).unwrap();
    track.ai.push_zone(AiZone::new(40, 12, 10, 10, ZoneShape::TriangleTopRight)).unwrap();
    track.ai.push_zone(AiZone::new(4, 40, 30, 6, ZoneShape::Rectangle)).unwrap();

    track.objects.obstacles.push(ObstaclePlacement {
        obstacle: Obstacle { kind: 12, parameter: 0 },
        x: 20,
        y: 30,
    });
    track.objects.obstacles.push(ObstaclePlacement {
        obstacle: Obstacle { kind: 7, parameter: 2 },
        x: 44,
        y: 14,
    });
    track.objects.item_boxes.push((50, 60));
    track.objects.coins.push((10, 11));
    track.objects.coins.push((12, 13));
    track.objects.start_positions.push(StartPosition { x: 8, y: 9, place: StartingPlace::First });
    track.objects.start_positions.push(StartPosition { x: 8, y: 12, place: StartingPlace::Second });
    track
}

fn owned_bytes(source: &TilesetSource) -> Vec<u8> {
    source.owned().map(Tileset::to_bytes).unwrap_or_default()
}

#[test]
fn whole_track_survives_a_rom_round_trip() {
    let mut rom = blank_rom();
    let mut allocator = RomAllocator::new(vec![RomSpan { address: 0x350000, length: 0x80000 }]);
    let track = sample_track();

    track.write_to_rom(&mut rom, &mut allocator, TRACK_INDEX).unwrap();
    let restored = Track::from_rom(&rom, TRACK_INDEX).unwrap();

    assert_eq!(restored.config, track.config);
    assert_eq!(restored.definition.header_index, TRACK_INDEX as i32);
    assert_eq!(restored.tileset_palette, track.tileset_palette);
    assert_eq!(owned_bytes(&restored.tileset), owned_bytes(&track.tileset));
    assert_eq!(restored.tilemap, track.tilemap);
    assert_eq!(restored.minimap, track.minimap);
    assert_eq!(restored.behaviors, track.behaviors);
    assert_eq!(restored.ai, track.ai);
    assert_eq!(restored.objects, track.objects);
    assert_eq!(
        restored.obstacle_palette.as_ref().map(|p| p.to_bytes()),
        track.obstacle_palette.as_ref().map(|p| p.to_bytes()),
    );
}

#[test]
fn rewriting_a_track_allocates_fresh_space() {
    let mut rom = blank_rom();
    let mut allocator = RomAllocator::new(vec![RomSpan { address: 0x350000, length: 0x80000 }]);
    let track = sample_track();

    let first = track.write_to_rom(&mut rom, &mut allocator, TRACK_INDEX).unwrap();
    let second = track.write_to_rom(&mut rom, &mut allocator, TRACK_INDEX).unwrap();
    assert_ne!(first.address(), second.address());

    // The table points at the most recent blob and it still parses.
    let restored = Track::from_rom(&rom, TRACK_INDEX).unwrap();
    assert_eq!(restored.config, track.config);
}

#[test]
fn stock_free_spans_below_the_track_table_round_trip() {
    let mut rom = blank_rom();
    // The default free list starts at 0x1E9E00, below the track table, so the
    // stored table offset wraps.
    let mut allocator = RomAllocator::default();
    let track = sample_track();

    let blob = track.write_to_rom(&mut rom, &mut allocator, TRACK_INDEX).unwrap();
    assert!(blob.address() < Region::Usa.track_table().unwrap());

    let restored = Track::from_rom(&rom, TRACK_INDEX).unwrap();
    assert_eq!(restored.config, track.config);
    assert_eq!(restored.tilemap, track.tilemap);
    assert_eq!(restored.objects, track.objects);
}

#[test]
fn shared_tileset_tracks_carry_only_the_index() {
    let mut rom = blank_rom();
    let mut allocator = RomAllocator::new(vec![RomSpan { address: 0x350000, length: 0x80000 }]);
    let mut track = sample_track();
    track.tileset = TilesetSource::Shared(-1);

    track.write_to_rom(&mut rom, &mut allocator, TRACK_INDEX).unwrap();
    let restored = Track::from_rom(&rom, TRACK_INDEX).unwrap();
    assert_eq!(restored.tileset.shared_index(), Some(-1));
}
