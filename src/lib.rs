#![allow(clippy::identity_op)]

pub mod allocator;
pub mod compression;
pub mod error;
pub mod gba_utils;
pub mod graphics;
pub mod project;
pub mod track;
pub mod track_names;

use std::{fs, path::Path};

use crate::{
    allocator::{RomAllocator, ALLOC_TABLE_ADDR},
    error::{ProjectError, RomParseError, TrackParseError, TrackWriteError},
    gba_utils::{
        addr::Pointer,
        rom::Rom,
        rom_data::{Region, CUP_COUNT, TRACKS_PER_CUP, TRACK_COUNT},
    },
    graphics::Tileset,
    project::{Cup, Project},
    track::Track,
};

/// A parsed cartridge: the raw image, the free-space allocator, and all track
/// slots decoded.
pub struct MkscRom {
    rom:       Rom,
    allocator: RomAllocator,
    tracks:    Vec<Track>,
}

impl MkscRom {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RomParseError> {
        log::info!("Reading ROM from file: {}", path.as_ref().display());
        let mksc_rom = fs::read(path)
            .map_err(|err| {
                log::error!("Could not read ROM: {err}");
                RomParseError::IoError
            })
            .and_then(|rom_data| Rom::new(rom_data).map_err(RomParseError::BadRom))
            .and_then(Self::from_rom);

        if mksc_rom.is_ok() {
            log::info!("Success parsing ROM");
        }

        mksc_rom
    }

    pub fn from_rom(rom: Rom) -> Result<Self, RomParseError> {
        // An image that extends past the stock 4MB has been expanded before
        // and carries its free-list at the fixed table address.
        let allocator = if rom.len() > ALLOC_TABLE_ADDR.0 {
            log::info!("Reading allocation table of expanded ROM");
            RomAllocator::read_table(&rom).map_err(RomParseError::AllocTable)?
        } else {
            RomAllocator::default()
        };

        log::info!("Parsing {TRACK_COUNT} tracks");
        let mut tracks = Vec::with_capacity(TRACK_COUNT);
        for index in 0..TRACK_COUNT {
            tracks.push(Track::from_rom(&rom, index).map_err(|e| RomParseError::Track(index, e))?);
        }

        Ok(Self { rom, allocator, tracks })
    }

    pub fn rom(&self) -> &Rom {
        &self.rom
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.rom.into_bytes()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> &Track {
        &self.tracks[index]
    }

    pub fn track_mut(&mut self, index: usize) -> &mut Track {
        &mut self.tracks[index]
    }

    /// The tileset a track actually renders with: its own, or the one of the
    /// track its shared index points at. The reference is resolved on demand;
    /// a single hop is all the game's data ever needs.
    pub fn resolved_tileset(&self, track_index: usize) -> Option<&Tileset> {
        let track = self.tracks.get(track_index)?;
        match &track.tileset {
            source @ graphics::TilesetSource::Owned(_) => source.owned(),
            graphics::TilesetSource::Shared(delta) => {
                let shared_index = track_index.checked_add_signed(isize::from(*delta))?;
                self.tracks.get(shared_index)?.tileset.owned()
            }
        }
    }

    /// Track (definition) index a cup slot points at.
    pub fn cup_track_index(&self, cup: usize, slot: usize) -> Result<usize, TrackParseError> {
        let cups_table = Region::default().cups_table().ok_or(TrackParseError::InvalidIndex(cup))?;
        let index = self
            .rom
            .parse_at(cups_table + cup * 16 + slot * 4, nom::number::complete::le_i32)
            .map_err(TrackParseError::DefinitionRead)?;
        usize::try_from(index).map_err(|_| TrackParseError::InvalidIndex(cup))
    }

    /// Serializes one track back into the image.
    pub fn save_track(&mut self, index: usize) -> Result<Pointer, TrackWriteError> {
        let track = self.tracks.get(index).ok_or(TrackWriteError::InvalidIndex(index))?;
        track.write_to_rom(&mut self.rom, &mut self.allocator, index)
    }

    /// Serializes every track and persists the allocator's free-list, leaving
    /// the image ready to be written out.
    pub fn save_all_tracks(&mut self) -> Result<(), TrackWriteError> {
        for index in 0..self.tracks.len() {
            self.save_track(index)?;
        }
        self.allocator.write_table(&mut self.rom).map_err(TrackWriteError::AllocTable)?;
        Ok(())
    }

    /// Dumps every cup into a project directory, one subdirectory per track,
    /// written in parallel.
    pub fn export_project(&self, folder: impl AsRef<Path>) -> Result<Project, ProjectError> {
        use rayon::prelude::*;

        let mut project = Project::create(folder.as_ref())?;
        let mut jobs: Vec<(project::ProjectTrack, &Track)> = Vec::with_capacity(TRACK_COUNT);

        for cup in 0..CUP_COUNT {
            let mut cup_tracks = Vec::with_capacity(TRACKS_PER_CUP);
            for slot in 0..TRACKS_PER_CUP {
                let index = self
                    .cup_track_index(cup, slot)
                    .ok()
                    .filter(|&i| i < self.tracks.len())
                    .ok_or(ProjectError::UnknownTrack((cup * TRACKS_PER_CUP + slot) as i32))?;
                let name = track_names::name_from_header_index(self.tracks[index].definition.header_index)
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("Track {index}"));
                cup_tracks.push(name.clone());
                jobs.push((project.track(&name), &self.tracks[index]));
            }
            project.config.cups.push(Cup { name: track_names::CUP_NAMES[cup].to_owned(), tracks: cup_tracks });
        }

        jobs.par_iter().map(|(project_track, track)| project_track.save(track)).collect::<Result<(), _>>()?;
        project.save_config()?;
        Ok(project)
    }
}
