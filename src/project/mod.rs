//! On-disk project layout: one directory per track, decoded sections stored
//! as sibling files. Structured records go through JSON; graphics and
//! behavior data stay raw so external tools can edit them.

use std::{
    fs,
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::ProjectError,
    graphics::{
        AffineTilemap, Palette, PixelFormat, Tileset, TilesetSource, MINIMAP_TILESET_LEN,
        OBSTACLE_PALETTE_LEN, TRACK_PALETTE_LEN, TRACK_TILESET_LEN,
    },
    track::{
        ai::TrackAi, definition::TrackDefinition, objects::TrackObjects, Track, TrackConfig, BEHAVIORS_SIZE,
        TILES_PER_UNIT,
    },
};

const PROJECT_CONFIG_FILE: &str = "config.json";

const TRACK_RECORD_FILE: &str = "track.json";
const OBJECTS_FILE: &str = "objects.json";
const AI_FILE: &str = "ai.json";
const TILESET_FILE: &str = "tileset.chr";
const TILESET_PAL_FILE: &str = "tileset.pal";
const TILEMAP_FILE: &str = "tilemap.scr";
const MINIMAP_FILE: &str = "minimap.chr";
const OBSTACLE_GFX_FILE: &str = "obstacles.chr";
const OBSTACLE_PAL_FILE: &str = "obstacles.pal";
const BEHAVIORS_FILE: &str = "behaviors.bin";

// -------------------------------------------------------------------------------------------------

/// The JSON part of a track directory: settings plus everything needed to
/// reassemble the binary siblings.
#[derive(Serialize, Deserialize)]
struct TrackRecord {
    config: TrackConfig,
    definition: TrackDefinition,
    shared_tileset: i8,
    has_obstacle_gfx: bool,
    shared_obstacle_gfx: i8,
}

/// One track's directory.
pub struct ProjectTrack {
    folder: PathBuf,
    name:   String,
}

impl ProjectTrack {
    pub fn new(folder: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self { folder: folder.into(), name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn path(&self, file: &str) -> PathBuf {
        self.folder.join(file)
    }

    /// Writes every sibling file. The buffers are serialized up front, then
    /// all files land in parallel.
    pub fn save(&self, track: &Track) -> Result<(), ProjectError> {
        fs::create_dir_all(&self.folder)?;

        let record = TrackRecord {
            config: track.config.clone(),
            definition: track.definition.clone(),
            shared_tileset: track.tileset.shared_index().unwrap_or(0),
            has_obstacle_gfx: track.obstacle_gfx.is_some(),
            shared_obstacle_gfx: track
                .obstacle_gfx
                .as_ref()
                .and_then(TilesetSource::shared_index)
                .unwrap_or(0),
        };

        let mut files: Vec<(PathBuf, Vec<u8>)> = vec![
            (self.path(TRACK_RECORD_FILE), serde_json::to_vec_pretty(&record)?),
            (self.path(OBJECTS_FILE), serde_json::to_vec_pretty(&track.objects)?),
            (self.path(AI_FILE), serde_json::to_vec_pretty(&track.ai)?),
            (self.path(TILESET_PAL_FILE), track.tileset_palette.to_bytes()),
            (self.path(TILEMAP_FILE), track.tilemap.as_bytes().to_vec()),
            (self.path(MINIMAP_FILE), track.minimap.to_bytes()),
            (self.path(BEHAVIORS_FILE), track.behaviors.clone()),
        ];
        if let Some(tileset) = track.tileset.owned() {
            files.push((self.path(TILESET_FILE), tileset.to_bytes()));
        }
        if let Some(tileset) = track.obstacle_gfx.as_ref().and_then(TilesetSource::owned) {
            files.push((self.path(OBSTACLE_GFX_FILE), tileset.to_bytes()));
        }
        if let Some(palette) = &track.obstacle_palette {
            files.push((self.path(OBSTACLE_PAL_FILE), palette.to_bytes()));
        }

        files
            .par_iter()
            .map(|(path, bytes)| fs::write(path, bytes).map_err(ProjectError::from))
            .collect::<Result<(), ProjectError>>()
    }

    fn read_exact_sibling(&self, file: &str, expected: usize) -> Result<Vec<u8>, ProjectError> {
        let path = self.path(file);
        let bytes = fs::read(&path)?;
        if bytes.len() != expected {
            return Err(ProjectError::SiblingLength(path, bytes.len(), expected));
        }
        Ok(bytes)
    }

    pub fn load(&self) -> Result<Track, ProjectError> {
        let record: TrackRecord = serde_json::from_slice(&fs::read(self.path(TRACK_RECORD_FILE))?)?;
        let objects: TrackObjects = serde_json::from_slice(&fs::read(self.path(OBJECTS_FILE))?)?;
        let ai: TrackAi = serde_json::from_slice(&fs::read(self.path(AI_FILE))?)?;

        let behaviors = self.read_exact_sibling(BEHAVIORS_FILE, BEHAVIORS_SIZE)?;
        let palette_bytes = self.read_exact_sibling(TILESET_PAL_FILE, TRACK_PALETTE_LEN * 2)?;
        let tileset_palette = Palette::from_bytes(&palette_bytes, TRACK_PALETTE_LEN);

        let width = usize::from(record.config.width) * TILES_PER_UNIT;
        let height = usize::from(record.config.height) * TILES_PER_UNIT;
        let tilemap_bytes = self.read_exact_sibling(TILEMAP_FILE, width * height)?;
        let tilemap = AffineTilemap::from_bytes(&tilemap_bytes, width, height);

        let minimap_bytes = fs::read(self.path(MINIMAP_FILE))?;
        let minimap = Tileset::from_bytes(&minimap_bytes, MINIMAP_TILESET_LEN, PixelFormat::Bpp4);

        let tileset = if record.shared_tileset != 0 {
            TilesetSource::Shared(record.shared_tileset)
        } else {
            let bytes = fs::read(self.path(TILESET_FILE))?;
            TilesetSource::Owned(Tileset::from_bytes(&bytes, TRACK_TILESET_LEN, PixelFormat::Bpp8))
        };

        let obstacle_gfx = if !record.has_obstacle_gfx {
            None
        } else if record.shared_obstacle_gfx != 0 {
            Some(TilesetSource::Shared(record.shared_obstacle_gfx))
        } else {
            let bytes = fs::read(self.path(OBSTACLE_GFX_FILE))?;
            Some(TilesetSource::Owned(Tileset::from_bytes(&bytes, TRACK_TILESET_LEN, PixelFormat::Bpp4)))
        };

        let obstacle_palette = if self.path(OBSTACLE_PAL_FILE).exists() {
            let bytes = self.read_exact_sibling(OBSTACLE_PAL_FILE, OBSTACLE_PALETTE_LEN * 2)?;
            Some(Palette::from_bytes(&bytes, OBSTACLE_PALETTE_LEN))
        } else {
            None
        };

        Ok(Track {
            config: record.config,
            definition: record.definition,
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
}

// -------------------------------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cup {
    pub name:   String,
    /// Track directory names, in play order.
    pub tracks: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub cups: Vec<Cup>,
}

/// A project directory: `config.json` at the root, one subdirectory per
/// track.
pub struct Project {
    folder: PathBuf,
    pub config: ProjectConfig,
}

impl Project {
    pub fn create(folder: impl Into<PathBuf>) -> Result<Self, ProjectError> {
        let folder = folder.into();
        fs::create_dir_all(&folder)?;
        Ok(Self { folder, config: ProjectConfig::default() })
    }

    pub fn open(folder: impl Into<PathBuf>) -> Result<Self, ProjectError> {
        let folder = folder.into();
        let config = serde_json::from_slice(&fs::read(folder.join(PROJECT_CONFIG_FILE))?)?;
        Ok(Self { folder, config })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn save_config(&self) -> Result<(), ProjectError> {
        fs::write(self.folder.join(PROJECT_CONFIG_FILE), serde_json::to_vec_pretty(&self.config)?)?;
        Ok(())
    }

    pub fn track(&self, name: &str) -> ProjectTrack {
        ProjectTrack::new(self.folder.join(name), name)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::objects::{Obstacle, ObstaclePlacement, StartPosition};

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("adve-rom-test-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample_track() -> Track {
        let mut track = Track::default();
        track.config.song_id = 21;
        track.behaviors[0x40] = 0xA5;
        track.objects.start_positions.push(StartPosition::default());
        track.objects.obstacles.push(ObstaclePlacement {
            obstacle: Obstacle { kind: 5, parameter: 1 },
            x: 10,
            y: 12,
        });
        track.objects.coins.push((3, 4));
        track
    }

    #[test]
    fn test_track_directory_round_trip() {
        let dir = temp_dir("track-rt");
        let project_track = ProjectTrack::new(&dir, "Test Track");
        let track = sample_track();
        project_track.save(&track).unwrap();

        let restored = project_track.load().unwrap();
        assert_eq!(restored.config, track.config);
        assert_eq!(restored.behaviors, track.behaviors);
        assert_eq!(restored.objects, track.objects);
        assert_eq!(restored.ai, track.ai);
        assert_eq!(restored.tileset_palette, track.tileset_palette);
        assert!(restored.obstacle_gfx.is_some());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_shared_tileset_skips_the_chr_sibling() {
        let dir = temp_dir("shared");
        let project_track = ProjectTrack::new(&dir, "Shared");
        let mut track = sample_track();
        track.tileset = TilesetSource::Shared(-2);
        project_track.save(&track).unwrap();

        assert!(!dir.join(TILESET_FILE).exists());
        let restored = project_track.load().unwrap();
        assert_eq!(restored.tileset.shared_index(), Some(-2));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_truncated_behaviors_are_rejected() {
        let dir = temp_dir("truncated");
        let project_track = ProjectTrack::new(&dir, "Bad");
        project_track.save(&sample_track()).unwrap();
        fs::write(dir.join(BEHAVIORS_FILE), [0u8; 16]).unwrap();

        assert!(matches!(project_track.load(), Err(ProjectError::SiblingLength(_, 16, BEHAVIORS_SIZE))));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_project_config_round_trip() {
        let dir = temp_dir("project");
        let mut project = Project::create(&dir).unwrap();
        project.config.cups.push(Cup {
            name:   "Mushroom Cup".into(),
            tracks: vec!["Peach Circuit".into()],
        });
        project.save_config().unwrap();

        let reopened = Project::open(&dir).unwrap();
        assert_eq!(reopened.config.cups.len(), 1);
        assert_eq!(reopened.config.cups[0].tracks[0], "Peach Circuit");

        let _ = fs::remove_dir_all(&dir);
    }
}
