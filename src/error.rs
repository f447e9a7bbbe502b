use thiserror::Error;

use crate::gba_utils::addr::AddrRom;

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum Lz77Error {
    #[error("Wrong format tag: {0:#04x} (expected 0x10)")]
    Tag(u8),
    #[error("Input exhausted with {written} of {expected} bytes decoded")]
    Truncated { expected: usize, written: usize },
    #[error("Back-reference {distance} bytes behind with only {written} bytes written")]
    BackReference { distance: usize, written: usize },
}

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("Input of {0} bytes needs more than {1} parts")]
    TooManyParts(usize, usize),
    #[error("Offset table truncated")]
    TableTruncated,
    #[error("Part offset {0} does not fit in the 16-bit table")]
    OffsetOverflow(usize),
    #[error("Part {0}:\n- {1}")]
    Part(usize, Lz77Error),
}

#[derive(Debug, Error)]
pub enum DecompressionError {
    #[error("Decompression with LZ77:\n- {0}")]
    Lz77(Lz77Error),
    #[error("Decompression of split block:\n- {0}")]
    Split(SplitError),
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RomError {
    #[error("Empty ROM file")]
    Empty,
    #[error("Invalid ROM size (not a multiple of 4 bytes): {0} ({0:#x})")]
    Size(usize),
    #[error("Could not slice ROM at {addr:#x} (size {size}, ROM length {rom_len:#x})")]
    Slice { addr: AddrRom, size: usize, rom_len: usize },
    #[error("Could not parse ROM slice at {0:#x}")]
    Parse(AddrRom),
    #[error("Null pointer read at {0:#x}")]
    NullPointer(AddrRom),
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TrackHeaderError {
    #[error("Wrong magic byte: {0:#04x}")]
    Magic(u8),
    #[error("Isolating header data:\n- {0}")]
    IsolatingData(RomError),
}

#[derive(Debug, Error)]
pub enum AiParseError {
    #[error("Reading AI header:\n- {0}")]
    HeaderRead(RomError),
    #[error("Reading AI zone {0}:\n- {1}")]
    ZoneRead(usize, RomError),
    #[error("Unknown zone shape: {0:#04x}")]
    ZoneShape(u8),
    #[error("Reading AI target (set {0}, zone {1}):\n- {2}")]
    TargetRead(usize, usize, RomError),
}

#[derive(Debug, Error)]
pub enum AiEditError {
    #[error("A track holds at most 255 AI zones")]
    TooManyZones,
}

#[derive(Debug, Error)]
pub enum ObjectParseError {
    #[error("Reading placement list at {0:#x}:\n- {1}")]
    PlacementRead(AddrRom, RomError),
    #[error("Reading obstacle table:\n- {0}")]
    TableRead(RomError),
    #[error("Obstacle {0:?} not present in table")]
    UnknownObstacle(crate::track::objects::Obstacle),
    #[error("Placement id {0} has no obstacle table entry")]
    UnknownPlacementId(u8),
    #[error("Track {0} cannot own a custom obstacle table")]
    NoCustomTable(usize),
}

#[derive(Debug, Error)]
pub enum TrackParseError {
    #[error("Invalid track index: {0}")]
    InvalidIndex(usize),
    #[error("Reading track definition:\n- {0}")]
    DefinitionRead(RomError),
    #[error("Reading track header:\n- {0}")]
    HeaderRead(RomError),
    #[error("Parsing track header:\n- {0}")]
    Header(TrackHeaderError),
    #[error("Decompressing {0} section:\n- {1}")]
    SectionDecompress(&'static str, DecompressionError),
    #[error("Reading {0} section:\n- {1}")]
    SectionRead(&'static str, RomError),
    #[error("Parsing AI data:\n- {0}")]
    Ai(AiParseError),
    #[error("Parsing object data:\n- {0}")]
    Objects(ObjectParseError),
}

#[derive(Debug, Error)]
pub enum TrackWriteError {
    #[error("Allocating ROM space:\n- {0}")]
    Alloc(AllocError),
    #[error("Compressing {0} section:\n- {1}")]
    SectionCompress(&'static str, SplitError),
    #[error("Writing {0} section:\n- {1}")]
    SectionWrite(&'static str, RomError),
    #[error("Writing object data:\n- {0}")]
    Objects(ObjectParseError),
    #[error("Invalid track index: {0}")]
    InvalidIndex(usize),
    #[error("Persisting allocation table:\n- {0}")]
    AllocTable(AllocTableError),
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum AllocError {
    #[error("No free block can fit {requested} bytes")]
    OutOfSpace { requested: u32 },
}

#[derive(Debug, Error)]
pub enum AllocTableError {
    #[error("Unknown allocation table version: {0}")]
    Version(u8),
    #[error("Too many free blocks for the on-ROM table: {0}")]
    TooManyBlocks(usize),
    #[error("Reading allocation table:\n- {0}")]
    Read(RomError),
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project file IO:\n- {0}")]
    Io(#[from] std::io::Error),
    #[error("Project record (de)serialization:\n- {0}")]
    Json(#[from] serde_json::Error),
    #[error("Sibling file {0:?} has wrong length: {1} (expected {2})")]
    SiblingLength(std::path::PathBuf, usize, usize),
    #[error("Cup slot references unknown track {0}")]
    UnknownTrack(i32),
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RomParseError {
    #[error("ROM error:\n- {0}")]
    BadRom(RomError),
    #[error("File IO Error")]
    IoError,
    #[error("Failed to parse track {0:#X}:\n- {1}")]
    Track(usize, TrackParseError),
    #[error("Failed to read allocation table:\n- {0}")]
    AllocTable(AllocTableError),
}

pub type ParseErr<'a> = nom::Err<nom::error::Error<&'a [u8]>>;

// -------------------------------------------------------------------------------------------------

impl From<Lz77Error> for DecompressionError {
    fn from(e: Lz77Error) -> Self {
        DecompressionError::Lz77(e)
    }
}

impl From<SplitError> for DecompressionError {
    fn from(e: SplitError) -> Self {
        DecompressionError::Split(e)
    }
}
