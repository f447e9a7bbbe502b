//! First-fit allocator over the ROM's free space, used when exports need a
//! home for relocated data (track blobs, obstacle tables). Freed blocks are
//! appended to the list and never coalesced with neighbours; a session only
//! frees while replacing data it immediately re-allocates, so fragmentation
//! stays bounded in practice. Known limitation, kept so output addresses
//! match the original tool's.

use nom::number::complete::{le_u24, le_u8};

use crate::{
    error::{AllocError, AllocTableError},
    gba_utils::{
        addr::{AddrRom, Pointer},
        rom::Rom,
    },
};

/// Where the free-list is persisted in an expanded ROM.
pub const ALLOC_TABLE_ADDR: AddrRom = AddrRom(0x400000);
pub const ALLOC_TABLE_VERSION: u8 = 0;
/// The on-ROM table is one 0x100 page: version byte, u24 address/length
/// pairs, zero terminator.
pub const MAX_TABLE_BLOCKS: usize = (0x100 - 2) / 6;

/// Free spans of a stock USA ROM: slack after the track data, and the
/// expansion area past the original 4MB image (minus the table page).
pub const DEFAULT_FREE_SPANS: [RomSpan; 2] = [
    RomSpan { address: 0x1E9E00, length: 0x04A300 },
    RomSpan { address: 0x400100, length: 0x1C00000 },
];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RomSpan {
    pub address: u32,
    pub length:  u32,
}

impl RomSpan {
    pub fn end(self) -> u32 {
        self.address + self.length
    }
}

// -------------------------------------------------------------------------------------------------

pub struct RomAllocator {
    free: Vec<RomSpan>,
}

impl Default for RomAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_FREE_SPANS.to_vec())
    }
}

impl RomAllocator {
    pub fn new(free: Vec<RomSpan>) -> Self {
        Self { free }
    }

    pub fn free_spans(&self) -> &[RomSpan] {
        &self.free
    }

    /// Carves `length` bytes (rounded up with the original `(n & !3) + 4`
    /// rule, so even aligned requests gain a spare word) off the start of the
    /// first span that fits.
    pub fn allocate(&mut self, length: u32) -> Result<Pointer, AllocError> {
        let aligned = (length & !3) + 4;
        for i in 0..self.free.len() {
            let span = &mut self.free[i];
            if span.length >= aligned {
                let address = span.address;
                span.address += aligned;
                span.length -= aligned;
                if span.length == 0 {
                    self.free.remove(i);
                }
                return Ok(Pointer::new(address));
            }
        }
        Err(AllocError::OutOfSpace { requested: length })
    }

    /// Returns a span to the pool. Appended as-is; adjacent spans are not
    /// merged.
    pub fn add_free_block(&mut self, address: u32, length: u32) {
        self.free.push(RomSpan { address, length });
    }

    /// Loads the free-list persisted at [`ALLOC_TABLE_ADDR`] of an expanded
    /// ROM.
    pub fn read_table(rom: &Rom) -> Result<Self, AllocTableError> {
        let version = rom.parse_at(ALLOC_TABLE_ADDR, le_u8).map_err(AllocTableError::Read)?;
        if version != ALLOC_TABLE_VERSION {
            return Err(AllocTableError::Version(version));
        }
        let mut free = Vec::new();
        let mut at = ALLOC_TABLE_ADDR + 1usize;
        for _ in 0..MAX_TABLE_BLOCKS {
            // Like the original, a zero lead byte terminates the table; an
            // address with a zero low byte cannot be stored.
            if rom.parse_at(at, le_u8).map_err(AllocTableError::Read)? == 0 {
                break;
            }
            let address = rom.parse_at(at, le_u24).map_err(AllocTableError::Read)?;
            let length = rom.parse_at(at + 3usize, le_u24).map_err(AllocTableError::Read)?;
            free.push(RomSpan { address, length });
            at += 6usize;
        }
        Ok(Self { free })
    }

    pub fn write_table(&self, rom: &mut Rom) -> Result<(), AllocTableError> {
        if self.free.len() > MAX_TABLE_BLOCKS {
            return Err(AllocTableError::TooManyBlocks(self.free.len()));
        }
        let mut bytes = Vec::with_capacity(2 + self.free.len() * 6);
        bytes.push(ALLOC_TABLE_VERSION);
        for span in &self.free {
            bytes.extend_from_slice(&span.address.to_le_bytes()[..3]);
            bytes.extend_from_slice(&span.length.to_le_bytes()[..3]);
        }
        bytes.push(0);
        rom.write_at(ALLOC_TABLE_ADDR, &bytes).map_err(AllocTableError::Read)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocations_never_overlap() {
        let mut alloc = RomAllocator::new(vec![RomSpan { address: 0x1000, length: 0x100 }]);
        let mut taken: Vec<(u32, u32)> = Vec::new();
        for length in [5u32, 16, 3, 40, 8] {
            let at = alloc.allocate(length).unwrap().address().0 as u32;
            let aligned = (length & !3) + 4;
            for &(begin, len) in &taken {
                assert!(at >= begin + len || at + aligned <= begin, "overlap at {at:#x}");
            }
            taken.push((at, aligned));
        }
    }

    #[test]
    fn test_alignment_rule_always_adds_a_word() {
        let mut alloc = RomAllocator::new(vec![RomSpan { address: 0, length: 0x100 }]);
        let first = alloc.allocate(4).unwrap();
        let second = alloc.allocate(1).unwrap();
        assert_eq!(first.address(), AddrRom(0));
        // A 4-byte request still consumes 8 bytes.
        assert_eq!(second.address(), AddrRom(8));
        assert_eq!(alloc.allocate(2).unwrap().address(), AddrRom(12));
    }

    #[test]
    fn test_first_fit_skips_small_spans() {
        let mut alloc = RomAllocator::new(vec![
            RomSpan { address: 0x100, length: 8 },
            RomSpan { address: 0x200, length: 0x80 },
        ]);
        assert_eq!(alloc.allocate(0x20).unwrap().address(), AddrRom(0x200));
        // The small span is still intact for a request it can satisfy.
        assert_eq!(alloc.allocate(4).unwrap().address(), AddrRom(0x100));
    }

    #[test]
    fn test_out_of_space_is_deterministic() {
        let mut alloc = RomAllocator::new(vec![RomSpan { address: 0, length: 16 }]);
        assert!(alloc.allocate(8).is_ok());
        match alloc.allocate(8) {
            Err(AllocError::OutOfSpace { requested }) => assert_eq!(requested, 8),
            other => panic!("expected OutOfSpace, got {other:?}"),
        }
    }

    #[test]
    fn test_exhausted_span_is_removed() {
        let mut alloc = RomAllocator::new(vec![RomSpan { address: 0, length: 8 }]);
        alloc.allocate(4).unwrap();
        assert!(alloc.free_spans().is_empty());
    }

    #[test]
    fn test_freed_blocks_are_not_merged() {
        let mut alloc = RomAllocator::new(vec![]);
        alloc.add_free_block(0x100, 0x10);
        alloc.add_free_block(0x110, 0x10);
        assert_eq!(alloc.free_spans().len(), 2);
    }

    #[test]
    fn test_table_round_trip() {
        let mut rom = Rom::new(vec![0; 0x400100]).unwrap();
        // Lead address bytes must be nonzero to survive the zero-terminator
        // scan, see read_table.
        let alloc = RomAllocator::new(vec![
            RomSpan { address: 0x1E9E04, length: 0x04A2FC },
            RomSpan { address: 0x400104, length: 0xBFFFFC },
        ]);
        alloc.write_table(&mut rom).unwrap();
        let restored = RomAllocator::read_table(&rom).unwrap();
        assert_eq!(restored.free_spans(), alloc.free_spans());
    }
}
