//! Split blocks: sections too large for one practical LZ77 stream are broken
//! into 4096-byte chunks, each compressed independently, prefixed with a table
//! of little-endian u16 offsets relative to the table's own start. A zero
//! entry terminates the table, which makes offset 0 unreachable as a real
//! part offset.

use smallvec::SmallVec;

use crate::{
    compression::{lz77, MAX_PARTS, MAX_PART_SIZE},
    error::SplitError,
};

/// Decompresses a split block starting at the beginning of `source`.
pub fn split_decompress(source: &[u8], max_parts: usize) -> Result<Vec<u8>, SplitError> {
    let mut offsets: SmallVec<[u16; MAX_PARTS]> = SmallVec::new();
    for part in 0..max_parts {
        let at = part * 2;
        let entry = source
            .get(at..at + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .ok_or(SplitError::TableTruncated)?;
        if entry == 0 {
            break;
        }
        offsets.push(entry);
    }

    let mut out = Vec::new();
    for (part, &offset) in offsets.iter().enumerate() {
        let tail = source.get(usize::from(offset)..).ok_or(SplitError::TableTruncated)?;
        let chunk = lz77::decompress(tail).map_err(|e| SplitError::Part(part, e))?;
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}

/// Compresses `source` as a split block. Chunk boundaries fall every 4096
/// input bytes; only the final chunk may be short.
pub fn split_compress(source: &[u8], max_parts: usize) -> Result<Vec<u8>, SplitError> {
    let parts = 1 + source.len().saturating_sub(1) / MAX_PART_SIZE;
    if parts > max_parts {
        return Err(SplitError::TooManyParts(source.len(), max_parts));
    }

    // The table is padded to a whole multiple of 16 entries.
    let table_entries = (parts + 15) & !15;
    let mut out = vec![0u8; table_entries * 2];
    let mut offsets: SmallVec<[u16; MAX_PARTS]> = SmallVec::new();
    for part in 0..parts {
        let begin = part * MAX_PART_SIZE;
        let end = (begin + MAX_PART_SIZE).min(source.len());
        let offset = u16::try_from(out.len()).map_err(|_| SplitError::OffsetOverflow(out.len()))?;
        offsets.push(offset);
        out.extend_from_slice(&lz77::compress(&source[begin..end]));
    }

    for (part, offset) in offsets.into_iter().enumerate() {
        out[part * 2..part * 2 + 2].copy_from_slice(&offset.to_le_bytes());
    }
    Ok(out)
}

// -------------------------------------------------------------------------------------------------
