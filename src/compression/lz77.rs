//! The game's LZ77 variant (BIOS type 0x10): one tag byte, a little-endian
//! 24-bit uncompressed length, then control blocks of 1 flag byte (MSB first)
//! followed by up to 8 operations. A set bit is a two-byte back-reference
//! (4-bit length minus 3, 12-bit displacement minus 1), a clear bit copies one
//! literal byte.

use crate::{compression::ALIGNMENT, error::Lz77Error};

pub const FORMAT_TAG: u8 = 0x10;
pub const WINDOW_SIZE: usize = 4096;
pub const MAX_MATCH: usize = 18;
pub const MIN_MATCH: usize = 3;
const OPS_PER_BLOCK: usize = 8;

pub fn decompress(input: &[u8]) -> Result<Vec<u8>, Lz77Error> {
    let (&tag, rest) = input.split_first().ok_or(Lz77Error::Truncated { expected: 0, written: 0 })?;
    if tag != FORMAT_TAG {
        return Err(Lz77Error::Tag(tag));
    }
    if rest.len() < 3 {
        return Err(Lz77Error::Truncated { expected: 0, written: 0 });
    }
    let expected = u32::from_le_bytes([rest[0], rest[1], rest[2], 0]) as usize;
    let mut src = &rest[3..];
    let mut out = Vec::with_capacity(expected);

    while out.len() < expected {
        let (&flags, r) = src.split_first().ok_or(Lz77Error::Truncated { expected, written: out.len() })?;
        src = r;
        for bit in (0..OPS_PER_BLOCK).rev() {
            if out.len() >= expected {
                break;
            }
            if flags & (1 << bit) != 0 {
                if src.len() < 2 {
                    return Err(Lz77Error::Truncated { expected, written: out.len() });
                }
                let (head, r) = src.split_at(2);
                src = r;
                let count = MIN_MATCH + (head[0] >> 4) as usize;
                let distance = 1 + (((head[0] & 0xF) as usize) << 8 | head[1] as usize);
                if distance > out.len() {
                    return Err(Lz77Error::BackReference { distance, written: out.len() });
                }
                // Byte-by-byte so references into the bytes being produced
                // (distance < count) repeat them, run-length style.
                for _ in 0..count {
                    let byte = out[out.len() - distance];
                    out.push(byte);
                }
            } else {
                let (&literal, r) = src.split_first().ok_or(Lz77Error::Truncated { expected, written: out.len() })?;
                src = r;
                out.push(literal);
            }
        }
    }

    // The final back-reference of a block may run past the declared length.
    out.truncate(expected);
    Ok(out)
}

/// Encodes `source` as a type-0x10 stream. The header stores the uncompressed
/// length in 24 bits, so `source` must be under 16MB; track sections are
/// orders of magnitude smaller.
pub fn compress(source: &[u8]) -> Vec<u8> {
    debug_assert!(source.len() < 1 << 24, "source too large for the 24-bit length header");
    let mut out = Vec::with_capacity(source.len() / 2 + 8);
    out.push(FORMAT_TAG);
    out.extend_from_slice(&(source.len() as u32).to_le_bytes()[..3]);

    let mut pos = 0;
    while pos < source.len() {
        let flags_at = out.len();
        out.push(0);
        let mut flags = 0u8;
        for bit in (0..OPS_PER_BLOCK).rev() {
            if pos >= source.len() {
                break;
            }
            match longest_match(source, pos) {
                Some((distance, count)) => {
                    flags |= 1 << bit;
                    out.push((((count - MIN_MATCH) as u8) << 4) | (((distance - 1) >> 8) as u8));
                    out.push(((distance - 1) & 0xFF) as u8);
                    pos += count;
                }
                None => {
                    out.push(source[pos]);
                    pos += 1;
                }
            }
        }
        out[flags_at] = flags;
    }

    while out.len() % ALIGNMENT != 0 {
        out.push(0);
    }
    out
}

/// Greedy search for the longest match ending the sliding window at `pos`.
/// Candidates are scanned closest-first so equal lengths keep the smallest
/// displacement. Matches may overlap the current position; the decoder's
/// byte-by-byte copy makes those legal.
fn longest_match(data: &[u8], pos: usize) -> Option<(usize, usize)> {
    let max_len = MAX_MATCH.min(data.len() - pos);
    if max_len < MIN_MATCH {
        return None;
    }
    let window = pos.saturating_sub(WINDOW_SIZE);
    let mut best: Option<(usize, usize)> = None;
    for start in (window..pos).rev() {
        let mut len = 0;
        while len < max_len && data[start + len] == data[pos + len] {
            len += 1;
        }
        if len >= MIN_MATCH && best.map_or(true, |(_, best_len)| len > best_len) {
            best = Some((pos - start, len));
            if len == max_len {
                break;
            }
        }
    }
    best
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) struct XorShift(u32);

    impl XorShift {
        pub(crate) fn new(seed: u32) -> Self {
            Self(seed.max(1))
        }

        pub(crate) fn next_byte(&mut self) -> u8 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 17;
            self.0 ^= self.0 << 5;
            self.0 as u8
        }
    }

    fn assert_round_trip(data: &[u8]) {
        let compressed = compress(data);
        assert_eq!(compressed.len() % 4, 0, "output not padded to a word boundary");
        let restored = decompress(&compressed)
            .unwrap_or_else(|err| panic!("decompression failed unexpectedly ({err})"));
        assert_eq!(restored.as_slice(), data);
    }

    #[test]
    fn test_repeated_byte_run() {
        let data = [0x41u8; 10];
        let compressed = compress(&data);
        assert_eq!(&compressed[..4], &[0x10, 0x0A, 0x00, 0x00]);
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_round_trip_edge_shapes() {
        assert_round_trip(&[]);
        assert_round_trip(&[0x42]);
        assert_round_trip(&[1, 2]);
        assert_round_trip(&[0u8; 5000]);
        assert_round_trip(&(0..=255u8).collect::<Vec<_>>());
        assert_round_trip(b"abcabcabcabcabcabcabcabcabc");
    }

    #[test]
    fn test_round_trip_random_buffers() {
        let mut rng = XorShift::new(0xC0FFEE);
        for len in [1usize, 17, 256, 4095, 4096, 4097, 10_000] {
            let data: Vec<u8> = (0..len).map(|_| rng.next_byte()).collect();
            assert_round_trip(&data);
        }
    }

    #[test]
    fn test_round_trip_low_entropy() {
        let mut rng = XorShift::new(7);
        let data: Vec<u8> = (0..8192).map(|_| rng.next_byte() & 0b11).collect();
        assert_round_trip(&data);
    }

    #[test]
    fn test_wrong_tag_is_rejected() {
        assert!(matches!(decompress(&[0x11, 4, 0, 0, 0]), Err(Lz77Error::Tag(0x11))));
    }

    #[test]
    fn test_truncated_stream_is_rejected() {
        let mut compressed = compress(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        compressed.truncate(6);
        assert!(matches!(decompress(&compressed), Err(Lz77Error::Truncated { .. })));
    }

    #[test]
    fn test_bad_back_reference_is_rejected() {
        // Flag selects a back-reference as the first operation; nothing has
        // been decoded yet so any displacement is out of range.
        let stream = [0x10, 0x08, 0x00, 0x00, 0x80, 0x00, 0x05, 0x00];
        assert!(matches!(decompress(&stream), Err(Lz77Error::BackReference { .. })));
    }

    #[test]
    fn test_overlapping_reference_expands_run() {
        // Literal 0xAA, then a back-reference with displacement 1 and count 9.
        let stream = [0x10, 0x0A, 0x00, 0x00, 0x40, 0xAA, 0x60, 0x00];
        assert_eq!(decompress(&stream).unwrap(), [0xAA; 10]);
    }
}
