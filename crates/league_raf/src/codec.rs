//! Payload codec: the legacy entry-name hash and the zlib round-trip pair
//! used for entry payloads.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::error::{Error, Result};

/// Fixed size of the reusable inflate/deflate scratch buffers.
const SCRATCH_LEN: usize = 1024 * 1024;

/// Computes the legacy archive hash of an entry name.
///
/// The name is lowercased before hashing. This hash collides easily and is
/// stored in index records as an auxiliary field only; entry lookups always
/// go through the resolved name.
pub fn entry_hash(name: &str) -> u32 {
    let mut hash: u32 = 0;
    for ch in name.chars().flat_map(char::to_lowercase) {
        hash = (hash << 4).wrapping_add(ch as u32);
        let high = hash & 0xF000_0000;
        if high != 0 {
            hash ^= high >> 24;
            hash ^= high;
        }
    }
    hash
}

/// Returns true when `data` opens with a zlib stream header.
///
/// Entry payloads are zlib-compressed iff their first two bytes are `0x7801`
/// or `0x789C` big-endian.
pub fn is_zlib(data: &[u8]) -> bool {
    if data.len() < 2 {
        return false;
    }
    let magic = u16::from_be_bytes([data[0], data[1]]);
    magic == 0x7801 || magic == 0x789C
}

/// Zlib codec streaming through fixed reusable scratch buffers.
///
/// Both buffers are shared mutable scratch state, so compression and
/// decompression calls must not overlap; the `&mut self` receivers make an
/// overlapping call unrepresentable.
pub struct Codec {
    inflate_scratch: Box<[u8]>,
    deflate_scratch: Box<[u8]>,
}

impl Codec {
    pub fn new() -> Self {
        Self {
            inflate_scratch: vec![0u8; SCRATCH_LEN].into_boxed_slice(),
            deflate_scratch: vec![0u8; SCRATCH_LEN].into_boxed_slice(),
        }
    }

    /// Inflates a whole zlib stream.
    ///
    /// The complete stream must be present in `input`: an iteration that
    /// produces no output before the stream end means the stream is corrupt,
    /// not that more input is needed.
    pub fn decompress(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut inflater = Decompress::new(true);
        let mut output = Vec::new();
        loop {
            let consumed = inflater.total_in() as usize;
            let before = inflater.total_out();
            let status = inflater
                .decompress(
                    &input[consumed..],
                    &mut self.inflate_scratch,
                    FlushDecompress::Finish,
                )
                .map_err(|e| Error::CorruptPayload(e.to_string()))?;
            let produced = (inflater.total_out() - before) as usize;
            output.extend_from_slice(&self.inflate_scratch[..produced]);
            match status {
                Status::StreamEnd => break,
                _ if produced == 0 => {
                    return Err(Error::CorruptPayload(
                        "inflate made no progress before the stream end".into(),
                    ));
                }
                _ => {}
            }
        }
        Ok(output)
    }

    /// Deflates `input` into a zlib stream and verifies its own output.
    ///
    /// The compressed bytes are inflated again and compared against the input
    /// before being returned; any difference is an integrity failure.
    pub fn compress(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut deflater = Compress::new(Compression::default(), true);
        let mut output = Vec::new();
        loop {
            let consumed = deflater.total_in() as usize;
            let before = deflater.total_out();
            let status = deflater
                .compress(
                    &input[consumed..],
                    &mut self.deflate_scratch,
                    FlushCompress::Finish,
                )
                .map_err(|e| Error::IntegrityCheck(e.to_string()))?;
            let produced = (deflater.total_out() - before) as usize;
            output.extend_from_slice(&self.deflate_scratch[..produced]);
            if status == Status::StreamEnd {
                break;
            }
        }
        if self.decompress(&output)? != input {
            return Err(Error::IntegrityCheck(
                "deflated stream did not inflate back to its input".into(),
            ));
        }
        Ok(output)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}
