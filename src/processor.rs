//! Turning a file's bytes into the `token -> positions` map the store wants,
//! via a pluggable, streaming [`FileProcessor`].
//!
//! Positions are assigned as a single monotonically increasing counter
//! across the whole file — not per-line, not per-chunk — so a phrase that
//! happens to straddle what was originally two lines (or two read buffers)
//! is still recoverable by adjacent-position arithmetic in
//! [`crate::store::IndexStore::query_phrase`].

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use crate::tokenizer::{TokenizationSession, Tokenizer};
use crate::types::{Position, PositionList, Token};

const CHUNK_SIZE: usize = 64 * 1024;

/// Produces the positional token map for one file's contents.
pub trait FileProcessor: Send + Sync {
    /// Read and tokenize `path`, assigning sequential global positions.
    /// Returns `Err` only for I/O failures; an unreadable-as-UTF-8 file is
    /// not itself an error (see [`StreamingFileProcessor`] for the lossy
    /// decode policy).
    fn process(&self, path: &Path) -> io::Result<HashMap<Token, PositionList>>;
}

/// Reads a file in fixed-size chunks through a [`Tokenizer`] session,
/// assigning sequential positions across the whole read rather than
/// resetting per chunk.
///
/// Chunks are decoded with `String::from_utf8_lossy`, splitting only at
/// character boundaries the tokenizer session is already responsible for
/// stitching back together; a chunk boundary landing inside a multi-byte
/// UTF-8 sequence is handled by carrying the undecoded tail into the next
/// read rather than lossily replacing it.
pub struct StreamingFileProcessor {
    tokenizer: Box<dyn Tokenizer>,
}

impl StreamingFileProcessor {
    pub fn new(tokenizer: Box<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }
}

impl FileProcessor for StreamingFileProcessor {
    fn process(&self, path: &Path) -> io::Result<HashMap<Token, PositionList>> {
        let mut file = fs::File::open(path)?;
        let mut session = self.tokenizer.start_session();
        let mut positions: HashMap<Token, PositionList> = HashMap::new();
        let mut next_position: Position = 0;
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut pending_bytes: Vec<u8> = Vec::new();

        let mut record = |tokens: Vec<Token>, positions: &mut HashMap<Token, PositionList>, next_position: &mut Position| {
            for token in tokens {
                positions.entry(token).or_default().push(*next_position);
                *next_position += 1;
            }
        };

        loop {
            let read = file.read(&mut buf)?;
            if read == 0 {
                break;
            }
            pending_bytes.extend_from_slice(&buf[..read]);

            let (valid_len, text) = decode_valid_prefix(&pending_bytes);
            let tokens = session.feed(&text);
            record(tokens, &mut positions, &mut next_position);
            pending_bytes.drain(..valid_len);
        }

        if !pending_bytes.is_empty() {
            // Trailing invalid bytes at EOF: decode lossily rather than drop.
            let text = String::from_utf8_lossy(&pending_bytes).into_owned();
            let tokens = session.feed(&text);
            record(tokens, &mut positions, &mut next_position);
        }

        let tokens = session.finish();
        record(tokens, &mut positions, &mut next_position);

        for list in positions.values_mut() {
            list.sort_unstable();
        }

        Ok(positions)
    }
}

/// Split `bytes` at the longest valid-UTF-8 prefix, returning that prefix's
/// byte length and its decoded `String`. The remainder (an incomplete
/// trailing multi-byte sequence) is left in the caller's buffer for the
/// next chunk.
fn decode_valid_prefix(bytes: &[u8]) -> (usize, String) {
    match std::str::from_utf8(bytes) {
        Ok(s) => (bytes.len(), s.to_string()),
        Err(e) => {
            let valid_len = e.valid_up_to();
            // Safety net: if even the first byte is invalid, `valid_up_to`
            // is 0 and we fall back to decoding everything lossily so a
            // single bad byte can't permanently stall the pending buffer.
            if valid_len == 0 {
                (bytes.len(), String::from_utf8_lossy(bytes).into_owned())
            } else {
                (valid_len, String::from_utf8(bytes[..valid_len].to_vec()).expect("validated prefix"))
            }
        }
    }
}
