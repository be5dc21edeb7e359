//! Incremental UTF-8 decoder for chunked response bodies.
//!
//! Network reads split the body at arbitrary byte offsets, so a multi-byte
//! character can straddle two chunks. The decoder keeps the undecoded tail
//! of each chunk and prefixes it to the next one.
//!
//! Behavior matches a non-fatal WHATWG `TextDecoder` in streaming mode:
//!
//! - incomplete trailing sequences are carried, never emitted early
//! - bytes that can never form a character become U+FFFD
//! - a byte order mark at the very start of the stream is dropped
//! - [`Utf8StreamDecoder::finish`] flushes the carry; an incomplete tail
//!   becomes a single U+FFFD

const BOM: char = '\u{FEFF}';

/// Stateful decoder for one response body.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
    started: bool,
}

impl Utf8StreamDecoder {
    /// Creates a decoder positioned at the start of a stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the next chunk, returning whatever text is now complete.
    ///
    /// The result may be empty when every byte had to be carried.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::new();
        let mut consumed = 0;

        loop {
            let tail = &self.pending[consumed..];
            match std::str::from_utf8(tail) {
                Ok(valid) => {
                    out.push_str(valid);
                    consumed = self.pending.len();
                    break;
                }
                Err(err) => {
                    let valid_len = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&tail[..valid_len]));
                    match err.error_len() {
                        Some(invalid_len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            consumed += valid_len + invalid_len;
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes.
                            consumed += valid_len;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..consumed);
        self.strip_leading_bom(out)
    }

    /// Flushes any carried bytes at end of stream and resets the decoder.
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        let out = String::from_utf8_lossy(&rest).into_owned();
        let out = self.strip_leading_bom(out);
        self.started = false;
        out
    }

    /// Returns the number of bytes waiting for the rest of their character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn strip_leading_bom(&mut self, out: String) -> String {
        if self.started || out.is_empty() {
            return out;
        }
        self.started = true;
        match out.strip_prefix(BOM) {
            Some(rest) => rest.to_string(),
            None => out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn passes_ascii_through() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"Hello"), "Hello");
        assert_eq!(decoder.decode(b" world"), " world");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn carries_split_multibyte_character() {
        // "é" is C3 A9
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&[b'c', b'a', b'f', 0xC3]), "caf");
        assert_eq!(decoder.pending_len(), 1);
        assert_eq!(decoder.decode(&[0xA9, b'!']), "é!");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn carries_four_byte_character_across_three_chunks() {
        let bytes = "🚀".as_bytes();
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&bytes[..1]), "");
        assert_eq!(decoder.decode(&bytes[1..3]), "");
        assert_eq!(decoder.decode(&bytes[3..]), "🚀");
    }

    #[test]
    fn replaces_invalid_bytes() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn finish_flushes_incomplete_tail_as_replacement() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&[b'o', b'k', 0xE2, 0x82]), "ok");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn strips_leading_bom_once() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&[0xEF, 0xBB]), "");
        assert_eq!(decoder.decode(&[0xBF, b'H', b'i']), "Hi");
        assert_eq!(decoder.decode("\u{FEFF}x".as_bytes()), "\u{FEFF}x");
    }

    proptest! {
        #[test]
        fn output_is_independent_of_split_points(
            text in "\\PC{0,40}",
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..6),
        ) {
            let bytes = text.as_bytes();
            let mut offsets: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
            offsets.sort_unstable();

            let mut decoder = Utf8StreamDecoder::new();
            let mut out = String::new();
            let mut start = 0;
            for offset in offsets {
                out.push_str(&decoder.decode(&bytes[start..offset]));
                start = offset;
            }
            out.push_str(&decoder.decode(&bytes[start..]));
            out.push_str(&decoder.finish());

            let expected = text.strip_prefix('\u{FEFF}').unwrap_or(&text);
            prop_assert_eq!(out, expected);
        }
    }
}
