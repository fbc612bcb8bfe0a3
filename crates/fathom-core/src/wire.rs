//! Wire codec for the depth stream.
//!
//! Wire format (server → client, unidirectional):
//! ```text
//! ["0"-"9"]+ ["\n"]?
//! ```
//! Each record is the ASCII decimal encoding of a depth value. Records are
//! newline-delimited when possible, but the sender appends no terminator of
//! its own, so the receiver must also accept an unterminated fragment as a
//! complete record when it parses on its own ("tolerant framing"). There is
//! no length prefix, no checksum, no heartbeat, and no acknowledgement —
//! only the latest value matters, so a lost or early-applied record has no
//! semantic cost.

use thiserror::Error;

use crate::depth::Depth;

/// Upper bound on the bytes retained while waiting for a record to resolve.
///
/// A well-formed stream never comes close: the longest record is four digits
/// plus a newline. The cap only matters when the peer sends undelimited junk,
/// which would otherwise accumulate forever.
const MAX_PENDING_BYTES: usize = 64;

/// Errors produced while decoding the depth stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    /// A record did not parse as a non-negative decimal integer.
    ///
    /// Malformed records are dropped by callers and never affect the
    /// current depth value.
    #[error("malformed depth record: {0:?}")]
    Malformed(String),
}

/// Encodes a depth value for the wire.
///
/// Returns the bare decimal digits with **no** terminator; the protocol
/// relies on the receiver's tolerant framing (see [`DepthParser`]).
pub fn encode_depth(depth: Depth) -> Vec<u8> {
    depth.to_string().into_bytes()
}

/// Incremental parser for the inbound depth byte stream.
///
/// Bytes received but not yet resolved into a complete record accumulate
/// internally. Feeding more bytes resolves records in arrival order:
///
/// 1. Every segment terminated by `\n` parses as one record.
/// 2. Tolerant tail: a non-empty unterminated remainder that parses as an
///    integer on its own is accepted immediately and the buffer cleared —
///    a value can be observed before its newline arrives.
/// 3. A remainder that does not parse yet (e.g. invalid UTF-8 mid-sequence,
///    or garbage awaiting its delimiter) is retained for the next feed.
///
/// The parser never fails the stream as a whole: malformed records are
/// reported individually and skipped.
#[derive(Debug, Default)]
pub struct DepthParser {
    buf: Vec<u8>,
}

impl DepthParser {
    /// Creates an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of buffered bytes awaiting resolution.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Appends `bytes` and returns the records resolved by this feed, in
    /// arrival order. Values above the sensor range clamp to [`Depth`]'s
    /// maximum, matching the data model.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<Depth, WireError>> {
        self.buf.extend_from_slice(bytes);

        let mut records = Vec::new();

        // Complete (newline-terminated) records first.
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let segment: Vec<u8> = self.buf.drain(..=pos).take(pos).collect();
            if let Some(record) = parse_segment(&segment) {
                records.push(record);
            }
        }

        // Tolerant tail: accept the remainder now if it already parses.
        if !self.buf.is_empty() {
            if let Some(Ok(depth)) = parse_segment(&self.buf) {
                records.push(Ok(depth));
                self.buf.clear();
            } else if self.buf.len() > MAX_PENDING_BYTES {
                // Undelimited junk; discard it rather than grow without bound.
                let junk = String::from_utf8_lossy(&self.buf).into_owned();
                self.buf.clear();
                records.push(Err(WireError::Malformed(junk)));
            }
        }

        records
    }
}

/// Parses one record segment (without its delimiter).
///
/// Returns `None` for segments that are empty after trimming ASCII
/// whitespace — blank lines and stray `\r` are not errors, just skipped.
fn parse_segment(segment: &[u8]) -> Option<Result<Depth, WireError>> {
    let text = match std::str::from_utf8(segment) {
        Ok(text) => text.trim(),
        Err(_) => {
            return Some(Err(WireError::Malformed(
                String::from_utf8_lossy(segment).into_owned(),
            )))
        }
    };

    if text.is_empty() {
        return None;
    }

    match text.parse::<u32>() {
        Ok(raw) => Some(Ok(Depth::clamped(raw))),
        Err(_) => Some(Err(WireError::Malformed(text.to_string()))),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Collects only the successfully parsed values from a feed.
    fn values(records: Vec<Result<Depth, WireError>>) -> Vec<u16> {
        records.into_iter().flatten().map(Depth::get).collect()
    }

    #[test]
    fn test_newline_terminated_records_parse_in_order() {
        let mut parser = DepthParser::new();
        let records = parser.feed(b"100\n200\n300\n");
        assert_eq!(values(records), vec![100, 200, 300]);
        assert_eq!(parser.pending(), 0);
    }

    #[test]
    fn test_malformed_record_is_dropped_and_later_record_accepted() {
        // The canonical robustness case: first record garbage, second fine.
        let mut parser = DepthParser::new();
        let records = parser.feed(b"12ab\n34\n");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Err(WireError::Malformed("12ab".to_string())));
        assert_eq!(records[1], Ok(Depth::clamped(34)));
    }

    #[test]
    fn test_tolerant_tail_accepts_unterminated_record() {
        let mut parser = DepthParser::new();
        let records = parser.feed(b"512");
        assert_eq!(values(records), vec![512]);
        assert_eq!(parser.pending(), 0, "accepted tail must clear the buffer");
    }

    #[test]
    fn test_record_split_across_feeds_resolves_by_tolerant_tail() {
        // "5" is itself a valid integer, so the tolerant-tail rule applies
        // to each fragment as it arrives. Only the latest value matters.
        let mut parser = DepthParser::new();
        assert_eq!(values(parser.feed(b"5")), vec![5]);
        assert_eq!(values(parser.feed(b"12\n")), vec![12]);
    }

    #[test]
    fn test_unparseable_tail_is_retained_until_delimited() {
        let mut parser = DepthParser::new();
        // "4a" does not parse on its own, so it waits for its delimiter.
        assert!(parser.feed(b"4a").is_empty());
        assert_eq!(parser.pending(), 2);
        // The newline resolves it as one (malformed) record.
        let records = parser.feed(b"\n");
        assert_eq!(records, vec![Err(WireError::Malformed("4a".to_string()))]);
    }

    #[test]
    fn test_crlf_terminated_record_parses() {
        let mut parser = DepthParser::new();
        assert_eq!(values(parser.feed(b"40\r\n")), vec![40]);
    }

    #[test]
    fn test_blank_lines_are_skipped_silently() {
        let mut parser = DepthParser::new();
        let records = parser.feed(b"\n\n7\n\n");
        assert_eq!(records, vec![Ok(Depth::clamped(7))]);
    }

    #[test]
    fn test_values_above_sensor_range_clamp() {
        let mut parser = DepthParser::new();
        assert_eq!(values(parser.feed(b"4096\n")), vec![1024]);
    }

    #[test]
    fn test_negative_record_is_malformed() {
        let mut parser = DepthParser::new();
        let records = parser.feed(b"-3\n");
        assert_eq!(records, vec![Err(WireError::Malformed("-3".to_string()))]);
    }

    #[test]
    fn test_invalid_utf8_record_is_malformed_not_a_panic() {
        let mut parser = DepthParser::new();
        let records = parser.feed(&[0xFF, 0xFE, b'\n']);
        assert!(matches!(records[0], Err(WireError::Malformed(_))));
    }

    #[test]
    fn test_undelimited_junk_is_discarded_at_the_cap() {
        let mut parser = DepthParser::new();
        let junk = vec![b'x'; MAX_PENDING_BYTES + 1];

        let records = parser.feed(&junk);

        assert!(matches!(records[0], Err(WireError::Malformed(_))));
        assert_eq!(parser.pending(), 0, "junk must not accumulate");

        // The parser recovers: the next well-formed record parses.
        assert_eq!(values(parser.feed(b"88\n")), vec![88]);
    }

    #[test]
    fn test_encode_appends_no_terminator() {
        assert_eq!(encode_depth(Depth::clamped(512)), b"512".to_vec());
    }

    #[test]
    fn test_encode_then_feed_roundtrips_via_tolerant_tail() {
        let mut parser = DepthParser::new();
        let bytes = encode_depth(Depth::clamped(1024));
        assert_eq!(values(parser.feed(&bytes)), vec![1024]);
    }
}
