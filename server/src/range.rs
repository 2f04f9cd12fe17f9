//! Parsing for `Range: bytes=start-end` request headers.

use crate::errors::BackendError;

/// An inclusive byte range within a payload of known length.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ByteRange {
    pub(crate) start: u64,
    pub(crate) end: u64,
}

impl ByteRange {
    /// The number of bytes the range covers.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Parses a `bytes=start-end` header against a payload of `total` bytes.
///
/// The end position is optional and defaults to the final byte; an end
/// past the payload is clamped. A syntactically broken header (missing
/// prefix, multiple ranges, missing or reversed positions) is rejected
/// outright, while a well-formed range lying wholly outside the payload
/// is unsatisfiable.
pub fn parse(header: &str, total: u64) -> Result<ByteRange, BackendError> {
    let malformed = || BackendError::InvalidRange(header.to_owned());

    let value = header.strip_prefix("bytes=").ok_or_else(malformed)?;

    // multiple ranges are not supported
    if value.contains(',') {
        return Err(malformed());
    }

    let mut positions = value.splitn(2, '-');
    let start = positions.next().ok_or_else(malformed)?;
    let end = positions.next().ok_or_else(malformed)?;

    // an empty start would be a suffix range, which this parser does not
    // accept either
    let start: u64 = start.parse().map_err(|_| malformed())?;

    let end: u64 = if end.is_empty() {
        total.saturating_sub(1)
    } else {
        let end = end.parse().map_err(|_| malformed())?;

        if end < start {
            return Err(malformed());
        }

        end
    };

    if start >= total {
        return Err(BackendError::RangeNotSatisfiable { start, total });
    }

    Ok(ByteRange {
        start,
        end: end.min(total - 1),
    })
}

#[cfg(test)]
mod tests {
    use crate::errors::BackendError;

    use super::{parse, ByteRange};

    #[test]
    fn bounded_ranges_parse() {
        assert_eq!(parse("bytes=0-99", 300).unwrap(), ByteRange { start: 0, end: 99 });
        assert_eq!(parse("bytes=100-100", 300).unwrap(), ByteRange { start: 100, end: 100 });
        assert_eq!(parse("bytes=0-99", 300).unwrap().length(), 100);
    }

    #[test]
    fn open_ended_ranges_run_to_the_final_byte() {
        assert_eq!(parse("bytes=250-", 300).unwrap(), ByteRange { start: 250, end: 299 });
        assert_eq!(parse("bytes=0-", 300).unwrap(), ByteRange { start: 0, end: 299 });
    }

    #[test]
    fn ends_past_the_payload_are_clamped() {
        assert_eq!(parse("bytes=200-5000", 300).unwrap(), ByteRange { start: 200, end: 299 });
    }

    #[test]
    fn malformed_headers_are_rejected() {
        for header in &[
            "bytes",
            "bytes=",
            "bytes=-",
            "bytes=-500",
            "bytes=abc-def",
            "bytes=99-0",
            "bytes=0-99,200-299",
            "items=0-99",
        ] {
            assert!(
                matches!(parse(header, 300), Err(BackendError::InvalidRange(_))),
                "{:?} must be rejected as malformed",
                header
            );
        }
    }

    #[test]
    fn ranges_outside_the_payload_are_unsatisfiable() {
        assert!(matches!(
            parse("bytes=300-", 300),
            Err(BackendError::RangeNotSatisfiable { start: 300, total: 300 })
        ));
        assert!(matches!(
            parse("bytes=0-", 0),
            Err(BackendError::RangeNotSatisfiable { .. })
        ));
    }
}
