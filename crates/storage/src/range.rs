//! HTTP byte-range parsing and resolution
//!
//! Only the forms browser audio players actually send are supported:
//! `bytes=a-b` and the open-ended `bytes=a-`. Anything else is treated as no
//! range, which falls back to serving the whole object.

/// A requested byte range, before it is resolved against an object's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Inclusive end; `None` means "to the end of the object"
    pub end: Option<u64>,
}

impl ByteRange {
    /// Parse a `Range` request header value.
    pub fn parse(header: &str) -> Option<Self> {
        let spec = header.strip_prefix("bytes=")?.trim();
        let (start, end) = spec.split_once('-')?;

        let start: u64 = start.trim().parse().ok()?;
        let end = match end.trim() {
            "" => None,
            e => {
                let end: u64 = e.parse().ok()?;
                if end < start {
                    return None;
                }
                Some(end)
            }
        };

        Some(Self { start, end })
    }

    /// Resolve against the object's total size, clamping the end.
    ///
    /// Returns the inclusive `(start, end)` pair, or `None` when the range is
    /// unsatisfiable (start beyond the last byte).
    pub fn resolve(&self, total_size: u64) -> Option<(u64, u64)> {
        if total_size == 0 || self.start >= total_size {
            return None;
        }
        let end = self.end.unwrap_or(total_size - 1).min(total_size - 1);
        Some((self.start, end))
    }

    /// Render back as a `Range` request header value.
    pub fn header_value(&self) -> String {
        match self.end {
            Some(end) => format!("bytes={}-{}", self.start, end),
            None => format!("bytes={}-", self.start),
        }
    }
}

/// `Content-Range` response header value for a resolved range.
pub fn content_range(start: u64, end: u64, total_size: u64) -> String {
    format!("bytes {start}-{end}/{total_size}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bounded_range() {
        let range = ByteRange::parse("bytes=100-199").unwrap();
        assert_eq!(range, ByteRange { start: 100, end: Some(199) });
    }

    #[test]
    fn test_parse_open_ended_range() {
        let range = ByteRange::parse("bytes=500-").unwrap();
        assert_eq!(range, ByteRange { start: 500, end: None });
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ByteRange::parse("items=0-1").is_none());
        assert!(ByteRange::parse("bytes=abc-def").is_none());
        assert!(ByteRange::parse("bytes=200-100").is_none());
    }

    #[test]
    fn test_resolve_and_content_range() {
        let range = ByteRange::parse("bytes=100-199").unwrap();
        let (start, end) = range.resolve(1000).unwrap();
        assert_eq!((start, end), (100, 199));
        assert_eq!(content_range(start, end, 1000), "bytes 100-199/1000");
        // 100 bytes served
        assert_eq!(end - start + 1, 100);
    }

    #[test]
    fn test_resolve_clamps_past_the_end() {
        let range = ByteRange::parse("bytes=900-2000").unwrap();
        assert_eq!(range.resolve(1000), Some((900, 999)));

        let open = ByteRange::parse("bytes=0-").unwrap();
        assert_eq!(open.resolve(10), Some((0, 9)));
    }

    #[test]
    fn test_resolve_unsatisfiable() {
        let range = ByteRange::parse("bytes=1000-").unwrap();
        assert_eq!(range.resolve(1000), None);
        assert_eq!(range.resolve(0), None);
    }
}
