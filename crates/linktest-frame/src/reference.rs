use bytes::Bytes;

use crate::error::{FrameError, Result};

/// Byte that marks the start of a frame.
pub const SYNC_MARKER: u8 = b'*';

/// Length of the preamble carrying the sync pattern.
pub const PREAMBLE_LEN: usize = 3;

/// Default reference content: two pad bytes, the sync marker, then a
/// fixed filler text terminated by CRLF.
pub const TEST_PATTERN: &[u8] = b"  *Lorem ipsum dolor sit amet, consectetur adipiscing elit, \
sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, \
quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. Duis aute \
irure dolor in reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla pariatur. \
Excepteur sint occaecat cupidatat non proident, sunt in culpa qui officia deserunt mollit \
anim id est laborum.\r\n";

/// The immutable frame transmitted every cycle.
///
/// Constructed once; read-only for the life of the program. Cloning is
/// cheap (the content is reference-counted).
#[derive(Debug, Clone)]
pub struct ReferenceFrame {
    bytes: Bytes,
    preamble_len: usize,
}

impl ReferenceFrame {
    /// Build a reference frame, checking that the preamble carries the
    /// sync marker.
    pub fn new(bytes: impl Into<Bytes>, preamble_len: usize) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() < preamble_len || preamble_len == 0 {
            return Err(FrameError::ReferenceTooShort {
                len: bytes.len(),
                preamble: preamble_len,
            });
        }
        if !bytes[..preamble_len].contains(&SYNC_MARKER) {
            return Err(FrameError::PreambleMissingMarker);
        }
        Ok(Self {
            bytes,
            preamble_len,
        })
    }

    /// The stock test pattern.
    pub fn test_pattern() -> Self {
        Self {
            bytes: Bytes::from_static(TEST_PATTERN),
            preamble_len: PREAMBLE_LEN,
        }
    }

    /// Full frame content, preamble included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Frame length in bytes.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Preamble length in bytes.
    pub fn preamble_len(&self) -> usize {
        self.preamble_len
    }

    /// Content after the preamble — what the receive side must match.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[self.preamble_len..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_well_formed() {
        let frame = ReferenceFrame::test_pattern();
        assert_eq!(frame.len(), 450);
        assert_eq!(frame.preamble_len(), PREAMBLE_LEN);
        assert_eq!(frame.as_bytes()[2], SYNC_MARKER);
        assert!(frame.as_bytes().ends_with(b"laborum.\r\n"));
        assert_eq!(frame.payload().len(), frame.len() - PREAMBLE_LEN);
    }

    #[test]
    fn rejects_preamble_without_marker() {
        let result = ReferenceFrame::new(&b"abcdef"[..], 3);
        assert_eq!(result.unwrap_err(), FrameError::PreambleMissingMarker);
    }

    #[test]
    fn rejects_short_reference() {
        let result = ReferenceFrame::new(&b"*"[..], 3);
        assert!(matches!(
            result,
            Err(FrameError::ReferenceTooShort { len: 1, preamble: 3 })
        ));
    }

    #[test]
    fn single_byte_preamble() {
        let frame = ReferenceFrame::new(&b"*ABC"[..], 1).expect("marker-led frame should build");
        assert_eq!(frame.payload(), b"ABC");
    }
}
