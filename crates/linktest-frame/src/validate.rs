use tracing::trace;

use crate::error::{FrameError, Result};
use crate::reference::{ReferenceFrame, SYNC_MARKER};

/// Position of the first sync marker in `buf`, if any.
pub fn locate_marker(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == SYNC_MARKER)
}

/// Check a received buffer against the reference, byte for byte.
///
/// The marker is searched anywhere in `received` — a lost pad byte shifts
/// the whole frame left, so the marker position is not fixed. Everything
/// after the marker must equal the reference payload exactly. A marker too
/// close to the end of the buffer is a truncated frame, reported as such
/// rather than read past the buffer.
pub fn validate(received: &[u8], reference: &ReferenceFrame) -> Result<()> {
    let Some(pos) = locate_marker(received) else {
        trace!("no sync marker in {} received bytes", received.len());
        return Err(FrameError::MarkerMissing);
    };

    let got = &received[pos + 1..];
    let want = reference.payload();
    if got.len() < want.len() {
        trace!(marker = pos, got = got.len(), "frame truncated after marker");
        return Err(FrameError::Truncated {
            got: got.len(),
            need: want.len(),
        });
    }

    match got[..want.len()].iter().zip(want).position(|(a, b)| a != b) {
        Some(offset) => {
            trace!(marker = pos, offset, "payload mismatch");
            Err(FrameError::ContentMismatch { offset })
        }
        None => Ok(()),
    }
}
