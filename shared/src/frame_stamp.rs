//! Scope frame counter pixel codec.
//!
//! Recorded frames carry the scope's frame counter embedded in their own
//! pixel data, so the synchronization channel survives any downstream
//! image pipeline that preserves raw pixel values. The counter is
//! base-256 decomposed and written as three nested flat fills in the
//! top-left corner: 3x3 = low byte, 2x2 = middle byte, 1x1 = high byte.

use ndarray::{s, Array2, ArrayView2};
use thiserror::Error;

/// One past the largest encodable counter value (24 bits).
pub const MAX_SCOPE_FRAME: u32 = 1 << 24;

/// Side length of the stamped corner block, in pixels.
pub const STAMP_BLOCK: usize = 3;

/// Errors produced by the frame stamp codec.
#[derive(Error, Debug)]
pub enum StampError {
    /// Counter does not fit in the 24-bit stamp.
    #[error("scope frame {0} exceeds the 24-bit stamp range")]
    CounterOutOfRange(u32),

    /// Frame is smaller than the stamp block.
    #[error("frame {rows}x{cols} is smaller than the 3x3 stamp block")]
    FrameTooSmall { rows: usize, cols: usize },
}

fn check_dims(rows: usize, cols: usize) -> Result<(), StampError> {
    if rows < STAMP_BLOCK || cols < STAMP_BLOCK {
        return Err(StampError::FrameTooSmall { rows, cols });
    }
    Ok(())
}

/// Stamp `scope_frame` into the top-left corner of `frame`.
///
/// The fills run largest block first, so the smaller blocks win inside
/// the larger block's footprint and the corner pixel always holds the
/// high byte. Re-encoding the same counter is idempotent.
pub fn encode_scope_frame(scope_frame: u32, frame: &mut Array2<u8>) -> Result<(), StampError> {
    if scope_frame >= MAX_SCOPE_FRAME {
        return Err(StampError::CounterOutOfRange(scope_frame));
    }
    let (rows, cols) = frame.dim();
    check_dims(rows, cols)?;

    let (q2, rem) = (scope_frame / 65536, scope_frame % 65536);
    let (q1, r0) = (rem / 256, rem % 256);

    frame.slice_mut(s![..3, ..3]).fill(r0 as u8);
    frame.slice_mut(s![..2, ..2]).fill(q1 as u8);
    frame.slice_mut(s![..1, ..1]).fill(q2 as u8);
    Ok(())
}

/// Recover the counter stamped by [`encode_scope_frame`].
///
/// Reads one representative pixel per block: `[0,0]` is only ever
/// written by the 1x1 fill, `[1,1]` survives from the 2x2 fill, and
/// `[2,2]` from the 3x3 fill.
pub fn decode_scope_frame(frame: &ArrayView2<u8>) -> Result<u32, StampError> {
    let (rows, cols) = frame.dim();
    check_dims(rows, cols)?;

    let q2 = frame[[0, 0]] as u32;
    let q1 = frame[[1, 1]] as u32;
    let r0 = frame[[2, 2]] as u32;
    Ok(65536 * q2 + 256 * q1 + r0)
}
