//! Frame/timestamp grid.
//!
//! A thumbnail frame rate induces a lattice of millisecond timestamps. Callers
//! must pick an `fps` that divides 1000 evenly; that precondition is not
//! checked here.

/// Milliseconds covered by one frame at `fps`.
pub fn frame_interval_ms(fps: u32) -> u64 {
    1000 / u64::from(fps)
}

/// Timestamp of frame `ordinal` (0-based).
pub fn frame_to_ms(ordinal: u64, fps: u32) -> u64 {
    ordinal * frame_interval_ms(fps)
}

/// Ordinal of the frame containing `ms`.
pub fn ms_to_frame(ms: u64, fps: u32) -> u64 {
    ms / frame_interval_ms(fps)
}

/// Rounds `ms` down to the nearest grid multiple.
pub fn floor_to_grid(ms: u64, fps: u32) -> u64 {
    let interval = frame_interval_ms(fps);
    (ms / interval) * interval
}

/// Rounds `ms` up to the nearest grid multiple.
pub fn ceil_to_grid(ms: u64, fps: u32) -> u64 {
    let interval = frame_interval_ms(fps);
    ms.div_ceil(interval) * interval
}
