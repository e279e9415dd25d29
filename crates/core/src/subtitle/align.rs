//! Quantizes cue times onto the thumbnail frame grid.

use super::srt::parse_srt;
use super::SubtitleError;
use crate::grid::{ceil_to_grid, floor_to_grid};
use crate::metadata::SubtitleCue;

/// Parses a cue file and snaps every cue to the grid induced by `fps`:
/// starts round down, ends round up. Each text line gets a trailing newline.
pub fn align_cues(bytes: &[u8], fps: u32) -> Result<Vec<SubtitleCue>, SubtitleError> {
    let cues = parse_srt(bytes)?;
    Ok(cues
        .into_iter()
        .map(|cue| {
            let mut text = String::new();
            for line in &cue.lines {
                text.push_str(line);
                text.push('\n');
            }
            SubtitleCue {
                start_ms: floor_to_grid(cue.start_ms, fps),
                end_ms: ceil_to_grid(cue.end_ms, fps),
                text,
            }
        })
        .collect())
}
