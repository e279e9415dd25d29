//! SubRip (.srt) reading and writing.

use super::SubtitleError;

/// A cue as it appears in the file, before alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCue {
    pub start_ms: u64,
    pub end_ms: u64,
    pub lines: Vec<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum State {
    /// Between cues. Stray text lands on the previous cue.
    Idle,
    /// Saw a numeric line, expecting the timing line.
    Counter,
    /// Collecting text lines of the current cue.
    Text,
}

/// Parses an SRT document. Cue order is preserved; overlapping cues are kept.
///
/// Text outside a cue block (a blank line inside a cue's text, a numeric line
/// not followed by a timing line) is appended to the previous cue; text before
/// the first cue is dropped. Only broken timing lines are errors.
pub fn parse_srt(bytes: &[u8]) -> Result<Vec<RawCue>, SubtitleError> {
    let text = std::str::from_utf8(bytes).map_err(|_| SubtitleError::Encoding)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut cues: Vec<RawCue> = Vec::new();
    let mut state = State::Idle;
    let mut current: Option<RawCue> = None;
    let mut counter = String::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim_end_matches('\r');

        match state {
            State::Idle => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed.contains("-->") {
                    current = Some(parse_timing(trimmed, line_no)?);
                    state = State::Text;
                } else if trimmed.chars().all(|c| c.is_ascii_digit()) {
                    counter = line.to_string();
                    state = State::Counter;
                } else {
                    append_stray(&mut cues, line);
                }
            }
            State::Counter => {
                if line.contains("-->") {
                    current = Some(parse_timing(line.trim(), line_no)?);
                    state = State::Text;
                } else {
                    append_stray(&mut cues, &counter);
                    if !line.trim().is_empty() {
                        append_stray(&mut cues, line);
                    }
                    state = State::Idle;
                }
            }
            State::Text => {
                if line.trim().is_empty() {
                    if let Some(cue) = current.take() {
                        cues.push(cue);
                    }
                    state = State::Idle;
                } else if let Some(cue) = current.as_mut() {
                    cue.lines.push(line.to_string());
                }
            }
        }
    }

    if state == State::Counter {
        append_stray(&mut cues, &counter);
    }
    if let Some(cue) = current.take() {
        cues.push(cue);
    }

    Ok(cues)
}

fn append_stray(cues: &mut [RawCue], line: &str) {
    if let Some(cue) = cues.last_mut() {
        cue.lines.push(line.to_string());
    }
}

fn parse_timing(line: &str, line_no: usize) -> Result<RawCue, SubtitleError> {
    let (start, rest) = line
        .split_once("-->")
        .ok_or_else(|| SubtitleError::parse(line_no, format!("expected timing line, found {:?}", line)))?;
    // Position hints may follow the end timestamp.
    let end = rest.split_whitespace().next().unwrap_or("");

    let start_ms = parse_timestamp(start.trim())
        .ok_or_else(|| SubtitleError::parse(line_no, format!("bad start timestamp {:?}", start.trim())))?;
    let end_ms = parse_timestamp(end)
        .ok_or_else(|| SubtitleError::parse(line_no, format!("bad end timestamp {:?}", end)))?;

    if end_ms < start_ms {
        return Err(SubtitleError::parse(line_no, "cue ends before it starts"));
    }

    Ok(RawCue {
        start_ms,
        end_ms,
        lines: Vec::new(),
    })
}

/// Parses `HH:MM:SS,mmm` (a `.` separator is accepted too).
fn parse_timestamp(value: &str) -> Option<u64> {
    let (clock, millis) = value.split_once([',', '.'])?;
    let mut parts = clock.split(':');
    let hours: u64 = parts.next()?.trim().parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }
    if millis.is_empty() || millis.len() > 3 || !millis.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    // "5" means 500ms, "05" means 50ms.
    let millis: u64 = format!("{:0<3}", millis).parse().ok()?;
    Some(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

/// Formats milliseconds as `HH:MM:SS,mmm`.
pub fn format_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms / 60_000) % 60;
    let seconds = (ms / 1000) % 60;
    let millis = ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Builds a one-cue SRT document covering `[0, duration_ms]`.
pub fn single_cue_srt(duration_ms: u64, text: &str) -> String {
    format!(
        "1\n{} --> {}\n{}\n",
        format_timestamp(0),
        format_timestamp(duration_ms),
        text.trim_end_matches('\n')
    )
}
