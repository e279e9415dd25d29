use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::Path;

static EPISODE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"S(\d+)E(\d+)").expect("valid regex"));

/// Extracts `(season, episode)` from the first `S<digits>E<digits>` anywhere
/// in `path`.
pub fn parse_episode(path: &Path) -> Option<(u32, u32)> {
    let text = path.to_string_lossy();
    let captures = EPISODE_PATTERN.captures(&text)?;
    let season = captures.get(1)?.as_str().parse().ok()?;
    let episode = captures.get(2)?.as_str().parse().ok()?;
    Some((season, episode))
}
