//! Storage keys for the on-disk layout the serving layer relies on.

/// Key of the published metadata index.
pub const INDEX_KEY: &str = "internal/metadata.db";

/// Schema version of the per-episode completion marker. Bumping it
/// invalidates every marker and forces full reprocessing.
pub const MARKER_VERSION: u32 = 1;

/// Keys for one episode's artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeKeys {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeKeys {
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }

    fn episode_dir(&self) -> String {
        format!("{:02}/{:02}", self.season, self.episode)
    }

    /// `internal/<SS>/<EE>`
    pub fn internal_dir(&self) -> String {
        format!("internal/{}", self.episode_dir())
    }

    /// `public/<SS>/<EE>`
    pub fn public_dir(&self) -> String {
        format!("public/{}", self.episode_dir())
    }

    /// Completion marker for the current schema version.
    pub fn marker(&self) -> String {
        self.marker_for_version(MARKER_VERSION)
    }

    pub fn marker_for_version(&self, version: u32) -> String {
        format!("{}/METADATA.{}.json", self.internal_dir(), version)
    }

    /// Proxy video. Non-positive dimensions keep the aspect ratio and are
    /// rendered as `-1`.
    pub fn proxy_video(&self, width: i32, height: i32) -> String {
        format!(
            "{}/downscale_{}_{}.mkv",
            self.internal_dir(),
            normalize_dimension(width),
            normalize_dimension(height)
        )
    }

    /// Demuxed subtitle cues.
    pub fn subtitles(&self) -> String {
        format!("{}/subtitles.srt", self.internal_dir())
    }

    /// Timestamp-keyed thumbnail.
    pub fn thumbnail(&self, timestamp_ms: u64) -> String {
        format!("{}/thumb_{:08}.jpg", self.public_dir(), timestamp_ms)
    }

    /// Numbered staging frame pattern handed to the toolchain.
    pub fn thumbnail_staging_pattern(&self) -> String {
        format!("{}/_thumb_%08d.jpg", self.public_dir())
    }
}

/// Maps "unset" dimensions to the toolchain's keep-aspect value.
pub fn normalize_dimension(value: i32) -> i32 {
    if value > 0 {
        value
    } else {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_zero_padded() {
        let keys = EpisodeKeys::new(1, 7);
        assert_eq!(keys.marker(), "internal/01/07/METADATA.1.json");
        assert_eq!(keys.proxy_video(640, -1), "internal/01/07/downscale_640_-1.mkv");
        assert_eq!(keys.subtitles(), "internal/01/07/subtitles.srt");
        assert_eq!(keys.thumbnail(1200), "public/01/07/thumb_00001200.jpg");
        assert_eq!(keys.thumbnail_staging_pattern(), "public/01/07/_thumb_%08d.jpg");
    }

    #[test]
    fn test_marker_version_is_part_of_key() {
        let keys = EpisodeKeys::new(12, 3);
        assert_ne!(keys.marker_for_version(1), keys.marker_for_version(2));
        assert_eq!(keys.marker_for_version(2), "internal/12/03/METADATA.2.json");
    }

    #[test]
    fn test_wide_numbers_are_not_truncated() {
        let keys = EpisodeKeys::new(2, 104);
        assert_eq!(keys.subtitles(), "internal/02/104/subtitles.srt");
    }

    #[test]
    fn test_unset_dimensions() {
        assert_eq!(EpisodeKeys::new(1, 1).proxy_video(0, 0), "internal/01/01/downscale_-1_-1.mkv");
    }
}
