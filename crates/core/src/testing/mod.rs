//! Testing utilities and mock implementations.
//!
//! This module provides a mock of the transcode toolchain, so the pipeline
//! and the clip renderer can be exercised end to end without ffmpeg.
//!
//! # Example
//!
//! ```rust,ignore
//! use clyper_core::testing::{fixtures, MockToolchain};
//!
//! let toolchain = MockToolchain::new();
//! let preprocessor = Preprocessor::new(PreprocessConfig::default(), toolchain.clone());
//!
//! fixtures::touch(input.path(), &["Show.S01E01.mkv"]);
//! preprocessor.process(input.path(), output.path()).await?;
//!
//! assert_eq!(toolchain.run_count().await, 1);
//! ```

mod mock_toolchain;

pub use mock_toolchain::{MockToolchain, DEFAULT_SRT};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::metadata::{EpisodeMetadata, SubtitleCue, ThumbRef};
    use crate::objstore::EpisodeKeys;

    /// Create empty source files (relative paths, parents created).
    pub fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("create fixture dir");
            }
            std::fs::write(&path, b"").expect("write fixture file");
        }
    }

    /// Create episode metadata with thumbnails at `starts` (200 ms frames)
    /// and one cue per entry of `cues`.
    pub fn episode_metadata(
        season: u32,
        episode: u32,
        starts: &[u64],
        cues: &[(u64, u64, &str)],
    ) -> EpisodeMetadata {
        let keys = EpisodeKeys::new(season, episode);
        EpisodeMetadata {
            season,
            episode,
            thumbs: starts
                .iter()
                .map(|&start_ms| ThumbRef {
                    storage_key: keys.thumbnail(start_ms),
                    start_ms,
                    end_ms: start_ms + 200,
                })
                .collect(),
            subtitles: cues
                .iter()
                .map(|&(start_ms, end_ms, text)| SubtitleCue {
                    start_ms,
                    end_ms,
                    text: format!("{}\n", text),
                })
                .collect(),
            video_file_key: keys.proxy_video(640, -1),
            subs_file_key: keys.subtitles(),
        }
    }
}
