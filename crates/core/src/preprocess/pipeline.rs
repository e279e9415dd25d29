//! Preprocessing pipeline implementation.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::grid::{frame_interval_ms, frame_to_ms};
use crate::metadata::{EpisodeMetadata, IndexBuilder, ThumbRef};
use crate::objstore::{
    normalize_dimension, EpisodeKeys, LocalObjectStore, ObjectStore, ObjectStoreError, INDEX_KEY,
};
use crate::subtitle::align_cues;
use crate::toolchain::{
    FilterGraph, GraphInput, GraphOutput, Pad, StreamInfo, StreamKind, Toolchain,
};

use super::config::PreprocessConfig;
use super::episode::parse_episode;
use super::PreprocessError;

const STAGING_PREFIX: &str = "_thumb_";
const STAGING_SUFFIX: &str = ".jpg";

/// Counts from one preprocessing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Episodes transcoded during this run.
    pub processed: usize,
    /// Episodes loaded from an existing completion marker.
    pub reused: usize,
    /// Files without an episode tag.
    pub skipped: usize,
}

impl ProcessSummary {
    pub fn indexed(&self) -> usize {
        self.processed + self.reused
    }
}

/// Stream indices selected for one source file.
struct SelectedStreams {
    video: u32,
    subtitle: u32,
}

/// Runs the batch preprocessing pipeline.
///
/// Episodes are handled one at a time in lexical walk order. The first
/// probe or transcode failure aborts the run and nothing is published.
pub struct Preprocessor<T: Toolchain> {
    config: PreprocessConfig,
    toolchain: T,
    index_key: String,
}

impl<T: Toolchain> Preprocessor<T> {
    pub fn new(config: PreprocessConfig, toolchain: T) -> Self {
        Self {
            config,
            toolchain,
            index_key: INDEX_KEY.to_string(),
        }
    }

    /// Publishes the index under `key` instead of [`INDEX_KEY`].
    pub fn with_index_key(mut self, key: impl Into<String>) -> Self {
        self.index_key = key.into();
        self
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    /// Processes every episode under `input_dir` into `output_dir` and
    /// publishes a rebuilt index, by default at `output_dir/internal/metadata.db`.
    pub async fn process(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<ProcessSummary, PreprocessError> {
        let fps = self.config.thumb_fps;
        if fps == 0 || 1000 % fps != 0 {
            return Err(PreprocessError::InvalidConfig(format!(
                "thumb_fps must divide 1000, got {}",
                fps
            )));
        }

        info!(
            input_dir = %input_dir.display(),
            output_dir = %output_dir.display(),
            fps,
            "Starting preprocessing run"
        );

        let store = LocalObjectStore::new(output_dir);
        let index_path = store.resolve(&self.index_key)?;
        let mut builder = IndexBuilder::new(&index_path)?;
        let mut summary = ProcessSummary::default();

        for entry in WalkDir::new(input_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some((season, episode)) = parse_episode(path) else {
                warn!(path = %path.display(), "Skipping file without episode tag");
                summary.skipped += 1;
                continue;
            };

            info!(path = %path.display(), season, episode, "Processing episode");
            let keys = EpisodeKeys::new(season, episode);

            let metadata = match self.read_marker(&store, &keys).await? {
                Some(metadata) => {
                    info!(season, episode, "Episode already processed, reusing marker");
                    summary.reused += 1;
                    metadata
                }
                None => {
                    let metadata = self.process_file(path, &store, keys).await?;
                    summary.processed += 1;
                    metadata
                }
            };

            builder.add_episode(&metadata)?;
        }

        let published = builder.build()?;
        info!(
            index = %published.display(),
            processed = summary.processed,
            reused = summary.reused,
            skipped = summary.skipped,
            "Preprocessing run complete"
        );

        Ok(summary)
    }

    /// Loads the completion marker for `keys`, if present.
    async fn read_marker(
        &self,
        store: &LocalObjectStore,
        keys: &EpisodeKeys,
    ) -> Result<Option<EpisodeMetadata>, PreprocessError> {
        let key = keys.marker();
        let path = store.resolve(&key)?;
        let mut file = match store.open(&key).await {
            Ok(file) => file,
            Err(ObjectStoreError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .await
            .map_err(|e| PreprocessError::io(&path, e))?;

        let metadata = serde_json::from_slice(&bytes)
            .map_err(|source| PreprocessError::Marker { key, source })?;
        Ok(Some(metadata))
    }

    /// Transcodes one source file and writes its completion marker.
    async fn process_file(
        &self,
        path: &Path,
        store: &LocalObjectStore,
        keys: EpisodeKeys,
    ) -> Result<EpisodeMetadata, PreprocessError> {
        let streams = self
            .toolchain
            .probe(path)
            .await
            .map_err(|e| PreprocessError::toolchain(path, e))?;
        let selected = self.select_streams(path, &streams)?;

        let internal_dir = store.resolve(&keys.internal_dir())?;
        let public_dir = store.resolve(&keys.public_dir())?;
        for dir in [&internal_dir, &public_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| PreprocessError::io(dir, e))?;
        }
        remove_staging_frames(&public_dir).await?;

        let video_file_key = keys.proxy_video(self.config.proxy_width, self.config.proxy_height);
        let subs_file_key = keys.subtitles();

        let graph = self.build_graph(path, store, &keys, &selected, &video_file_key)?;
        debug!(
            season = keys.season,
            episode = keys.episode,
            filter_complex = %graph.filter_complex().unwrap_or_default(),
            "Running transcode job"
        );
        self.toolchain
            .run(&graph)
            .await
            .map_err(|e| PreprocessError::toolchain(path, e))?;

        let thumbs = self.publish_thumbnails(store, &keys, &public_dir).await?;

        let subs_path = store.resolve(&subs_file_key)?;
        let subs_bytes = fs::read(&subs_path)
            .await
            .map_err(|e| PreprocessError::io(&subs_path, e))?;
        let subtitles = align_cues(&subs_bytes, self.config.thumb_fps)?;

        let metadata = EpisodeMetadata {
            season: keys.season,
            episode: keys.episode,
            thumbs,
            subtitles,
            video_file_key,
            subs_file_key,
        };
        self.write_marker(store, &keys, &metadata).await?;

        info!(
            season = keys.season,
            episode = keys.episode,
            thumbs = metadata.thumbs.len(),
            cues = metadata.subtitles.len(),
            "Episode processed"
        );
        Ok(metadata)
    }

    fn select_streams(
        &self,
        path: &Path,
        streams: &[StreamInfo],
    ) -> Result<SelectedStreams, PreprocessError> {
        let language = &self.config.subtitle_language;

        let subtitle = streams
            .iter()
            .find(|s| s.kind == StreamKind::Subtitle && s.has_language(language))
            .ok_or_else(|| PreprocessError::MissingSubtitleStream {
                path: path.to_path_buf(),
                language: language.clone(),
            })?;

        let video = streams
            .iter()
            .find(|s| s.kind == StreamKind::Video)
            .ok_or_else(|| PreprocessError::MissingVideoStream {
                path: path.to_path_buf(),
            })?;

        Ok(SelectedStreams {
            video: video.index,
            subtitle: subtitle.index,
        })
    }

    /// One decode feeding three sinks: the proxy video, the numbered
    /// thumbnail frames and the demuxed subtitle stream.
    fn build_graph(
        &self,
        path: &Path,
        store: &LocalObjectStore,
        keys: &EpisodeKeys,
        selected: &SelectedStreams,
        video_file_key: &str,
    ) -> Result<FilterGraph, PreprocessError> {
        let config = &self.config;
        let mut graph = FilterGraph::new();
        let source = graph.add_input(GraphInput::new(path));

        let scaled = graph.filter(
            "scale",
            scale_args(config.proxy_width, config.proxy_height),
            Pad::stream(source, selected.video.to_string()),
        );
        let (proxy, thumbs) = graph.fork(scaled);

        let thumbs = graph.filter("fps", config.thumb_fps.to_string(), thumbs);
        let thumbs = graph.filter(
            "scale",
            scale_args(config.thumb_width, config.thumb_height),
            thumbs,
        );

        graph.add_output(
            GraphOutput::new(proxy, store.resolve(video_file_key)?)
                .option("an", "")
                .option("c:v", "libx264")
                .option("crf", config.proxy_crf.to_string())
                .option("preset", config.proxy_preset.clone()),
        );
        graph.add_output(
            GraphOutput::new(thumbs, store.resolve(&keys.thumbnail_staging_pattern())?)
                .option("q:v", "1")
                .option("start_number", "0"),
        );
        graph.add_output(GraphOutput::new(
            Pad::stream(source, selected.subtitle.to_string()),
            store.resolve(&keys.subtitles())?,
        ));

        Ok(graph)
    }

    /// Renames staging frames to timestamp-keyed thumbnails in ordinal order.
    async fn publish_thumbnails(
        &self,
        store: &LocalObjectStore,
        keys: &EpisodeKeys,
        public_dir: &Path,
    ) -> Result<Vec<ThumbRef>, PreprocessError> {
        let fps = self.config.thumb_fps;
        let interval = frame_interval_ms(fps);

        let mut frames = staging_frames(public_dir).await?;
        frames.sort_by_key(|(ordinal, _)| *ordinal);

        let mut thumbs = Vec::with_capacity(frames.len());
        for (ordinal, staging_path) in frames {
            let start_ms = frame_to_ms(ordinal, fps);
            let storage_key = keys.thumbnail(start_ms);
            let target = store.resolve(&storage_key)?;
            fs::rename(&staging_path, &target)
                .await
                .map_err(|e| PreprocessError::io(&staging_path, e))?;
            thumbs.push(ThumbRef {
                storage_key,
                start_ms,
                end_ms: start_ms + interval,
            });
        }

        debug!(
            season = keys.season,
            episode = keys.episode,
            count = thumbs.len(),
            "Published thumbnails"
        );
        Ok(thumbs)
    }

    /// Writes the marker through a temporary sibling so a crash never leaves
    /// a truncated marker behind.
    async fn write_marker(
        &self,
        store: &LocalObjectStore,
        keys: &EpisodeKeys,
        metadata: &EpisodeMetadata,
    ) -> Result<(), PreprocessError> {
        let key = keys.marker();
        let bytes = serde_json::to_vec(metadata)
            .map_err(|source| PreprocessError::Marker {
                key: key.clone(),
                source,
            })?;

        let temp_key = format!("{}.tmp", key);
        store.write(&temp_key, &bytes).await?;

        let temp_path = store.resolve(&temp_key)?;
        let marker_path = store.resolve(&key)?;
        fs::rename(&temp_path, &marker_path)
            .await
            .map_err(|e| PreprocessError::io(&marker_path, e))?;
        Ok(())
    }
}

fn scale_args(width: i32, height: i32) -> String {
    format!("{}:{}", normalize_dimension(width), normalize_dimension(height))
}

/// Ordinal of a staging frame named `_thumb_<ordinal>.jpg`.
fn staging_ordinal(name: &str) -> Option<u64> {
    name.strip_prefix(STAGING_PREFIX)?
        .strip_suffix(STAGING_SUFFIX)?
        .parse()
        .ok()
}

async fn staging_frames(dir: &Path) -> Result<Vec<(u64, PathBuf)>, PreprocessError> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| PreprocessError::io(dir, e))?;

    let mut frames = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PreprocessError::io(dir, e))?
    {
        let name = entry.file_name();
        if let Some(ordinal) = name.to_str().and_then(staging_ordinal) {
            frames.push((ordinal, entry.path()));
        }
    }
    Ok(frames)
}

/// Leftovers from an interrupted run would be mistaken for fresh frames.
async fn remove_staging_frames(dir: &Path) -> Result<(), PreprocessError> {
    for (_, path) in staging_frames(dir).await? {
        warn!(path = %path.display(), "Removing stale thumbnail staging frame");
        fs::remove_file(&path)
            .await
            .map_err(|e| PreprocessError::io(&path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockToolchain;

    #[test]
    fn test_staging_ordinal() {
        assert_eq!(staging_ordinal("_thumb_00000000.jpg"), Some(0));
        assert_eq!(staging_ordinal("_thumb_00000042.jpg"), Some(42));
        assert_eq!(staging_ordinal("thumb_00000042.jpg"), None);
        assert_eq!(staging_ordinal("_thumb_abc.jpg"), None);
        assert_eq!(staging_ordinal("_thumb_00000001.png"), None);
    }

    #[test]
    fn test_scale_args_normalizes_dimensions() {
        assert_eq!(scale_args(640, 0), "640:-1");
        assert_eq!(scale_args(-5, 360), "-1:360");
    }

    #[test]
    fn test_graph_layout() {
        let preprocessor = Preprocessor::new(PreprocessConfig::default(), MockToolchain::new());
        let store = LocalObjectStore::new("/out");
        let keys = EpisodeKeys::new(1, 2);
        let selected = SelectedStreams {
            video: 0,
            subtitle: 3,
        };
        let graph = preprocessor
            .build_graph(
                Path::new("/in/S01E02.mkv"),
                &store,
                &keys,
                &selected,
                &keys.proxy_video(640, -1),
            )
            .unwrap();

        assert!(graph.validate().is_ok());
        assert_eq!(
            graph.filter_complex().unwrap(),
            "[0:0]scale=640:-1[p0];[p0]split=2[p1][p2];[p2]fps=5[p3];[p3]scale=320:-1[p4]"
        );

        let outputs = graph.outputs();
        assert_eq!(outputs.len(), 3);
        assert_eq!(
            outputs[0].path(),
            Path::new("/out/internal/01/02/downscale_640_-1.mkv")
        );
        assert_eq!(outputs[0].option_value("an"), Some(""));
        assert_eq!(outputs[0].option_value("crf"), Some("18"));
        assert_eq!(outputs[0].option_value("preset"), Some("fast"));
        assert_eq!(
            outputs[1].path(),
            Path::new("/out/public/01/02/_thumb_%08d.jpg")
        );
        assert_eq!(outputs[1].option_value("start_number"), Some("0"));
        assert_eq!(outputs[2].source(), &Pad::stream(0, "3"));
        assert_eq!(
            outputs[2].path(),
            Path::new("/out/internal/01/02/subtitles.srt")
        );
    }

    #[test]
    fn test_stream_selection() {
        let preprocessor = Preprocessor::new(PreprocessConfig::default(), MockToolchain::new());
        let path = Path::new("/in/S01E01.mkv");
        let streams = vec![
            StreamInfo::new(0, StreamKind::Audio, Some("eng")),
            StreamInfo::new(1, StreamKind::Video, None),
            StreamInfo::new(2, StreamKind::Subtitle, Some("fre")),
            StreamInfo::new(3, StreamKind::Subtitle, Some("eng")),
            StreamInfo::new(4, StreamKind::Subtitle, Some("eng")),
        ];
        let selected = preprocessor.select_streams(path, &streams).unwrap();
        assert_eq!(selected.video, 1);
        assert_eq!(selected.subtitle, 3);

        let no_subs = vec![StreamInfo::new(0, StreamKind::Video, None)];
        assert!(matches!(
            preprocessor.select_streams(path, &no_subs),
            Err(PreprocessError::MissingSubtitleStream { .. })
        ));

        let no_video = vec![StreamInfo::new(0, StreamKind::Subtitle, Some("eng"))];
        assert!(matches!(
            preprocessor.select_streams(path, &no_video),
            Err(PreprocessError::MissingVideoStream { .. })
        ));
    }

    #[tokio::test]
    async fn test_rejects_fps_not_dividing_1000() {
        let dir = tempfile::TempDir::new().unwrap();
        let preprocessor = Preprocessor::new(
            PreprocessConfig::default().with_thumb_fps(3),
            MockToolchain::new(),
        );
        let result = preprocessor.process(dir.path(), dir.path()).await;
        assert!(matches!(result, Err(PreprocessError::InvalidConfig(_))));
        assert_eq!(preprocessor.toolchain().run_count().await, 0);
    }
}
