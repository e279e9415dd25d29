//! Preprocessing pipeline integration tests.
//!
//! These tests drive the pipeline end to end against the mock toolchain:
//! - Artifacts, markers and the published index for a fresh run
//! - Idempotent re-runs that reuse completion markers
//! - Run-fatal failures (missing streams, toolchain errors, bad markers)

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use clyper_core::{
    metadata::{EpisodeMetadata, MetadataStore},
    preprocess::{PreprocessConfig, PreprocessError, Preprocessor},
    testing::{fixtures, MockToolchain},
    toolchain::{StreamInfo, StreamKind, ToolchainError},
    ErrorKind,
};

/// Test helper wiring a preprocessor to the mock toolchain.
struct TestHarness {
    preprocessor: Preprocessor<MockToolchain>,
    toolchain: MockToolchain,
    input: TempDir,
    output: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let toolchain = MockToolchain::new();
        let preprocessor = Preprocessor::new(PreprocessConfig::default(), toolchain.clone());
        Self {
            preprocessor,
            toolchain,
            input: TempDir::new().expect("Failed to create input dir"),
            output: TempDir::new().expect("Failed to create output dir"),
        }
    }

    fn source(&self, name: &str) -> PathBuf {
        self.input.path().join(name)
    }

    fn out(&self, key: &str) -> PathBuf {
        self.output.path().join(key)
    }

    fn index_path(&self) -> PathBuf {
        self.out("internal/metadata.db")
    }

    async fn process(&self) -> Result<clyper_core::ProcessSummary, PreprocessError> {
        self.preprocessor
            .process(self.input.path(), self.output.path())
            .await
    }

    fn marker(&self, season: u32, episode: u32) -> EpisodeMetadata {
        let path = self.out(&format!(
            "internal/{:02}/{:02}/METADATA.1.json",
            season, episode
        ));
        let bytes = std::fs::read(path).expect("marker should exist");
        serde_json::from_slice(&bytes).expect("marker should parse")
    }
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_fresh_run_produces_artifacts_and_index() {
    let harness = TestHarness::new();
    fixtures::touch(
        harness.input.path(),
        &["Show.S01E02.mkv", "Show.S01E01.mkv", "extras/trailer.mkv"],
    );

    let summary = harness.process().await.unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.reused, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(harness.toolchain.run_count().await, 2);

    // Lexical walk order.
    let graphs = harness.toolchain.recorded_graphs().await;
    assert_eq!(graphs[0].inputs()[0].path(), harness.source("Show.S01E01.mkv"));
    assert_eq!(graphs[1].inputs()[0].path(), harness.source("Show.S01E02.mkv"));

    // Staging frames are renamed to timestamp keys on the 200 ms grid.
    assert_eq!(
        file_names(&harness.out("public/01/01")),
        vec![
            "thumb_00000000.jpg",
            "thumb_00000200.jpg",
            "thumb_00000400.jpg",
            "thumb_00000600.jpg",
            "thumb_00000800.jpg",
        ]
    );

    let marker = harness.marker(1, 1);
    assert_eq!(marker.season, 1);
    assert_eq!(marker.episode, 1);
    let starts: Vec<u64> = marker.thumbs.iter().map(|t| t.start_ms).collect();
    assert_eq!(starts, vec![0, 200, 400, 600, 800]);
    assert!(marker.thumbs.iter().all(|t| t.end_ms == t.start_ms + 200));
    assert_eq!(marker.thumbs[2].storage_key, "public/01/01/thumb_00000400.jpg");
    assert_eq!(marker.video_file_key, "internal/01/01/downscale_640_-1.mkv");
    assert_eq!(marker.subs_file_key, "internal/01/01/subtitles.srt");
    assert!(harness.out(&marker.video_file_key).exists());

    // Cues share the thumbnail grid.
    assert_eq!(marker.subtitles.len(), 2);
    assert_eq!(
        (marker.subtitles[0].start_ms, marker.subtitles[0].end_ms),
        (1200, 1600)
    );
    assert_eq!(marker.subtitles[0].text, "Where is the money?\n");
    assert_eq!(
        (marker.subtitles[1].start_ms, marker.subtitles[1].end_ms),
        (2000, 3200)
    );
    assert_eq!(
        marker.subtitles[1].text,
        "It's in the banana stand.\nObviously.\n"
    );

    let store = MetadataStore::open(&harness.index_path()).unwrap();
    assert_eq!(store.episodes().unwrap(), vec![(1, 1), (1, 2)]);
    let page = store.list_thumbnails(1, 2, 400, 2, false).unwrap();
    assert_eq!(
        page.iter().map(|t| t.start_ms).collect::<Vec<_>>(),
        vec![400, 600]
    );
    assert_eq!(store.search("banana stand").unwrap().len(), 2);
    assert_eq!(
        store.video_key(1, 2).unwrap(),
        "internal/01/02/downscale_640_-1.mkv"
    );
}

#[tokio::test]
async fn test_second_run_reuses_markers() {
    let harness = TestHarness::new();
    fixtures::touch(harness.input.path(), &["S01E01.mkv", "S01E02.mkv"]);

    harness.process().await.unwrap();
    let marker_path = harness.out("internal/01/02/METADATA.1.json");
    let first_marker = std::fs::read(&marker_path).unwrap();
    let runs_after_first = harness.toolchain.run_count().await;
    let probes_after_first = harness.toolchain.probe_count().await;

    let summary = harness.process().await.unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.reused, 2);
    assert_eq!(harness.toolchain.run_count().await, runs_after_first);
    assert_eq!(harness.toolchain.probe_count().await, probes_after_first);
    assert_eq!(std::fs::read(&marker_path).unwrap(), first_marker);

    // The index is rebuilt from the markers.
    let store = MetadataStore::open(&harness.index_path()).unwrap();
    assert_eq!(store.episodes().unwrap(), vec![(1, 1), (1, 2)]);
    assert_eq!(store.list_thumbnails(1, 1, 0, 10, false).unwrap().len(), 5);
}

#[tokio::test]
async fn test_episode_tag_in_input_dir_name() {
    let harness = TestHarness::new();
    let episode_dir = harness.source("Show S01E05");
    fixtures::touch(&episode_dir, &["video.mkv"]);

    let summary = harness
        .preprocessor
        .process(&episode_dir, harness.output.path())
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(harness.toolchain.run_count().await, 1);
    assert_eq!(harness.marker(1, 5).episode, 5);
    assert!(harness
        .out("internal/01/05/downscale_640_-1.mkv")
        .exists());
}

#[tokio::test]
async fn test_new_episode_only_transcodes_new_file() {
    let harness = TestHarness::new();
    fixtures::touch(harness.input.path(), &["S01E01.mkv"]);
    harness.process().await.unwrap();

    fixtures::touch(harness.input.path(), &["S01E02.mkv"]);
    let summary = harness.process().await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.reused, 1);
    assert_eq!(harness.toolchain.run_count().await, 2);
}

#[tokio::test]
async fn test_missing_subtitle_stream_aborts_run() {
    let harness = TestHarness::new();
    fixtures::touch(harness.input.path(), &["S01E01.mkv", "S01E02.mkv"]);
    harness
        .toolchain
        .set_streams(
            harness.source("S01E02.mkv"),
            vec![
                StreamInfo::new(0, StreamKind::Video, None),
                StreamInfo::new(1, StreamKind::Subtitle, Some("spa")),
            ],
        )
        .await;

    let err = harness.process().await.unwrap_err();
    assert!(matches!(err, PreprocessError::MissingSubtitleStream { .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);

    // The first episode is resumable, but nothing was published.
    assert!(harness.out("internal/01/01/METADATA.1.json").exists());
    assert!(!harness.index_path().exists());
    assert_eq!(harness.toolchain.run_count().await, 1);
}

#[tokio::test]
async fn test_missing_video_stream_aborts_run() {
    let harness = TestHarness::new();
    fixtures::touch(harness.input.path(), &["S02E01.mkv"]);
    harness
        .toolchain
        .set_default_streams(vec![StreamInfo::new(0, StreamKind::Subtitle, Some("eng"))])
        .await;

    let err = harness.process().await.unwrap_err();
    assert!(matches!(err, PreprocessError::MissingVideoStream { .. }));
    assert_eq!(harness.toolchain.run_count().await, 0);
}

#[tokio::test]
async fn test_toolchain_failure_carries_diagnostics() {
    let harness = TestHarness::new();
    fixtures::touch(harness.input.path(), &["S01E01.mkv"]);
    harness
        .toolchain
        .set_next_error(ToolchainError::graph_failed(
            "exit status: 1",
            Some("moov atom not found".to_string()),
        ))
        .await;

    let err = harness.process().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Toolchain);
    assert_eq!(err.diagnostics(), Some("moov atom not found"));
    assert!(err.to_string().contains("S01E01.mkv"));
    assert!(!harness.out("internal/01/01/METADATA.1.json").exists());
    assert!(!harness.index_path().exists());
}

#[tokio::test]
async fn test_stale_staging_frames_are_discarded() {
    let harness = TestHarness::new();
    fixtures::touch(harness.input.path(), &["S01E01.mkv"]);
    fixtures::touch(harness.output.path(), &["public/01/01/_thumb_00000099.jpg"]);

    harness.process().await.unwrap();

    let names = file_names(&harness.out("public/01/01"));
    assert_eq!(names.len(), 5);
    assert!(names.iter().all(|n| n.starts_with("thumb_")));
    assert_eq!(harness.marker(1, 1).thumbs.len(), 5);
}

#[tokio::test]
async fn test_unreadable_marker_is_persistence_error() {
    let harness = TestHarness::new();
    fixtures::touch(harness.input.path(), &["S01E01.mkv"]);
    let marker = harness.out("internal/01/01/METADATA.1.json");
    std::fs::create_dir_all(marker.parent().unwrap()).unwrap();
    std::fs::write(&marker, b"{\"season\": 1, ").unwrap();

    let err = harness.process().await.unwrap_err();
    assert!(matches!(err, PreprocessError::Marker { .. }));
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(harness.toolchain.run_count().await, 0);
}

#[tokio::test]
async fn test_older_marker_version_is_ignored() {
    let harness = TestHarness::new();
    fixtures::touch(harness.input.path(), &["S01E01.mkv"]);
    fixtures::touch(harness.output.path(), &["internal/01/01/METADATA.0.json"]);

    let summary = harness.process().await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(harness.toolchain.run_count().await, 1);
}

#[tokio::test]
async fn test_duplicate_episode_aborts_before_publish() {
    let harness = TestHarness::new();
    fixtures::touch(
        harness.input.path(),
        &["disc1/Show.S01E01.mkv", "disc2/Show.S01E01.mkv"],
    );

    let err = harness.process().await.unwrap_err();
    assert!(matches!(err, PreprocessError::Metadata(_)));
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert!(!harness.index_path().exists());
    // The second copy reused the first one's marker.
    assert_eq!(harness.toolchain.run_count().await, 1);
}

#[tokio::test]
async fn test_custom_grid_and_language() {
    let toolchain = MockToolchain::new();
    toolchain
        .set_default_streams(vec![
            StreamInfo::new(0, StreamKind::Video, None),
            StreamInfo::new(1, StreamKind::Subtitle, Some("eng")),
            StreamInfo::new(2, StreamKind::Subtitle, Some("ger")),
        ])
        .await;
    toolchain.set_frame_count(3).await;

    let config = PreprocessConfig::default()
        .with_thumb_fps(2)
        .with_subtitle_language("ger");
    let preprocessor = Preprocessor::new(config, toolchain.clone());
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    fixtures::touch(input.path(), &["S03E04.mkv"]);

    preprocessor.process(input.path(), output.path()).await.unwrap();

    let graphs = toolchain.recorded_graphs().await;
    let subtitle_sink = &graphs[0].outputs()[2];
    assert_eq!(
        subtitle_sink.source(),
        &clyper_core::toolchain::Pad::stream(0, "2")
    );

    let bytes = std::fs::read(output.path().join("internal/03/04/METADATA.1.json")).unwrap();
    let marker: EpisodeMetadata = serde_json::from_slice(&bytes).unwrap();
    let starts: Vec<u64> = marker.thumbs.iter().map(|t| t.start_ms).collect();
    assert_eq!(starts, vec![0, 500, 1000]);
    // 1203..1507 on a 500 ms grid.
    assert_eq!(
        (marker.subtitles[0].start_ms, marker.subtitles[0].end_ms),
        (1000, 2000)
    );
}
