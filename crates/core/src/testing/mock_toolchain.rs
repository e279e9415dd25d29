//! Mock toolchain for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

use crate::toolchain::{FilterGraph, GraphOutput, StreamInfo, StreamKind, Toolchain, ToolchainError};

/// Cue file written for every `.srt` sink unless overridden.
pub const DEFAULT_SRT: &str = "1\n\
00:00:01,203 --> 00:00:01,507\n\
Where is the money?\n\
\n\
2\n\
00:00:02,000 --> 00:00:03,100\n\
It's in the banana stand.\n\
Obviously.\n";

const FRAME_PATTERN: &str = "%08d";
const DEFAULT_FRAME_COUNT: u64 = 5;
const DEFAULT_OUTPUT_SIZE: u64 = 16;

/// Mock implementation of the Toolchain trait.
///
/// Instead of transcoding, `run` materializes every sink of the graph:
/// - numbered image patterns (`%08d`) become a fixed number of frames,
///   numbered from the sink's `start_number` option (ffmpeg defaults to 1)
/// - `.srt` sinks receive the configured cue file
/// - any other sink is filled with zero bytes, sized per file name
///
/// Clones share state, so a test can keep a handle after moving the mock
/// into the component under test.
///
/// # Example
///
/// ```rust,ignore
/// use clyper_core::testing::MockToolchain;
///
/// let toolchain = MockToolchain::new();
/// toolchain.set_output_size("native.gif", 3 * 1024 * 1024).await;
///
/// let renderer = ClipRenderer::new(toolchain.clone());
/// renderer.make_gif(video, output, 0, 4000, &options).await?;
///
/// assert_eq!(toolchain.run_count().await, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockToolchain {
    /// Graphs passed to `run`, in order.
    graphs: Arc<RwLock<Vec<FilterGraph>>>,
    /// Paths passed to `probe`, in order.
    probes: Arc<RwLock<Vec<PathBuf>>>,
    /// Probe results by path.
    streams: Arc<RwLock<HashMap<PathBuf, Vec<StreamInfo>>>>,
    /// Probe result for paths without an explicit entry.
    default_streams: Arc<RwLock<Vec<StreamInfo>>>,
    /// Content of `.srt` sinks.
    srt_payload: Arc<RwLock<String>>,
    /// Frames written per numbered pattern.
    frame_count: Arc<RwLock<u64>>,
    /// Byte size of plain sinks by file name.
    output_sizes: Arc<RwLock<HashMap<String, u64>>>,
    /// If set, the next operation fails with this error.
    next_error: Arc<RwLock<Option<ToolchainError>>>,
}

impl Default for MockToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockToolchain {
    /// Create a mock probing as video, English audio and English subtitles.
    pub fn new() -> Self {
        Self {
            graphs: Arc::new(RwLock::new(Vec::new())),
            probes: Arc::new(RwLock::new(Vec::new())),
            streams: Arc::new(RwLock::new(HashMap::new())),
            default_streams: Arc::new(RwLock::new(vec![
                StreamInfo::new(0, StreamKind::Video, None),
                StreamInfo::new(1, StreamKind::Audio, Some("eng")),
                StreamInfo::new(2, StreamKind::Subtitle, Some("eng")),
            ])),
            srt_payload: Arc::new(RwLock::new(DEFAULT_SRT.to_string())),
            frame_count: Arc::new(RwLock::new(DEFAULT_FRAME_COUNT)),
            output_sizes: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Get all graphs that were run.
    pub async fn recorded_graphs(&self) -> Vec<FilterGraph> {
        self.graphs.read().await.clone()
    }

    /// Get the number of graphs run.
    pub async fn run_count(&self) -> usize {
        self.graphs.read().await.len()
    }

    /// Get the number of probes performed.
    pub async fn probe_count(&self) -> usize {
        self.probes.read().await.len()
    }

    /// Set the probe result for a specific path.
    pub async fn set_streams(&self, path: impl AsRef<Path>, streams: Vec<StreamInfo>) {
        self.streams
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), streams);
    }

    /// Set the probe result for paths without an explicit entry.
    pub async fn set_default_streams(&self, streams: Vec<StreamInfo>) {
        *self.default_streams.write().await = streams;
    }

    /// Set the content written to `.srt` sinks.
    pub async fn set_srt_payload(&self, payload: impl Into<String>) {
        *self.srt_payload.write().await = payload.into();
    }

    /// Set how many frames each numbered pattern produces.
    pub async fn set_frame_count(&self, count: u64) {
        *self.frame_count.write().await = count;
    }

    /// Set the byte size of sinks named `file_name`.
    pub async fn set_output_size(&self, file_name: impl Into<String>, bytes: u64) {
        self.output_sizes.write().await.insert(file_name.into(), bytes);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ToolchainError) {
        *self.next_error.write().await = Some(error);
    }

    /// Clear any pending error.
    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
    }

    async fn take_error(&self) -> Result<(), ToolchainError> {
        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn materialize(&self, output: &GraphOutput) -> Result<(), ToolchainError> {
        let path = output.path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let path_str = path.to_string_lossy();
        if path_str.contains(FRAME_PATTERN) {
            let start = output
                .option_value("start_number")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(1);
            let count = *self.frame_count.read().await;
            for ordinal in start..start + count {
                let frame = path_str.replace(FRAME_PATTERN, &format!("{:08}", ordinal));
                fs::write(frame, b"\xff\xd8\xff\xd9").await?;
            }
            return Ok(());
        }

        if path.extension().is_some_and(|ext| ext == "srt") {
            let payload = self.srt_payload.read().await.clone();
            fs::write(path, payload).await?;
            return Ok(());
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let size = self
            .output_sizes
            .read()
            .await
            .get(&file_name)
            .copied()
            .unwrap_or(DEFAULT_OUTPUT_SIZE);
        fs::write(path, vec![0u8; size as usize]).await?;
        Ok(())
    }
}

#[async_trait]
impl Toolchain for MockToolchain {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<Vec<StreamInfo>, ToolchainError> {
        self.take_error().await?;
        self.probes.write().await.push(path.to_path_buf());

        if let Some(streams) = self.streams.read().await.get(path) {
            return Ok(streams.clone());
        }
        Ok(self.default_streams.read().await.clone())
    }

    async fn run(&self, graph: &FilterGraph) -> Result<(), ToolchainError> {
        self.take_error().await?;
        graph.validate()?;
        self.graphs.write().await.push(graph.clone());

        for output in graph.outputs() {
            self.materialize(output).await?;
        }
        Ok(())
    }

    async fn validate(&self) -> Result<(), ToolchainError> {
        self.take_error().await
    }
}
