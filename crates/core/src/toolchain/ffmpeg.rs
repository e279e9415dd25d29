//! FFmpeg-based toolchain implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, warn};

use super::config::ToolchainConfig;
use super::error::ToolchainError;
use super::graph::FilterGraph;
use super::traits::Toolchain;
use super::types::{StreamInfo, StreamKind};

/// FFmpeg-based toolchain implementation.
pub struct FfmpegToolchain {
    config: ToolchainConfig,
}

impl FfmpegToolchain {
    /// Creates a new FFmpeg toolchain with the given configuration.
    pub fn new(config: ToolchainConfig) -> Self {
        Self { config }
    }

    /// Creates a toolchain with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ToolchainConfig::default())
    }

    /// Builds the full ffmpeg argument list for a graph.
    fn build_args(&self, graph: &FilterGraph) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(), // Overwrite output
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ];
        args.extend(self.config.extra_ffmpeg_args.iter().cloned());
        args.extend(graph.to_args());
        args
    }

    /// Parses ffprobe JSON output into stream descriptions.
    fn parse_probe_output(output: &str) -> Result<Vec<StreamInfo>, ToolchainError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            index: u32,
            codec_type: Option<String>,
            #[serde(default)]
            tags: Option<ProbeTags>,
        }

        #[derive(Deserialize)]
        struct ProbeTags {
            language: Option<String>,
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).map_err(|e| ToolchainError::ParseError {
                reason: format!("Failed to parse ffprobe output: {}", e),
            })?;

        Ok(probe
            .streams
            .into_iter()
            .map(|s| StreamInfo {
                index: s.index,
                kind: s
                    .codec_type
                    .as_deref()
                    .map(StreamKind::from_codec_type)
                    .unwrap_or(StreamKind::Other),
                language: s.tags.and_then(|t| t.language),
            })
            .collect())
    }

    fn spawn_error(&self, e: std::io::Error, probe: bool) -> ToolchainError {
        if e.kind() != std::io::ErrorKind::NotFound {
            return ToolchainError::Io(e);
        }
        if probe {
            ToolchainError::FfprobeNotFound {
                path: self.config.ffprobe_path.clone(),
            }
        } else {
            ToolchainError::FfmpegNotFound {
                path: self.config.ffmpeg_path.clone(),
            }
        }
    }
}

#[async_trait]
impl Toolchain for FfmpegToolchain {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<Vec<StreamInfo>, ToolchainError> {
        if !path.exists() {
            return Err(ToolchainError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e, true))?;

        if !output.status.success() {
            return Err(ToolchainError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_output(&stdout)
    }

    async fn run(&self, graph: &FilterGraph) -> Result<(), ToolchainError> {
        graph.validate()?;

        for input in graph.inputs() {
            if !input.path().exists() {
                return Err(ToolchainError::InputNotFound {
                    path: input.path().to_path_buf(),
                });
            }
        }

        let args = self.build_args(graph);
        debug!(args = ?args, "running ffmpeg");
        let start = Instant::now();

        let output = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e, false))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(code = ?output.status.code(), "ffmpeg exited with failure");
            return Err(ToolchainError::graph_failed(
                format!("FFmpeg exited with code: {:?}", output.status.code()),
                if stderr.is_empty() { None } else { Some(stderr) },
            ));
        }

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            outputs = graph.outputs().len(),
            "ffmpeg finished"
        );
        Ok(())
    }

    async fn validate(&self) -> Result<(), ToolchainError> {
        Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e, false))?;

        Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e, true))?;

        Ok(())
    }
}
