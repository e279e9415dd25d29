//! External transcode toolchain.
//!
//! This module provides the `Toolchain` trait and an FFmpeg-backed
//! implementation. Work is described as a declarative [`FilterGraph`] value
//! (inputs, filter nodes, named sinks) and handed to a single `run` call, so
//! one decode pass can feed several outputs.
//!
//! # Example
//!
//! ```ignore
//! use clyper_core::toolchain::{FfmpegToolchain, FilterGraph, GraphInput, GraphOutput, Pad, Toolchain};
//!
//! let toolchain = FfmpegToolchain::with_defaults();
//! toolchain.validate().await?;
//!
//! let streams = toolchain.probe(Path::new("/media/S01E01.mkv")).await?;
//!
//! let mut graph = FilterGraph::new();
//! let source = graph.add_input(GraphInput::new("/media/S01E01.mkv"));
//! let scaled = graph.filter("scale", "640:-1", Pad::stream(source, "v:0"));
//! graph.add_output(GraphOutput::new(scaled, "/out/proxy.mkv").option("an", ""));
//!
//! toolchain.run(&graph).await?;
//! ```

mod config;
mod error;
mod ffmpeg;
mod graph;
mod traits;
mod types;

pub use config::ToolchainConfig;
pub use error::ToolchainError;
pub use ffmpeg::FfmpegToolchain;
pub use graph::{escape_filter_value, FilterGraph, FilterNode, GraphInput, GraphOutput, Pad};
pub use traits::Toolchain;
pub use types::{StreamInfo, StreamKind};
