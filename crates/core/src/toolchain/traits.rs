//! Trait definitions for the toolchain module.

use async_trait::async_trait;
use std::path::Path;

use super::error::ToolchainError;
use super::graph::FilterGraph;
use super::types::StreamInfo;

/// An external transcode toolchain.
///
/// Calls block (asynchronously) until the subprocess exits; there is no
/// internal timeout or cancellation.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Returns the name of this toolchain implementation.
    fn name(&self) -> &str;

    /// Lists the streams of a media file.
    async fn probe(&self, path: &Path) -> Result<Vec<StreamInfo>, ToolchainError>;

    /// Runs a graph; every sink is produced from a single decode.
    async fn run(&self, graph: &FilterGraph) -> Result<(), ToolchainError>;

    /// Validates that the toolchain is installed and callable.
    async fn validate(&self) -> Result<(), ToolchainError>;
}
