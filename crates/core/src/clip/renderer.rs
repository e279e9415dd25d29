//! Clip renderer implementation.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, info};

use crate::metadata::MetadataStore;
use crate::objstore::{ObjectStore, ObjectStoreError};
use crate::subtitle::single_cue_srt;
use crate::toolchain::{escape_filter_value, FilterGraph, GraphInput, GraphOutput, Pad, Toolchain};

use super::config::{ClipConfig, GifOptions};
use super::rendition::{select_rendition, validate_range, Rendition};
use super::{ClipError, REDUCED_FPS};

const CAPTION_FILE: &str = "caption.srt";
const NATIVE_FILE: &str = "native.gif";
const REDUCED_FILE: &str = "reduced.gif";
const PALETTE_COLORS: &str = "max_colors=64";

/// Renders caption-burned GIF clips.
///
/// Every request gets its own scratch directory, removed when the request
/// finishes whatever the outcome, so concurrent renders never interfere.
pub struct ClipRenderer<T: Toolchain> {
    toolchain: T,
    reduced_fps: u32,
    scratch_root: Option<PathBuf>,
}

impl<T: Toolchain> ClipRenderer<T> {
    pub fn new(toolchain: T) -> Self {
        Self {
            toolchain,
            reduced_fps: REDUCED_FPS,
            scratch_root: None,
        }
    }

    pub fn from_config(config: &ClipConfig, toolchain: T) -> Self {
        Self {
            toolchain,
            reduced_fps: config.reduced_fps,
            scratch_root: config.scratch_dir.clone(),
        }
    }

    /// Roots scratch directories under `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    /// Renders `[start_ms, end_ms)` of `video_path` to `output_path`.
    pub async fn make_gif(
        &self,
        video_path: &Path,
        output_path: &Path,
        start_ms: u64,
        end_ms: u64,
        options: &GifOptions,
    ) -> Result<Rendition, ClipError> {
        let duration_ms = validate_range(start_ms, end_ms)?;
        let scratch = self.scratch_dir()?;

        let caption_path = scratch.path().join(CAPTION_FILE);
        fs::write(&caption_path, caption_document(duration_ms, options))
            .await
            .map_err(|e| ClipError::io(&caption_path, e))?;

        let native_path = scratch.path().join(NATIVE_FILE);
        let reduced_path = scratch.path().join(REDUCED_FILE);
        let graph = self.build_graph(
            video_path,
            start_ms,
            end_ms,
            &caption_path,
            options,
            &native_path,
            &reduced_path,
        );

        debug!(
            video = %video_path.display(),
            start_ms,
            end_ms,
            scratch = %scratch.path().display(),
            "Rendering clip"
        );
        self.toolchain.run(&graph).await?;

        let native_bytes = fs::metadata(&native_path)
            .await
            .map_err(|e| ClipError::io(&native_path, e))?
            .len();
        let budget = options.budget();
        let rendition = select_rendition(native_bytes, budget);
        let selected = match rendition {
            Rendition::Native => &native_path,
            Rendition::Reduced => &reduced_path,
        };

        move_file(selected, output_path).await?;
        info!(
            output = %output_path.display(),
            ?rendition,
            native_bytes,
            budget,
            "Clip rendered"
        );

        Ok(rendition)
    }

    /// Renders a clip of an indexed episode's proxy video.
    #[allow(clippy::too_many_arguments)]
    pub async fn render_episode_clip<S: ObjectStore>(
        &self,
        index: &MetadataStore,
        objects: &S,
        season: u32,
        episode: u32,
        start_ms: u64,
        end_ms: u64,
        output_path: &Path,
        options: &GifOptions,
    ) -> Result<Rendition, ClipError> {
        validate_range(start_ms, end_ms)?;
        let key = index.video_key(season, episode)?;
        if !objects.exists(&key).await? {
            return Err(ObjectStoreError::NotFound(key).into());
        }
        let video_path = objects.resolve(&key)?;
        self.make_gif(&video_path, output_path, start_ms, end_ms, options)
            .await
    }

    fn scratch_dir(&self) -> Result<TempDir, ClipError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("clyper-");
        match &self.scratch_root {
            Some(root) => builder.tempdir_in(root).map_err(|e| ClipError::io(root, e)),
            None => builder
                .tempdir()
                .map_err(|e| ClipError::io(std::env::temp_dir(), e)),
        }
    }

    /// Trim, burn in the caption, then fan out into the native and reduced
    /// encodes, each with its own palette.
    #[allow(clippy::too_many_arguments)]
    fn build_graph(
        &self,
        video_path: &Path,
        start_ms: u64,
        end_ms: u64,
        caption_path: &Path,
        options: &GifOptions,
        native_path: &Path,
        reduced_path: &Path,
    ) -> FilterGraph {
        let mut graph = FilterGraph::new();
        let source = graph.add_input(
            GraphInput::new(video_path)
                .option("ss", format!("{}ms", start_ms))
                .option("to", format!("{}ms", end_ms)),
        );

        let captioned = graph.filter(
            "subtitles",
            subtitles_args(caption_path, options),
            Pad::stream(source, "v:0"),
        );
        let (native, reduced) = graph.fork(captioned);

        let native = with_palette(&mut graph, native);
        let reduced = graph.filter("fps", self.reduced_fps.to_string(), reduced);
        let reduced = with_palette(&mut graph, reduced);

        graph.add_output(GraphOutput::new(native, native_path));
        graph.add_output(GraphOutput::new(reduced, reduced_path));
        graph
    }
}

/// Generates a palette from `frames` and applies it to them.
fn with_palette(graph: &mut FilterGraph, frames: Pad) -> Pad {
    let (frames, sample) = graph.fork(frames);
    let palette = graph.filter("palettegen", PALETTE_COLORS, sample);
    graph.combine("paletteuse", "", vec![frames, palette])
}

/// The single cue burned into a clip: the whole window, upper-cased.
fn caption_document(duration_ms: u64, options: &GifOptions) -> String {
    single_cue_srt(duration_ms, &options.caption_text.to_uppercase())
}

fn subtitles_args(caption_path: &Path, options: &GifOptions) -> String {
    let mut args = format!(
        "filename={}:force_style={}",
        escape_filter_value(&caption_path.to_string_lossy()),
        escape_filter_value(&options.force_style())
    );
    if let Some(fonts_dir) = &options.fonts_dir {
        args.push_str(":fontsdir=");
        args.push_str(&escape_filter_value(&fonts_dir.to_string_lossy()));
    }
    args
}

/// Renames `source` over `destination`, copying when they sit on different
/// filesystems.
async fn move_file(source: &Path, destination: &Path) -> Result<(), ClipError> {
    match fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        Err(e)
            if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) =>
        {
            debug!(
                source = %source.display(),
                destination = %destination.display(),
                "Cross-device move, falling back to copy"
            );
            fs::copy(source, destination)
                .await
                .map_err(|e| ClipError::io(destination, e))?;
            Ok(())
        }
        Err(e) => Err(ClipError::io(destination, e)),
    }
}
