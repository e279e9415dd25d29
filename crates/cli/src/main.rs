use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clyper_core::{
    load_config, load_env_config, validate_config, ClipRenderer, Config, FfmpegToolchain,
    GifOptions, LocalObjectStore, MetadataStore, ObjectStore, Preprocessor, Toolchain,
};

/// Episode preprocessing and caption-burned GIF clips
#[derive(Parser, Debug)]
#[command(name = "clyper", version, about)]
struct Cli {
    /// Configuration file (TOML). Defaults plus CLYPER_* variables when omitted.
    #[arg(short, long, global = true, env = "CLYPER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transcode every S<season>E<episode> file and publish a fresh index
    Preprocess {
        /// Directory scanned recursively for episode files
        input_dir: PathBuf,
        /// Output root holding `internal/` and `public/`
        output_dir: PathBuf,
    },

    /// Render a GIF from a video file
    Gif {
        input_file: PathBuf,
        output_file: PathBuf,
        #[command(flatten)]
        clip: ClipArgs,
    },

    /// Render a GIF from an indexed episode's proxy video
    Clip {
        /// Output root of a preprocessing run
        root: PathBuf,
        #[command(flatten)]
        episode: EpisodeArgs,
        output_file: PathBuf,
        #[command(flatten)]
        clip: ClipArgs,
    },

    /// Full-text search over subtitle cues
    Search {
        root: PathBuf,
        /// Words to match
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// List thumbnails around a timestamp
    Thumbs {
        root: PathBuf,
        #[command(flatten)]
        episode: EpisodeArgs,
        /// Seek point in milliseconds
        #[arg(long, default_value = "0")]
        at: u64,
        #[arg(long, default_value = "10")]
        limit: usize,
        /// List backwards from the seek point
        #[arg(long)]
        reverse: bool,
    },

    /// Print the proxy video key of an episode
    VideoKey {
        root: PathBuf,
        #[command(flatten)]
        episode: EpisodeArgs,
    },
}

#[derive(Args, Debug)]
struct EpisodeArgs {
    #[arg(long)]
    season: u32,
    #[arg(long)]
    episode: u32,
}

#[derive(Args, Debug)]
struct ClipArgs {
    /// Start time in milliseconds
    #[arg(long)]
    start: u64,
    /// End time in milliseconds
    #[arg(long)]
    end: u64,
    /// Caption burned into the clip
    #[arg(long, default_value = "")]
    text: String,
    /// Overrides clip.font_name
    #[arg(long)]
    font_name: Option<String>,
    /// Overrides clip.font_color (ASS BBGGRR hex)
    #[arg(long)]
    font_color: Option<String>,
    /// Overrides clip.fonts_dir
    #[arg(long)]
    fonts_dir: Option<PathBuf>,
    /// Overrides clip.desired_max_bytes, in MiB
    #[arg(long)]
    desired_max_size: Option<f32>,
}

impl ClipArgs {
    fn options(&self, config: &Config) -> GifOptions {
        let mut options = config.clip.gif_options(self.text.clone());
        if let Some(name) = &self.font_name {
            options.font_name = Some(name.clone());
        }
        if let Some(color) = &self.font_color {
            options.font_color = Some(color.clone());
        }
        if let Some(dir) = &self.fonts_dir {
            options.fonts_dir = Some(dir.clone());
        }
        if let Some(mib) = self.desired_max_size {
            options.desired_max_bytes = (f64::from(mib) * 1024.0 * 1024.0) as u64;
        }
        options
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => load_env_config().context("Failed to load configuration from environment")?,
    };
    validate_config(&config).context("Configuration validation failed")?;

    match cli.command {
        Command::Preprocess {
            input_dir,
            output_dir,
        } => preprocess(&config, &input_dir, &output_dir).await,
        Command::Gif {
            input_file,
            output_file,
            clip,
        } => {
            let renderer = renderer(&config).await?;
            let rendition = renderer
                .make_gif(
                    &input_file,
                    &output_file,
                    clip.start,
                    clip.end,
                    &clip.options(&config),
                )
                .await
                .context("Failed to render clip")?;
            info!(?rendition, output = %output_file.display(), "Wrote clip");
            Ok(())
        }
        Command::Clip {
            root,
            episode,
            output_file,
            clip,
        } => {
            let renderer = renderer(&config).await?;
            let objects = LocalObjectStore::new(&root);
            let index = open_index(&config, &objects)?;
            let rendition = renderer
                .render_episode_clip(
                    &index,
                    &objects,
                    episode.season,
                    episode.episode,
                    clip.start,
                    clip.end,
                    &output_file,
                    &clip.options(&config),
                )
                .await
                .context("Failed to render clip")?;
            info!(?rendition, output = %output_file.display(), "Wrote clip");
            Ok(())
        }
        Command::Search { root, query } => {
            let index = open_index(&config, &LocalObjectStore::new(&root))?;
            let results = index.search(&query.join(" "))?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Command::Thumbs {
            root,
            episode,
            at,
            limit,
            reverse,
        } => {
            let index = open_index(&config, &LocalObjectStore::new(&root))?;
            let thumbs =
                index.list_thumbnails(episode.season, episode.episode, at, limit, reverse)?;
            println!("{}", serde_json::to_string_pretty(&thumbs)?);
            Ok(())
        }
        Command::VideoKey { root, episode } => {
            let index = open_index(&config, &LocalObjectStore::new(&root))?;
            println!("{}", index.video_key(episode.season, episode.episode)?);
            Ok(())
        }
    }
}

async fn preprocess(config: &Config, input_dir: &Path, output_dir: &Path) -> Result<()> {
    let toolchain = FfmpegToolchain::new(config.toolchain.clone());
    toolchain
        .validate()
        .await
        .context("Transcode toolchain is not usable")?;

    let preprocessor = Preprocessor::new(config.preprocess.clone(), toolchain)
        .with_index_key(config.index.key.clone());

    match preprocessor.process(input_dir, output_dir).await {
        Ok(summary) => {
            info!(
                processed = summary.processed,
                reused = summary.reused,
                skipped = summary.skipped,
                "Done"
            );
            Ok(())
        }
        Err(e) => {
            if let Some(diagnostics) = e.diagnostics() {
                error!("Toolchain output:\n{}", diagnostics);
            }
            Err(anyhow::Error::new(e).context("Preprocessing failed"))
        }
    }
}

async fn renderer(config: &Config) -> Result<ClipRenderer<FfmpegToolchain>> {
    let toolchain = FfmpegToolchain::new(config.toolchain.clone());
    toolchain
        .validate()
        .await
        .context("Transcode toolchain is not usable")?;
    Ok(ClipRenderer::from_config(&config.clip, toolchain))
}

fn open_index(config: &Config, objects: &LocalObjectStore) -> Result<MetadataStore> {
    let path = objects.resolve(&config.index.key)?;
    MetadataStore::open(&path).with_context(|| format!("Failed to open index {:?}", path))
}
