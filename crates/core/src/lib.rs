pub mod clip;
pub mod config;
pub mod error;
pub mod grid;
pub mod metadata;
pub mod objstore;
pub mod preprocess;
pub mod subtitle;
pub mod testing;
pub mod toolchain;

pub use clip::{ClipConfig, ClipError, ClipRenderer, GifOptions, Rendition};
pub use config::{
    load_config, load_config_from_str, load_env_config, validate_config, Config, ConfigError,
    IndexConfig,
};
pub use error::ErrorKind;
pub use metadata::{
    EpisodeMetadata, IndexBuilder, MetadataError, MetadataStore, SearchResult, SubtitleCue,
    ThumbRef,
};
pub use objstore::{EpisodeKeys, LocalObjectStore, ObjectStore, ObjectStoreError};
pub use preprocess::{PreprocessConfig, PreprocessError, Preprocessor, ProcessSummary};
pub use toolchain::{FfmpegToolchain, FilterGraph, Toolchain, ToolchainConfig, ToolchainError};
