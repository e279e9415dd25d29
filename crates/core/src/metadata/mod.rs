//! Episode metadata and the published index.
//!
//! The index is built by [`IndexBuilder`] in a scratch file next to the
//! publish path and renamed into place by [`IndexBuilder::build`]. That
//! rename is the only point where readers can observe a change: a
//! [`MetadataStore`] opened before it keeps reading the old file, one opened
//! after sees the complete new one.

mod builder;
mod schema;
mod store;
mod types;

pub use builder::{scratch_path_for, IndexBuilder};
pub use store::{MetadataStore, Query, SEARCH_LIMIT};
pub use types::{EpisodeMetadata, MetadataError, SearchResult, SubtitleCue, ThumbRef};
