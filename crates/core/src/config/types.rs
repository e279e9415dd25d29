use serde::{Deserialize, Serialize};

use crate::clip::ClipConfig;
use crate::objstore::INDEX_KEY;
use crate::preprocess::PreprocessConfig;
use crate::toolchain::ToolchainConfig;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub clip: ClipConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

/// Published index location
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Object key of the published index, relative to the output root.
    #[serde(default = "default_index_key")]
    pub key: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            key: default_index_key(),
        }
    }
}

fn default_index_key() -> String {
    INDEX_KEY.to_string()
}
