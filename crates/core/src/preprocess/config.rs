//! Configuration for the preprocessing pipeline.

use serde::{Deserialize, Serialize};

/// Settings for one preprocessing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Proxy video width; `<= 0` keeps the aspect ratio.
    #[serde(default = "default_proxy_width")]
    pub proxy_width: i32,

    /// Proxy video height; `<= 0` keeps the aspect ratio.
    #[serde(default = "default_keep_aspect")]
    pub proxy_height: i32,

    #[serde(default = "default_thumb_width")]
    pub thumb_width: i32,

    #[serde(default = "default_keep_aspect")]
    pub thumb_height: i32,

    /// Thumbnail rate, shared by the cue grid. Must divide 1000.
    #[serde(default = "default_thumb_fps")]
    pub thumb_fps: u32,

    /// Language tag of the subtitle stream to extract.
    #[serde(default = "default_subtitle_language")]
    pub subtitle_language: String,

    /// x264 constant rate factor for the proxy.
    #[serde(default = "default_proxy_crf")]
    pub proxy_crf: u32,

    /// x264 preset for the proxy.
    #[serde(default = "default_proxy_preset")]
    pub proxy_preset: String,
}

fn default_proxy_width() -> i32 {
    640
}

fn default_thumb_width() -> i32 {
    320
}

fn default_keep_aspect() -> i32 {
    -1
}

fn default_thumb_fps() -> u32 {
    5
}

fn default_subtitle_language() -> String {
    "eng".to_string()
}

fn default_proxy_crf() -> u32 {
    18
}

fn default_proxy_preset() -> String {
    "fast".to_string()
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            proxy_width: default_proxy_width(),
            proxy_height: default_keep_aspect(),
            thumb_width: default_thumb_width(),
            thumb_height: default_keep_aspect(),
            thumb_fps: default_thumb_fps(),
            subtitle_language: default_subtitle_language(),
            proxy_crf: default_proxy_crf(),
            proxy_preset: default_proxy_preset(),
        }
    }
}

impl PreprocessConfig {
    pub fn with_thumb_fps(mut self, fps: u32) -> Self {
        self.thumb_fps = fps;
        self
    }

    pub fn with_subtitle_language(mut self, language: impl Into<String>) -> Self {
        self.subtitle_language = language.into();
        self
    }
}
