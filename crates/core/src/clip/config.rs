//! Configuration for the clip renderer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{DEFAULT_MAX_BYTES, REDUCED_FPS};

/// Clip rendering settings shared by every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipConfig {
    #[serde(default)]
    pub font_name: Option<String>,

    /// Caption colour as an ASS `BBGGRR` hex string.
    #[serde(default)]
    pub font_color: Option<String>,

    #[serde(default)]
    pub fonts_dir: Option<PathBuf>,

    /// Byte budget for the native rendition.
    #[serde(default = "default_desired_max_bytes")]
    pub desired_max_bytes: u64,

    #[serde(default = "default_reduced_fps")]
    pub reduced_fps: u32,

    /// Parent directory for per-request scratch directories. Defaults to the
    /// system temp dir.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

fn default_desired_max_bytes() -> u64 {
    DEFAULT_MAX_BYTES
}

fn default_reduced_fps() -> u32 {
    REDUCED_FPS
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            font_name: None,
            font_color: None,
            fonts_dir: None,
            desired_max_bytes: default_desired_max_bytes(),
            reduced_fps: default_reduced_fps(),
            scratch_dir: None,
        }
    }
}

impl ClipConfig {
    /// Request options for `caption_text` using the configured styling.
    pub fn gif_options(&self, caption_text: impl Into<String>) -> GifOptions {
        GifOptions {
            caption_text: caption_text.into(),
            font_name: self.font_name.clone(),
            font_color: self.font_color.clone(),
            fonts_dir: self.fonts_dir.clone(),
            desired_max_bytes: self.desired_max_bytes,
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifOptions {
    /// Burned in upper-cased.
    pub caption_text: String,
    pub font_name: Option<String>,
    pub font_color: Option<String>,
    pub fonts_dir: Option<PathBuf>,
    /// Zero selects [`DEFAULT_MAX_BYTES`].
    pub desired_max_bytes: u64,
}

impl Default for GifOptions {
    fn default() -> Self {
        Self {
            caption_text: String::new(),
            font_name: None,
            font_color: None,
            fonts_dir: None,
            desired_max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl GifOptions {
    pub fn with_caption(caption_text: impl Into<String>) -> Self {
        Self {
            caption_text: caption_text.into(),
            ..Default::default()
        }
    }

    pub fn budget(&self) -> u64 {
        if self.desired_max_bytes > 0 {
            self.desired_max_bytes
        } else {
            DEFAULT_MAX_BYTES
        }
    }

    /// ASS style overrides for the caption.
    pub fn force_style(&self) -> String {
        let mut style = vec![
            "FontSize=24".to_string(),
            "Alignment=2".to_string(),
            "MarginL=10".to_string(),
            "MarginR=10".to_string(),
            "MarginV=20".to_string(),
        ];
        if let Some(name) = self.font_name.as_deref().filter(|n| !n.is_empty()) {
            style.push(format!("Fontname={}", name));
        }
        if let Some(color) = self.font_color.as_deref().filter(|c| !c.is_empty()) {
            style.push(format!("PrimaryColour=&H{}", color));
        }
        style.join(",")
    }
}
