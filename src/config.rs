use crate::error::OverlayError;

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// File extensions accepted when picking a subtitle file.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["srt", "vtt", "sub", "ass"];
pub const DEFAULT_FONT_SIZE_PX: u32 = 24;
pub const DEFAULT_FONT_COLOR: &str = "#ffffff";
const MAX_FONT_SIZE_PX: u32 = 200;

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct Appearance {
    pub font_size_px: u32,
    pub font_color: String,
}

impl Appearance {
    /// Returns `None` unless the size is within 1..=200 px and the color is
    /// `#rgb` or `#rrggbb`.
    pub fn new(font_size_px: u32, font_color: &str) -> Option<Self> {
        if font_size_px == 0 || font_size_px > MAX_FONT_SIZE_PX {
            return None;
        }
        if !HEX_COLOR.is_match(font_color) {
            return None;
        }
        Some(Self {
            font_size_px,
            font_color: font_color.to_string(),
        })
    }
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            font_size_px: DEFAULT_FONT_SIZE_PX,
            font_color: DEFAULT_FONT_COLOR.to_string(),
        }
    }
}

pub fn is_supported_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
}

/// State kept between sessions by whoever hosts the overlay: the last loaded
/// subtitles and the last chosen appearance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitles: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
}

impl PersistedState {
    pub fn from_json(data: &str) -> Result<Self, OverlayError> {
        serde_json::from_str(data)
            .map_err(|e| OverlayError::State(format!("Malformed state document: {}", e)))
    }

    pub fn to_json(&self) -> Result<String, OverlayError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| OverlayError::State(format!("Failed to encode state: {}", e)))
    }

    /// A missing file is treated as empty state.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, OverlayError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|e| {
            OverlayError::State(format!("Failed to read state file '{}': {}", path.display(), e))
        })?;
        Self::from_json(&data)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), OverlayError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|e| {
            OverlayError::State(format!("Failed to write state file '{}': {}", path.display(), e))
        })
    }

    /// The stored appearance, falling back to defaults for anything missing
    /// or invalid.
    pub fn appearance(&self) -> Appearance {
        let default = Appearance::default();
        let size = self.font_size.unwrap_or(default.font_size_px);
        let color = self.font_color.as_deref().unwrap_or(&default.font_color);
        Appearance::new(size, color).unwrap_or(default)
    }

    pub fn set_appearance(&mut self, appearance: &Appearance) {
        self.font_size = Some(appearance.font_size_px);
        self.font_color = Some(appearance.font_color.clone());
    }
}
