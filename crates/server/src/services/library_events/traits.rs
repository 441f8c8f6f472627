//! Seams of the reconciliation engine.

use scraper::Danmaku;

use crate::models::{AssSettings, Settings};
use crate::services::SettingsService;

use super::DownloadError;

/// Current settings, read fresh on every batch.
pub trait SettingsProvider: Send + Sync {
    fn settings(&self) -> Settings;
}

impl SettingsProvider for SettingsService {
    fn settings(&self) -> Settings {
        self.get()
    }
}

/// Options handed to a [`DanmuRenderer`]
#[derive(Debug, Clone, PartialEq)]
pub struct AssOptions {
    /// Script title, the item name
    pub title: String,
    pub font: Option<String>,
    pub font_size: Option<i32>,
    pub text_opacity: Option<f32>,
    pub line_count: Option<i32>,
    /// Seconds a scrolling comment stays on screen
    pub speed: Option<i32>,
    pub remove_emoji: bool,
}

impl AssOptions {
    pub fn from_settings(settings: &AssSettings, title: impl Into<String>) -> Self {
        let font = settings.font.trim();
        Self {
            title: title.into(),
            font: (!font.is_empty()).then(|| font.to_string()),
            font_size: settings.font_size,
            text_opacity: settings.text_opacity,
            line_count: settings.line_count,
            speed: settings.speed,
            remove_emoji: settings.remove_emoji,
        }
    }
}

/// Turns a danmaku track into a styled ASS subtitle script.
pub trait DanmuRenderer: Send + Sync {
    fn render(&self, danmaku: &Danmaku, options: &AssOptions) -> Result<String, DownloadError>;
}
