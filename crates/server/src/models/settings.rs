use scraper::ScraperConfigItem;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Application settings stored in TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Settings {
    /// Scraper order and enable flags
    #[serde(default)]
    pub scrapers: Vec<ScraperConfigItem>,
    /// Automatic download behaviour
    #[serde(default)]
    pub download: DownloadSettings,
    /// ASS subtitle generation
    #[serde(default)]
    pub ass: AssSettings,
    /// Danmu API server
    #[serde(default)]
    pub danmu_api: DanmuApiSettings,
}

/// Automatic download behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DownloadSettings {
    /// Fetch danmu when the catalog reports new or edited items
    #[serde(default = "default_true")]
    pub enable_auto_download: bool,
    /// Only bind a season when the remote episode count equals the local one
    #[serde(default = "default_true")]
    pub enable_episode_count_same: bool,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            enable_auto_download: true,
            enable_episode_count_same: true,
        }
    }
}

/// ASS subtitle generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssSettings {
    /// Also write `<name>.danmu.ass` next to the video
    #[serde(default)]
    pub to_ass: bool,
    /// Font family, empty for the renderer default
    #[serde(default)]
    pub font: String,
    #[serde(default)]
    pub font_size: Option<i32>,
    /// 0.0 (transparent) to 1.0 (opaque)
    #[serde(default)]
    pub text_opacity: Option<f32>,
    /// Number of comment lines on screen
    #[serde(default)]
    pub line_count: Option<i32>,
    /// Seconds a comment stays on screen
    #[serde(default)]
    pub speed: Option<i32>,
    #[serde(default = "default_true")]
    pub remove_emoji: bool,
}

impl Default for AssSettings {
    fn default() -> Self {
        Self {
            to_ass: false,
            font: String::new(),
            font_size: None,
            text_opacity: None,
            line_count: None,
            speed: None,
            remove_emoji: true,
        }
    }
}

/// Danmu API server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DanmuApiSettings {
    /// Base URL including scheme
    #[serde(default)]
    pub server_url: String,
    /// Platforms to take episodes from, in priority order (empty allows all)
    #[serde(default)]
    pub allowed_platforms: Vec<String>,
    /// Collection sources to accept (empty allows all)
    #[serde(default)]
    pub allowed_sources: Vec<String>,
}

impl From<&DanmuApiSettings> for danmu_api::DanmuApiOptions {
    fn from(settings: &DanmuApiSettings) -> Self {
        Self {
            server_url: settings.server_url.clone(),
            allowed_platforms: settings.allowed_platforms.clone(),
            allowed_sources: settings.allowed_sources.clone(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// Merge update data into current settings
    pub fn merge(&self, update: UpdateSettings) -> Self {
        let download = update.download.unwrap_or_default();
        let ass = update.ass.unwrap_or_default();
        let danmu_api = update.danmu_api.unwrap_or_default();

        Self {
            scrapers: update.scrapers.unwrap_or_else(|| self.scrapers.clone()),
            download: DownloadSettings {
                enable_auto_download: download
                    .enable_auto_download
                    .unwrap_or(self.download.enable_auto_download),
                enable_episode_count_same: download
                    .enable_episode_count_same
                    .unwrap_or(self.download.enable_episode_count_same),
            },
            ass: AssSettings {
                to_ass: ass.to_ass.unwrap_or(self.ass.to_ass),
                font: ass.font.unwrap_or_else(|| self.ass.font.clone()),
                font_size: ass.font_size.or(self.ass.font_size),
                text_opacity: ass.text_opacity.or(self.ass.text_opacity),
                line_count: ass.line_count.or(self.ass.line_count),
                speed: ass.speed.or(self.ass.speed),
                remove_emoji: ass.remove_emoji.unwrap_or(self.ass.remove_emoji),
            },
            danmu_api: DanmuApiSettings {
                server_url: danmu_api
                    .server_url
                    .unwrap_or_else(|| self.danmu_api.server_url.clone()),
                allowed_platforms: danmu_api
                    .allowed_platforms
                    .unwrap_or_else(|| self.danmu_api.allowed_platforms.clone()),
                allowed_sources: danmu_api
                    .allowed_sources
                    .unwrap_or_else(|| self.danmu_api.allowed_sources.clone()),
            },
        }
    }
}

/// Request body for updating settings.
/// All fields are optional - only provided fields will be updated.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateSettings {
    /// Scraper list (replaces entire array if provided)
    #[serde(default)]
    pub scrapers: Option<Vec<ScraperConfigItem>>,
    #[serde(default)]
    pub download: Option<UpdateDownloadSettings>,
    #[serde(default)]
    pub ass: Option<UpdateAssSettings>,
    #[serde(default)]
    pub danmu_api: Option<UpdateDanmuApiSettings>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateDownloadSettings {
    #[serde(default)]
    pub enable_auto_download: Option<bool>,
    #[serde(default)]
    pub enable_episode_count_same: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateAssSettings {
    #[serde(default)]
    pub to_ass: Option<bool>,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub font_size: Option<i32>,
    #[serde(default)]
    pub text_opacity: Option<f32>,
    #[serde(default)]
    pub line_count: Option<i32>,
    #[serde(default)]
    pub speed: Option<i32>,
    #[serde(default)]
    pub remove_emoji: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateDanmuApiSettings {
    #[serde(default)]
    pub server_url: Option<String>,
    /// Replaces entire array if provided
    #[serde(default)]
    pub allowed_platforms: Option<Vec<String>>,
    /// Replaces entire array if provided
    #[serde(default)]
    pub allowed_sources: Option<Vec<String>>,
}
