use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for a manual danmu search
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct DanmuSearchQuery {
    /// Catalog item id
    #[serde(default)]
    pub item_id: Option<String>,
    /// Media file path, used when the id is unknown
    #[serde(default)]
    pub path: Option<String>,
}

/// A search candidate, labelled for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DanmuCandidate {
    pub item_id: String,
    /// Scraper name
    pub scraper: String,
    pub provider_id: String,
    /// Remote id to pass back to a forced download
    pub media_id: String,
    /// e.g. `[TV动画] 葬送的芙莉莲 (2023)【共28集】 - 来源：danmu_api 弹幕`
    pub label: String,
}

/// Request body for a forced download
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DownloadDanmuRequest {
    pub item_id: String,
    pub provider_id: String,
    pub media_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ForceStatus {
    /// Refresh ran (or is still running past the wait bound)
    Accepted,
    /// Same request seen moments ago, nothing re-run
    AlreadyTriggered,
}

/// Acknowledgement returned by a forced download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ForceAck {
    pub status: ForceStatus,
    pub message: String,
}

impl ForceAck {
    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            status: ForceStatus::Accepted,
            message: message.into(),
        }
    }

    pub fn already_triggered(message: impl Into<String>) -> Self {
        Self {
            status: ForceStatus::AlreadyTriggered,
            message: message.into(),
        }
    }
}

/// A registered scraper with its effective enable flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScraperInfo {
    pub name: String,
    pub provider_id: String,
    pub enable: bool,
}
