//! Emby REST API payloads

use std::collections::BTreeMap;

use domain::{ItemKind, MediaItem};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `BaseItemDto`, reduced to the fields the engine reads
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct EmbyItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "Type")]
    pub item_type: String,
    #[serde(default)]
    pub production_year: Option<i32>,
    #[serde(default)]
    pub index_number: Option<i32>,
    #[serde(default)]
    pub parent_index_number: Option<i32>,
    #[serde(default)]
    pub path: Option<String>,
    /// "FileSystem" or "Virtual"
    #[serde(default)]
    pub location_type: Option<String>,
    #[serde(default)]
    pub season_id: Option<String>,
    #[serde(default)]
    pub series_id: Option<String>,
    #[serde(default)]
    pub series_name: Option<String>,
    #[serde(default)]
    pub provider_ids: BTreeMap<String, String>,
}

impl EmbyItem {
    /// Convert to the engine's model; `None` for item types it ignores.
    pub fn into_media_item(self) -> Option<MediaItem> {
        let kind: ItemKind = self.item_type.parse().ok()?;
        let is_virtual = self
            .location_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("virtual"));

        Some(MediaItem {
            id: self.id,
            kind,
            name: self.name,
            production_year: self.production_year,
            index_number: self.index_number,
            parent_index_number: self.parent_index_number,
            path: self.path,
            is_virtual,
            season_id: self.season_id,
            series_id: self.series_id,
            series_name: self.series_name,
            provider_ids: self.provider_ids,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ItemsResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct VirtualFolder {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub library_options: Option<VirtualFolderOptions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct VirtualFolderOptions {
    #[serde(default)]
    pub disabled_subtitle_fetchers: Vec<String>,
}

/// Notification posted by the Emby webhooks plugin
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct EmbyWebhook {
    /// e.g. `library.new`, `item.update`
    pub event: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub item: Option<EmbyItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_conversion() {
        let item: EmbyItem = serde_json::from_str(
            r#"{
                "Id": "123",
                "Name": "旅立ちの日",
                "Type": "Episode",
                "IndexNumber": 1,
                "ParentIndexNumber": 1,
                "Path": "/media/Frieren/S01E01.mkv",
                "LocationType": "FileSystem",
                "SeasonId": "120",
                "SeriesId": "100",
                "SeriesName": "葬送のフリーレン",
                "ProviderIds": {"Tmdb": "209867"}
            }"#,
        )
        .unwrap();

        let media = item.into_media_item().unwrap();

        assert_eq!(media.kind, ItemKind::Episode);
        assert_eq!(media.season_id.as_deref(), Some("120"));
        assert_eq!(media.provider_id("Tmdb"), Some("209867"));
        assert!(!media.is_virtual);
    }

    #[test]
    fn test_virtual_and_unsupported_items() {
        let virtual_season = EmbyItem {
            id: "1".to_string(),
            item_type: "Season".to_string(),
            location_type: Some("Virtual".to_string()),
            ..Default::default()
        };
        assert!(virtual_season.into_media_item().unwrap().is_virtual);

        let box_set = EmbyItem {
            id: "2".to_string(),
            item_type: "BoxSet".to_string(),
            ..Default::default()
        };
        assert!(box_set.into_media_item().is_none());
    }
}
