//! Catalog item value objects.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider ids bound to an item, keyed by scraper provider id.
pub type ProviderIds = BTreeMap<String, String>;

/// Kind of catalog item the engine knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ItemKind {
    Movie,
    Series,
    Season,
    Episode,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Movie => "Movie",
            ItemKind::Series => "Series",
            ItemKind::Season => "Season",
            ItemKind::Episode => "Episode",
        }
    }

    /// Items that carry a playable file and get a danmu track of their own.
    pub fn is_playable(&self) -> bool {
        matches!(self, ItemKind::Movie | ItemKind::Episode)
    }
}

#[derive(Debug, Error)]
#[error("Unsupported item type: {0}")]
pub struct ParseItemKindError(pub String);

impl FromStr for ItemKind {
    type Err = ParseItemKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "movie" => Ok(ItemKind::Movie),
            "series" => Ok(ItemKind::Series),
            "season" => Ok(ItemKind::Season),
            "episode" => Ok(ItemKind::Episode),
            _ => Err(ParseItemKindError(s.to_string())),
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A catalog item as seen by the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub kind: ItemKind,
    pub name: String,
    /// Production year, used to disambiguate search results
    #[serde(default)]
    pub production_year: Option<i32>,
    /// Episode number within its season, or season number for a season
    #[serde(default)]
    pub index_number: Option<i32>,
    /// Season number of an episode
    #[serde(default)]
    pub parent_index_number: Option<i32>,
    /// Path of the media file (movie, episode) or folder (series, season)
    #[serde(default)]
    pub path: Option<String>,
    /// Placeholder for a missing episode or season
    #[serde(default)]
    pub is_virtual: bool,
    /// Owning season of an episode
    #[serde(default)]
    pub season_id: Option<String>,
    /// Owning series of a season or episode
    #[serde(default)]
    pub series_id: Option<String>,
    #[serde(default)]
    pub series_name: Option<String>,
    #[serde(default)]
    pub provider_ids: ProviderIds,
}

impl MediaItem {
    pub fn new(id: impl Into<String>, kind: ItemKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            production_year: None,
            index_number: None,
            parent_index_number: None,
            path: None,
            is_virtual: false,
            season_id: None,
            series_id: None,
            series_name: None,
            provider_ids: ProviderIds::new(),
        }
    }

    pub fn provider_id(&self, provider: &str) -> Option<&str> {
        self.provider_ids
            .get(provider)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn has_provider_id(&self, provider: &str) -> bool {
        self.provider_id(provider).is_some()
    }

    /// Bind `id` for `provider`. Returns true when the stored value changed.
    pub fn set_provider_id(&mut self, provider: &str, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.provider_id(provider) == Some(id.as_str()) {
            return false;
        }
        self.provider_ids.insert(provider.to_string(), id);
        true
    }

    pub fn remove_provider_id(&mut self, provider: &str) -> bool {
        self.provider_ids.remove(provider).is_some()
    }

    /// Name to search scrapers with: the series name for seasons and
    /// episodes, the item's own name otherwise.
    pub fn search_name(&self) -> &str {
        match self.kind {
            ItemKind::Season | ItemKind::Episode => {
                self.series_name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.name)
            }
            _ => &self.name,
        }
    }

    /// `<folder>/<stem>.xml` next to the media file.
    pub fn danmu_xml_path(&self) -> Option<PathBuf> {
        self.sibling_path("xml")
    }

    /// `<folder>/<stem>.danmu.ass` next to the media file.
    pub fn danmu_ass_path(&self) -> Option<PathBuf> {
        self.sibling_path("danmu.ass")
    }

    fn sibling_path(&self, extension: &str) -> Option<PathBuf> {
        let path = Path::new(self.path.as_deref().filter(|p| !p.is_empty())?);
        let mut file_name = path.file_stem()?.to_os_string();
        file_name.push(".");
        file_name.push(extension);
        Some(path.with_file_name(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kind_from_str() {
        assert_eq!("Movie".parse::<ItemKind>().unwrap(), ItemKind::Movie);
        assert_eq!("episode".parse::<ItemKind>().unwrap(), ItemKind::Episode);
        assert!("BoxSet".parse::<ItemKind>().is_err());
    }

    #[test]
    fn test_set_provider_id_reports_change() {
        let mut item = MediaItem::new("1", ItemKind::Movie, "Your Name");

        assert!(item.set_provider_id("DanmuApiID", "1001"));
        assert!(!item.set_provider_id("DanmuApiID", "1001"));
        assert!(item.set_provider_id("DanmuApiID", "1002"));
        assert_eq!(item.provider_id("DanmuApiID"), Some("1002"));
    }

    #[test]
    fn test_empty_provider_id_is_absent() {
        let mut item = MediaItem::new("1", ItemKind::Movie, "Your Name");
        item.provider_ids.insert("DanmuApiID".to_string(), String::new());

        assert!(!item.has_provider_id("DanmuApiID"));
    }

    #[test]
    fn test_danmu_paths() {
        let mut item = MediaItem::new("1", ItemKind::Episode, "Episode 1");
        item.path = Some("/media/anime/Frieren/Season 1/Frieren S01E01.mkv".to_string());

        assert_eq!(
            item.danmu_xml_path(),
            Some(PathBuf::from("/media/anime/Frieren/Season 1/Frieren S01E01.xml"))
        );
        assert_eq!(
            item.danmu_ass_path(),
            Some(PathBuf::from("/media/anime/Frieren/Season 1/Frieren S01E01.danmu.ass"))
        );
    }

    #[test]
    fn test_danmu_path_keeps_the_stem_untouched() {
        let mut item = MediaItem::new("1", ItemKind::Movie, "Suzume");
        item.path = Some("/media/すずめの戸締まり.2022.1080p.mkv".to_string());
        assert_eq!(
            item.danmu_xml_path(),
            Some(PathBuf::from("/media/すずめの戸締まり.2022.1080p.xml"))
        );

        item.path = Some("Suzume.mkv".to_string());
        assert_eq!(item.danmu_ass_path(), Some(PathBuf::from("Suzume.danmu.ass")));
    }

    #[test]
    fn test_danmu_path_requires_file_path() {
        let item = MediaItem::new("1", ItemKind::Movie, "Your Name");
        assert_eq!(item.danmu_xml_path(), None);
    }

    #[test]
    fn test_search_name_prefers_series_name() {
        let mut season = MediaItem::new("2", ItemKind::Season, "Season 2");
        season.series_name = Some("Frieren".to_string());
        assert_eq!(season.search_name(), "Frieren");

        let movie = MediaItem::new("1", ItemKind::Movie, "Your Name");
        assert_eq!(movie.search_name(), "Your Name");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let item: MediaItem =
            serde_json::from_str(r#"{"id":"9","kind":"Season","name":"Season 1","indexNumber":1}"#)
                .unwrap();

        assert_eq!(item.kind, ItemKind::Season);
        assert_eq!(item.index_number, Some(1));
        assert!(item.provider_ids.is_empty());
        assert!(!item.is_virtual);
    }
}
