use std::sync::Arc;

use crate::{Scraper, ScraperConfigItem};

/// Registry of installed scrapers
///
/// Registration order is the scrapers' `default_order` (ties keep insertion
/// order). The effective order is recomputed from the configuration on every
/// call, so settings edits apply to the next lookup.
pub struct ScraperManager {
    scrapers: Vec<Arc<dyn Scraper>>,
}

impl ScraperManager {
    pub fn new(mut scrapers: Vec<Arc<dyn Scraper>>) -> Self {
        scrapers.sort_by_key(|s| s.default_order());
        tracing::info!(
            "Registered {} scrapers: {}",
            scrapers.len(),
            scrapers.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
        );
        Self { scrapers }
    }

    /// Enabled scrapers in configured order.
    ///
    /// Configured entries come first, in list order, when enabled and still
    /// registered. Registered scrapers missing from the list follow when
    /// enabled by default.
    pub fn all(&self, configs: &[ScraperConfigItem]) -> Vec<Arc<dyn Scraper>> {
        let mut result: Vec<Arc<dyn Scraper>> = Vec::with_capacity(self.scrapers.len());

        for config in configs.iter().filter(|c| c.enable) {
            if let Some(scraper) = self.find_by_name(&config.name) {
                if !result.iter().any(|s| s.name() == scraper.name()) {
                    result.push(scraper);
                }
            }
        }

        for scraper in &self.scrapers {
            let configured = configs.iter().any(|c| c.name == scraper.name());
            if !configured && scraper.default_enable() {
                result.push(Arc::clone(scraper));
            }
        }

        result
    }

    /// Every registered scraper, enabled or not.
    pub fn all_with_disabled(&self) -> Vec<Arc<dyn Scraper>> {
        self.scrapers.clone()
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<dyn Scraper>> {
        self.scrapers.iter().find(|s| s.name() == name).cloned()
    }

    pub fn find_by_provider_id(&self, provider_id: &str) -> Option<Arc<dyn Scraper>> {
        self.scrapers
            .iter()
            .find(|s| s.provider_id() == provider_id)
            .cloned()
    }

    /// Scraper list as shown in settings: unknown names are pruned and newly
    /// registered scrapers are appended with their default flag.
    pub fn normalize_configs(&self, configs: &[ScraperConfigItem]) -> Vec<ScraperConfigItem> {
        let mut result: Vec<ScraperConfigItem> = Vec::with_capacity(self.scrapers.len());

        for config in configs {
            let registered = self.scrapers.iter().any(|s| s.name() == config.name);
            let duplicate = result.iter().any(|c| c.name == config.name);
            if registered && !duplicate {
                result.push(config.clone());
            }
        }

        for scraper in &self.scrapers {
            if !result.iter().any(|c| c.name == scraper.name()) {
                result.push(ScraperConfigItem::new(scraper.name(), scraper.default_enable()));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domain::MediaItem;

    use crate::{Danmaku, EpisodeInfo, MediaInfo, ScraperError, SearchInfo};

    struct StubScraper {
        name: &'static str,
        order: i32,
        enable: bool,
    }

    fn stub(name: &'static str, order: i32, enable: bool) -> Arc<dyn Scraper> {
        Arc::new(StubScraper {
            name,
            order,
            enable,
        })
    }

    #[async_trait]
    impl Scraper for StubScraper {
        fn name(&self) -> &'static str {
            self.name
        }

        fn provider_id(&self) -> &'static str {
            self.name
        }

        fn default_order(&self) -> i32 {
            self.order
        }

        fn default_enable(&self) -> bool {
            self.enable
        }

        async fn search(&self, _item: &MediaItem) -> Result<Vec<SearchInfo>, ScraperError> {
            Ok(Vec::new())
        }

        async fn search_media_id(&self, _item: &MediaItem) -> Result<Option<String>, ScraperError> {
            Ok(None)
        }

        async fn get_media(
            &self,
            _item: &MediaItem,
            _id: &str,
        ) -> Result<Option<MediaInfo>, ScraperError> {
            Ok(None)
        }

        async fn get_media_episode(
            &self,
            _item: &MediaItem,
            _id: &str,
        ) -> Result<Option<EpisodeInfo>, ScraperError> {
            Ok(None)
        }

        async fn get_danmu_content(
            &self,
            _item: &MediaItem,
            _comment_id: &str,
        ) -> Result<Option<Danmaku>, ScraperError> {
            Ok(None)
        }
    }

    fn names(scrapers: &[Arc<dyn Scraper>]) -> Vec<&'static str> {
        scrapers.iter().map(|s| s.name()).collect()
    }

    fn manager() -> ScraperManager {
        ScraperManager::new(vec![stub("X", 1, true), stub("Y", 2, true), stub("Z", 3, true)])
    }

    #[test]
    fn test_configured_order_then_unconfigured_defaults() {
        let configs = vec![
            ScraperConfigItem::new("X", false),
            ScraperConfigItem::new("Y", true),
        ];

        assert_eq!(names(&manager().all(&configs)), vec!["Y", "Z"]);
    }

    #[test]
    fn test_no_configuration_uses_default_enabled() {
        let manager = ScraperManager::new(vec![
            stub("A", 5, true),
            stub("B", 1, false),
            stub("C", 3, true),
        ]);

        assert_eq!(names(&manager.all(&[])), vec!["C", "A"]);
    }

    #[test]
    fn test_configured_order_wins_over_registration_order() {
        let configs = vec![
            ScraperConfigItem::new("Z", true),
            ScraperConfigItem::new("X", true),
        ];

        assert_eq!(names(&manager().all(&configs)), vec!["Z", "X", "Y"]);
    }

    #[test]
    fn test_unregistered_config_is_dropped() {
        let configs = vec![
            ScraperConfigItem::new("Gone", true),
            ScraperConfigItem::new("Y", true),
        ];

        assert_eq!(names(&manager().all(&configs)), vec!["Y", "X", "Z"]);
    }

    #[test]
    fn test_all_with_disabled_returns_everything() {
        let manager = ScraperManager::new(vec![stub("A", 1, false), stub("B", 2, true)]);

        assert_eq!(names(&manager.all_with_disabled()), vec!["A", "B"]);
        assert_eq!(names(&manager.all(&[])), vec!["B"]);
    }

    #[test]
    fn test_find_by_provider_id() {
        let manager = manager();

        assert_eq!(manager.find_by_provider_id("Y").map(|s| s.name()), Some("Y"));
        assert!(manager.find_by_provider_id("W").is_none());
    }

    #[test]
    fn test_normalize_configs() {
        let manager = ScraperManager::new(vec![stub("X", 1, true), stub("Y", 2, false)]);
        let configs = vec![
            ScraperConfigItem::new("Gone", true),
            ScraperConfigItem::new("X", false),
        ];

        assert_eq!(
            manager.normalize_configs(&configs),
            vec![
                ScraperConfigItem::new("X", false),
                ScraperConfigItem::new("Y", false),
            ]
        );
    }
}
