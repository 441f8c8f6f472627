use async_trait::async_trait;
use domain::MediaItem;
use reqwest::Client;
use serde_json::Value;

use super::models::{EmbyItem, ItemsResponse, VirtualFolder};
use super::{Catalog, CatalogError, LibraryOptions};

const ITEM_FIELDS: &str =
    "ProviderIds,Path,ProductionYear,IndexNumber,ParentIndexNumber,SeasonId,SeriesId,SeriesName,LocationType";

/// Catalog backed by an Emby server
pub struct EmbyCatalog {
    client: Client,
    base_url: String,
    api_key: String,
}

impl EmbyCatalog {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/emby{}", self.base_url, path)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let response = self
            .client
            .get(self.url(path))
            .header("X-Emby-Token", &self.api_key)
            .query(query)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Raw item payload, so an update can post back every field untouched.
    async fn get_raw_item(&self, id: &str) -> Result<Value, CatalogError> {
        let response: ItemsResponse<Value> = self
            .get("/Items", &[("Ids", id), ("Fields", "ProviderIds,Path")])
            .await?;
        response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    async fn query_items(&self, query: &[(&str, &str)]) -> Result<Vec<MediaItem>, CatalogError> {
        let response: ItemsResponse<EmbyItem> = self.get("/Items", query).await?;
        Ok(response
            .items
            .into_iter()
            .filter_map(EmbyItem::into_media_item)
            .collect())
    }
}

#[async_trait]
impl Catalog for EmbyCatalog {
    async fn get_item_by_id(&self, id: &str) -> Result<Option<MediaItem>, CatalogError> {
        let items = self
            .query_items(&[("Ids", id), ("Fields", ITEM_FIELDS)])
            .await?;
        Ok(items.into_iter().next())
    }

    async fn get_items_by_path(&self, path: &str) -> Result<Vec<MediaItem>, CatalogError> {
        let items = self
            .query_items(&[
                ("Path", path),
                ("Recursive", "true"),
                ("Fields", ITEM_FIELDS),
            ])
            .await?;
        Ok(items
            .into_iter()
            .filter(|item| item.path.as_deref() == Some(path))
            .collect())
    }

    async fn get_library_options(&self, item: &MediaItem) -> Result<LibraryOptions, CatalogError> {
        let Some(path) = item.path.as_deref() else {
            return Ok(LibraryOptions::default());
        };

        let folders: Vec<VirtualFolder> = self.get("/Library/VirtualFolders", &[]).await?;
        let folder = folders
            .into_iter()
            .find(|f| f.locations.iter().any(|location| path.starts_with(location.as_str())));

        Ok(match folder {
            Some(folder) => {
                tracing::debug!("Item {} belongs to library '{}'", item.id, folder.name);
                LibraryOptions {
                    disabled_subtitle_fetchers: folder
                        .library_options
                        .map(|o| o.disabled_subtitle_fetchers)
                        .unwrap_or_default(),
                }
            }
            None => LibraryOptions::default(),
        })
    }

    async fn update_metadata(&self, item: &MediaItem) -> Result<(), CatalogError> {
        let mut raw = self.get_raw_item(&item.id).await?;
        let provider_ids = serde_json::to_value(&item.provider_ids).map_err(|e| CatalogError::Json {
            path: "ProviderIds".to_string(),
            source: e,
        })?;
        match raw.as_object_mut() {
            Some(fields) => {
                fields.insert("ProviderIds".to_string(), provider_ids);
            }
            None => {
                return Err(CatalogError::Api {
                    status_code: 200,
                    message: format!("Item {} is not a JSON object", item.id),
                })
            }
        }

        let response = self
            .client
            .post(self.url(&format!("/Items/{}", item.id)))
            .header("X-Emby-Token", &self.api_key)
            .json(&raw)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status_code: status.as_u16(),
                message,
            });
        }

        tracing::debug!("Updated provider ids of {} ({})", item.name, item.id);
        Ok(())
    }

    async fn get_seasons(&self, series: &MediaItem) -> Result<Vec<MediaItem>, CatalogError> {
        let response: ItemsResponse<EmbyItem> = self
            .get(
                &format!("/Shows/{}/Seasons", series.id),
                &[("Fields", ITEM_FIELDS)],
            )
            .await?;
        Ok(response
            .items
            .into_iter()
            .filter_map(EmbyItem::into_media_item)
            .collect())
    }

    async fn get_episodes(&self, season: &MediaItem) -> Result<Vec<MediaItem>, CatalogError> {
        let series_id = season
            .series_id
            .as_deref()
            .ok_or_else(|| CatalogError::NotFound(format!("series of season {}", season.id)))?;

        let response: ItemsResponse<EmbyItem> = self
            .get(
                &format!("/Shows/{}/Episodes", series_id),
                &[("SeasonId", season.id.as_str()), ("Fields", ITEM_FIELDS)],
            )
            .await?;
        Ok(response
            .items
            .into_iter()
            .filter_map(EmbyItem::into_media_item)
            .collect())
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, CatalogError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(CatalogError::Api {
            status_code: status.as_u16(),
            message: body,
        });
    }
    let deserializer = &mut serde_json::Deserializer::from_str(&body);
    serde_path_to_error::deserialize(deserializer).map_err(|e| CatalogError::Json {
        path: e.path().to_string(),
        source: e.into_inner(),
    })
}
