use crate::client::{DanmuApiClient, USER_AGENT};
use crate::models::SearchAnimeResponse;

impl DanmuApiClient {
    /// Search anime by keyword
    /// GET /api/v2/search/anime?keyword={keyword}
    pub async fn search_anime(&self, keyword: &str) -> crate::Result<SearchAnimeResponse> {
        let url = self.url("/api/v2/search/anime")?;
        let response = self
            .client()
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .query(&[("keyword", keyword)])
            .send()
            .await?;
        self.handle_response(response).await
    }
}
