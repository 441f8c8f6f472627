use crate::client::{DanmuApiClient, USER_AGENT};
use crate::models::BangumiResponse;

impl DanmuApiClient {
    /// Get anime detail with its episode list
    /// GET /api/v2/bangumi/{anime_id}
    pub async fn get_bangumi(&self, anime_id: &str) -> crate::Result<BangumiResponse> {
        let url = self.url(&format!("/api/v2/bangumi/{}", anime_id))?;
        let response = self
            .client()
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;
        self.handle_response(response).await
    }
}
