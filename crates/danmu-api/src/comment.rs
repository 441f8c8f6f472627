use crate::client::{DanmuApiClient, USER_AGENT};
use crate::models::CommentResponse;

impl DanmuApiClient {
    /// Get every comment of an episode, including related sources
    /// GET /api/v2/comment/{episode_id}?withRelated=true
    pub async fn get_comments(&self, episode_id: &str) -> crate::Result<CommentResponse> {
        let url = self.url(&format!("/api/v2/comment/{}", episode_id))?;
        let response = self
            .client()
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .query(&[("withRelated", "true")])
            .send()
            .await?;
        self.handle_response(response).await
    }
}
