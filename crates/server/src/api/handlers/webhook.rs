use axum::{extract::State, http::StatusCode, Json};
use domain::{EventType, MediaItem};

use crate::catalog::EmbyWebhook;
use crate::models::Settings;
use crate::state::AppState;

/// Map a webhook notification to an engine event.
///
/// `None` when the notification is not one the engine acts on.
fn library_event(payload: EmbyWebhook, settings: &Settings) -> Option<(MediaItem, EventType)> {
    let event_type = match payload.event.as_str() {
        "library.new" => EventType::Add,
        "item.update" | "item.metadata" => EventType::Update,
        other => {
            tracing::debug!("Ignoring webhook event {}", other);
            return None;
        }
    };

    if !settings.download.enable_auto_download {
        tracing::debug!("Automatic download is off, ignoring {}", payload.event);
        return None;
    }

    let item = payload.item?.into_media_item()?;
    if item.is_virtual {
        tracing::debug!("Ignoring virtual item {}", item.name);
        return None;
    }

    Some((item, event_type))
}

/// Catalog change notification (Emby webhook payload)
#[utoipa::path(
    post,
    path = "/api/webhook/library",
    tag = "webhook",
    request_body = EmbyWebhook,
    responses(
        (status = 202, description = "Event queued"),
        (status = 200, description = "Event ignored")
    )
)]
pub async fn library_webhook(
    State(state): State<AppState>,
    Json(payload): Json<EmbyWebhook>,
) -> (StatusCode, &'static str) {
    let settings = state.settings.get();
    let Some((item, event_type)) = library_event(payload, &settings) else {
        return (StatusCode::OK, "Ignored");
    };

    tracing::info!("Received {:?} for {} {} ({})", event_type, item.kind, item.name, item.id);
    state.events.enqueue(item, event_type).await;
    (StatusCode::ACCEPTED, "Queued")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EmbyItem;
    use domain::ItemKind;

    fn webhook(event: &str, item_type: &str) -> EmbyWebhook {
        EmbyWebhook {
            event: event.to_string(),
            title: None,
            item: Some(EmbyItem {
                id: "1".to_string(),
                name: "Frieren".to_string(),
                item_type: item_type.to_string(),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_event_mapping() {
        let settings = Settings::default();

        let (item, event_type) = library_event(webhook("library.new", "Episode"), &settings).unwrap();
        assert_eq!(item.kind, ItemKind::Episode);
        assert_eq!(event_type, EventType::Add);

        let (_, event_type) = library_event(webhook("item.update", "Series"), &settings).unwrap();
        assert_eq!(event_type, EventType::Update);

        assert!(library_event(webhook("playback.start", "Episode"), &settings).is_none());
    }

    #[test]
    fn test_unsupported_and_virtual_items_are_ignored() {
        let settings = Settings::default();
        assert!(library_event(webhook("library.new", "BoxSet"), &settings).is_none());

        let mut payload = webhook("library.new", "Season");
        if let Some(item) = payload.item.as_mut() {
            item.location_type = Some("Virtual".to_string());
        }
        assert!(library_event(payload, &settings).is_none());
    }

    #[test]
    fn test_auto_download_off_ignores_everything() {
        let mut settings = Settings::default();
        settings.download.enable_auto_download = false;

        assert!(library_event(webhook("library.new", "Movie"), &settings).is_none());
    }
}
