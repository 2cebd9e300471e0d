//! Category Invalidation Listener
//!
//! Subscribes to the shared Redis invalidation channel and drops the cached
//! category snapshot whenever another service announces a category change.
//! Messages for other entity types are ignored.

use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::RedisConfig;
use crate::services::CatalogService;

/// Delay before resubscribing after the connection drops
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Entity type as published on the channel: either a plain name or the
/// `{"Custom": "..."}` form used for service-specific entities.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EntityTypeField {
    Name(String),
    Custom {
        #[serde(rename = "Custom")]
        custom: String,
    },
}

impl EntityTypeField {
    pub fn as_str(&self) -> &str {
        match self {
            EntityTypeField::Name(name) => name,
            EntityTypeField::Custom { custom } => custom,
        }
    }
}

/// Subset of the invalidation message this service reads
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidationMessage {
    #[serde(default)]
    pub message_id: Option<String>,
    pub entity_type: EntityTypeField,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub source_service: Option<String>,
}

impl InvalidationMessage {
    /// Whether the message concerns category data
    pub fn targets_categories(&self) -> bool {
        if is_category_name(self.entity_type.as_str()) {
            return true;
        }
        self.pattern
            .as_deref()
            .and_then(|p| p.split(':').next())
            .map(is_category_name)
            .unwrap_or(false)
    }
}

fn is_category_name(name: &str) -> bool {
    name.eq_ignore_ascii_case("category") || name.eq_ignore_ascii_case("categories")
}

/// Parse a raw payload; `None` for malformed or unrelated messages
pub fn parse_category_message(payload: &str) -> Option<InvalidationMessage> {
    match serde_json::from_str::<InvalidationMessage>(payload) {
        Ok(msg) if msg.targets_categories() => Some(msg),
        Ok(msg) => {
            debug!(entity_type = msg.entity_type.as_str(), "Ignoring invalidation message");
            None
        }
        Err(e) => {
            warn!(error = %e, payload = %payload, "Failed to deserialize invalidation message");
            None
        }
    }
}

/// Start the invalidation listener. Runs until the task is aborted,
/// resubscribing after connection failures.
pub async fn start_category_invalidation_listener(
    config: RedisConfig,
    service: Arc<CatalogService>,
) {
    let client = match redis::Client::open(config.url.as_str()) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Invalid REDIS_URL, category invalidation listener disabled");
            return;
        }
    };

    loop {
        match listen(&client, &config.invalidation_channel, &service).await {
            Ok(()) => warn!("Category invalidation subscription ended"),
            Err(e) => error!(error = %e, "Category invalidation subscription failed"),
        }
        sleep(RECONNECT_DELAY).await;
    }
}

async fn listen(
    client: &redis::Client,
    channel: &str,
    service: &CatalogService,
) -> redis::RedisResult<()> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;

    info!(channel = %channel, "Subscribed to category invalidation events");

    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let payload = match msg.get_payload::<String>() {
            Ok(p) => p,
            Err(e) => {
                error!(error = ?e, "Failed to get message payload");
                continue;
            }
        };

        if let Some(invalidation) = parse_category_message(&payload) {
            info!(
                message_id = ?invalidation.message_id,
                entity_id = ?invalidation.entity_id,
                source_service = ?invalidation.source_service,
                "Category change announced, invalidating snapshot"
            );
            service.invalidate_categories().await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_category_entity_is_accepted() {
        let payload = r#"{
            "message_id": "m-1",
            "entity_type": "category",
            "entity_id": "42",
            "action": "Update",
            "source_service": "admin-api"
        }"#;

        let msg = parse_category_message(payload).unwrap();
        assert_eq!(msg.entity_id.as_deref(), Some("42"));
        assert_eq!(msg.source_service.as_deref(), Some("admin-api"));
    }

    #[test]
    fn test_custom_entity_form_is_accepted() {
        let payload = r#"{"entity_type": {"Custom": "category"}, "action": "Delete"}"#;
        assert!(parse_category_message(payload).is_some());
    }

    #[test]
    fn test_category_pattern_is_accepted() {
        let payload = r#"{"entity_type": "Feed", "pattern": "category:*", "action": "Pattern"}"#;
        assert!(parse_category_message(payload).is_some());
    }

    #[test]
    fn test_other_entities_are_ignored() {
        let payload = r#"{"entity_type": "User", "entity_id": "7", "action": "Delete"}"#;
        assert!(parse_category_message(payload).is_none());

        let payload = r#"{"entity_type": "Post", "pattern": "post:*", "action": "Pattern"}"#;
        assert!(parse_category_message(payload).is_none());
    }

    #[test]
    fn test_malformed_payload_is_ignored() {
        assert!(parse_category_message("not json").is_none());
        assert!(parse_category_message(r#"{"entity_id": "1"}"#).is_none());
    }
}
