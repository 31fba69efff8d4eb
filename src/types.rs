// PushBridge Type Definitions
//
// This module contains the shared data structures for push payloads
// crossing the transport pipe, the record store, and the webview bridge.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Title/body block of a provider push message.
///
/// Console-sent messages carry this block; data-only messages omit it and
/// drive the rendered text entirely through the data map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationBlock {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// A push message as delivered by the platform transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushMessage {
    #[serde(default)]
    pub notification: Option<NotificationBlock>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl PushMessage {
    /// Resolve the effective title/body for this message.
    ///
    /// Starts from the notification block, then lets `data["title"]` /
    /// `data["body"]` override it, so a data-only push controls the
    /// rendered text even when a notification block is also present.
    pub fn resolve_content(&self) -> (String, String) {
        let mut title = String::new();
        let mut body = String::new();

        if let Some(block) = &self.notification {
            if let Some(t) = &block.title {
                title = t.clone();
            }
            if let Some(b) = &block.body {
                body = b.clone();
            }
        }

        if let Some(t) = self.data.get("title") {
            title = t.clone();
        }
        if let Some(b) = self.data.get("body") {
            body = b.clone();
        }

        (title, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_fields_override_notification_block() {
        let mut data = BTreeMap::new();
        data.insert("title".to_string(), "Data Title".to_string());

        let msg = PushMessage {
            notification: Some(NotificationBlock {
                title: Some("Block Title".to_string()),
                body: Some("Block Body".to_string()),
            }),
            data,
        };

        let (title, body) = msg.resolve_content();
        assert_eq!(title, "Data Title");
        assert_eq!(body, "Block Body");
    }

    #[test]
    fn test_empty_message_resolves_to_empty_strings() {
        let msg = PushMessage::default();
        let (title, body) = msg.resolve_content();
        assert_eq!(title, "");
        assert_eq!(body, "");
    }

    #[test]
    fn test_data_only_message_deserializes() {
        let msg: PushMessage =
            serde_json::from_str(r#"{"data":{"title":"Fee Due","body":"Pay by 5th"}}"#).unwrap();
        assert!(msg.notification.is_none());
        assert_eq!(
            msg.resolve_content(),
            ("Fee Due".to_string(), "Pay by 5th".to_string())
        );
    }
}
