use serde::{Deserialize, Serialize};

/// Events sent FROM client TO server over the WebSocket.
///
/// One JSON object per text frame, discriminated by a lowercase `type` tag.
/// A missing or null `recipient` means global scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientEvent {
    /// Bind an authenticated identity to this connection
    Auth { username: String },

    /// Post a message to the global chat or a private conversation
    Message {
        text: String,
        #[serde(default)]
        recipient: Option<String>,
    },

    /// Start or stop the typing indicator in a scope
    Typing {
        #[serde(rename = "isTyping")]
        is_typing: bool,
        #[serde(default)]
        recipient: Option<String>,
    },

    /// Toggle an emoji reaction on a previously sent message
    Reaction {
        #[serde(rename = "messageId")]
        message_id: i64,
        emoji: String,
    },
}

/// Events sent FROM server TO clients over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// A persisted message routed to this connection
    Message {
        id: i64,
        text: String,
        sender: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recipient: Option<String>,
    },

    /// Typing indicator update for a scope this connection participates in
    Typing {
        sender: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },

    /// A reaction was toggled on a message
    Reaction {
        #[serde(rename = "messageId")]
        message_id: i64,
        emoji: String,
        user: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_auth_event() {
        let event: ClientEvent = serde_json::from_str(r#"{"type":"auth","username":"alice"}"#).unwrap();
        match event {
            ClientEvent::Auth { username } => assert_eq!(username, "alice"),
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn missing_recipient_means_global() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"message","text":"hi"}"#).unwrap();
        match event {
            ClientEvent::Message { text, recipient } => {
                assert_eq!(text, "hi");
                assert!(recipient.is_none());
            }
            other => panic!("wrong variant: {:?}", other),
        }

        // Explicit null is equivalent to absent
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"message","text":"hi","recipient":null}"#).unwrap();
        match event {
            ClientEvent::Message { recipient, .. } => assert!(recipient.is_none()),
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn typing_uses_camel_case_flag() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"typing","isTyping":true,"recipient":"bob"}"#).unwrap();
        match event {
            ClientEvent::Typing { is_typing, recipient } => {
                assert!(is_typing);
                assert_eq!(recipient.as_deref(), Some("bob"));
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn outbound_message_shape() {
        let json = serde_json::to_value(ServerEvent::Message {
            id: 1,
            text: "hi".into(),
            sender: "alice".into(),
            recipient: Some("bob".into()),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "message",
                "id": 1,
                "text": "hi",
                "sender": "alice",
                "recipient": "bob"
            })
        );
    }

    #[test]
    fn global_message_omits_recipient() {
        let json = serde_json::to_string(&ServerEvent::Message {
            id: 7,
            text: "all".into(),
            sender: "alice".into(),
            recipient: None,
        })
        .unwrap();
        assert!(!json.contains("recipient"));
    }

    #[test]
    fn outbound_reaction_shape() {
        let json = serde_json::to_value(ServerEvent::Reaction {
            message_id: 42,
            emoji: "👍".into(),
            user: "carol".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "reaction",
                "messageId": 42,
                "emoji": "👍",
                "user": "carol"
            })
        );
    }

    #[test]
    fn unknown_event_type_is_an_error() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"dance"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>("not json").is_err());
    }
}
