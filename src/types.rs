use crate::error::{ChannelError, Result};
use serde::{Deserialize, Serialize};

/// Balance change pushed by the server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceUpdate {
    pub title: String,
    pub message: String,
    // Informational only
    pub amount: Option<f64>,
    /// Forwarded verbatim to bus subscribers
    pub new_balance: Option<String>,
    pub timestamp: Option<String>,
}

/// Server -> client messages
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Notification {
    #[serde(rename = "balance_update")]
    BalanceUpdate(BalanceUpdate),
    #[serde(other)]
    Other,
}

/// Client -> server messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "authenticate")]
    Authenticate {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

/// Signal published on the bus after a balance update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChanged {
    pub new_balance: Option<String>,
}

/// Parse one inbound text frame.
///
/// Unknown `type` values decode to `Notification::Other`; anything that does
/// not fit the schema is a `ChannelError::Decode`. Only JSON objects are
/// accepted, serde would otherwise read a tagged array positionally.
pub fn decode_notification(text: &str) -> Result<Notification> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(ChannelError::Decode)?;
    if !value.is_object() {
        return Err(ChannelError::Decode(serde::de::Error::custom(
            "notification must be a JSON object",
        )));
    }
    Notification::deserialize(value).map_err(ChannelError::Decode)
}

pub fn encode_client_message(msg: &ClientMessage) -> Result<String> {
    serde_json::to_string(msg).map_err(ChannelError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_balance_update() {
        let text = r#"{"type":"balance_update","title":"Balance Updated","message":"Your balance changed","amount":-25.5,"newBalance":"1234.56","timestamp":"2024-01-01T00:00:00Z"}"#;

        match decode_notification(text).unwrap() {
            Notification::BalanceUpdate(update) => {
                assert_eq!(update.title, "Balance Updated");
                assert_eq!(update.message, "Your balance changed");
                assert_eq!(update.amount, Some(-25.5));
                assert_eq!(update.new_balance.as_deref(), Some("1234.56"));
                assert_eq!(update.timestamp.as_deref(), Some("2024-01-01T00:00:00Z"));
            }
            other => panic!("unexpected notification: {:?}", other),
        }
    }

    #[test]
    fn test_decode_optional_fields_missing() {
        let text = r#"{"type":"balance_update","title":"t","message":"m"}"#;
        let notification = decode_notification(text).unwrap();

        assert_eq!(
            notification,
            Notification::BalanceUpdate(BalanceUpdate {
                title: "t".to_string(),
                message: "m".to_string(),
                amount: None,
                new_balance: None,
                timestamp: None,
            })
        );
    }

    #[test]
    fn test_decode_unknown_type() {
        let text = r#"{"type":"statement_ready","title":"x","message":"y","newBalance":"1"}"#;
        assert_eq!(decode_notification(text).unwrap(), Notification::Other);

        // Unknown types don't need any particular shape
        let text = r#"{"type":"heartbeat"}"#;
        assert_eq!(decode_notification(text).unwrap(), Notification::Other);
    }

    #[test]
    fn test_decode_failures() {
        // Not JSON
        assert!(matches!(decode_notification("hello"), Err(ChannelError::Decode(_))));
        // Missing tag
        assert!(decode_notification(r#"{"title":"t","message":"m"}"#).is_err());
        // balance_update without required fields
        assert!(decode_notification(r#"{"type":"balance_update","title":"t"}"#).is_err());
        // Wrong field type
        assert!(decode_notification(r#"{"type":"balance_update","title":"t","message":"m","newBalance":12}"#).is_err());
        // Not an object
        assert!(decode_notification("[1,2,3]").is_err());
        assert!(decode_notification(r#""balance_update""#).is_err());
        assert!(decode_notification("null").is_err());
    }

    #[test]
    fn test_decode_rejects_tagged_array() {
        let text = r#"["balance_update","Balance Updated","Your balance changed",null,"1.00",null]"#;
        let err = decode_notification(text).unwrap_err();

        assert!(matches!(err, ChannelError::Decode(_)));
        assert!(err.to_string().contains("JSON object"));

        let text = r#"["promo"]"#;
        assert!(decode_notification(text).is_err());
    }

    #[test]
    fn test_encode_authenticate() {
        let msg = ClientMessage::Authenticate {
            user_id: "user-42".to_string(),
        };
        let text = encode_client_message(&msg).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value, serde_json::json!({"type": "authenticate", "userId": "user-42"}));
    }

    #[test]
    fn test_balance_changed_shape() {
        let signal = BalanceChanged {
            new_balance: Some("1234.56".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&signal).unwrap(),
            serde_json::json!({"newBalance": "1234.56"})
        );
    }
}
