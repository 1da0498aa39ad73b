//! Payload types carried inside a [`Msg`](crate::Msg).

use serde::{Deserialize, Serialize};

/// Response codes.
pub mod codes {
    pub const OK: u16 = 0;
    pub const BAD_REQUEST: u16 = 1001;
    pub const FORBIDDEN: u16 = 1003;
    pub const NOT_FOUND: u16 = 1004;
    pub const NOT_IN_CHAT: u16 = 1005;
    pub const INVALID_NAME: u16 = 1006;
}

/// A client request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Request {
    /// Set the caller's display name.
    Name { name: String },
    /// Create a chat room.
    Create { name: String },
    /// Delete a chat room the caller created.
    Delete { chat_id: i64 },
    /// Join a chat room, leaving the current one.
    Join { chat_id: i64 },
    /// Switch to another chat room.
    Change { chat_id: i64 },
    /// Leave the current chat room.
    Leave,
    /// Say something to the current chat room.
    Say { text: String },
    /// List all chat rooms.
    List,
    /// Describe the caller.
    Whoami,
}

impl Request {
    /// The command name as it appears on the wire.
    #[must_use]
    pub fn command(&self) -> &'static str {
        match self {
            Request::Name { .. } => "name",
            Request::Create { .. } => "create",
            Request::Delete { .. } => "delete",
            Request::Join { .. } => "join",
            Request::Change { .. } => "change",
            Request::Leave => "leave",
            Request::Say { .. } => "say",
            Request::List => "list",
            Request::Whoami => "whoami",
        }
    }
}

/// A server response or event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resp {
    /// Result code, [`codes::OK`] on success.
    pub code: u16,
    /// Human readable message.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub msg: String,
    /// Event name for server-initiated messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Response body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Resp {
    /// A bare success response.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            code: codes::OK,
            msg: String::new(),
            event: None,
            data: None,
        }
    }

    /// A success response with a body.
    #[must_use]
    pub fn ok_with(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            ..Self::ok()
        }
    }

    /// An error response.
    #[must_use]
    pub fn error(code: u16, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            event: None,
            data: None,
        }
    }

    /// A server-initiated event.
    #[must_use]
    pub fn event(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: Some(name.into()),
            data: Some(data),
            ..Self::ok()
        }
    }

    /// Whether this response reports success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == codes::OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_json_shape() {
        let req: Request = serde_json::from_str(r#"{"cmd":"join","chat_id":100}"#).unwrap();
        assert_eq!(req, Request::Join { chat_id: 100 });

        let req: Request = serde_json::from_str(r#"{"cmd":"leave"}"#).unwrap();
        assert_eq!(req, Request::Leave);

        let req = Request::Say { text: "hi".into() };
        let text = serde_json::to_string(&req).unwrap();
        assert_eq!(text, r#"{"cmd":"say","text":"hi"}"#);
        assert_eq!(req.command(), "say");
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(serde_json::from_str::<Request>(r#"{"cmd":"explode"}"#).is_err());
    }

    #[test]
    fn test_resp_omits_empty_fields() {
        let text = serde_json::to_string(&Resp::ok()).unwrap();
        assert_eq!(text, r#"{"code":0}"#);

        let resp = Resp::event("say", json!({"text": "hi"}));
        assert!(resp.is_ok());
        assert_eq!(resp.event.as_deref(), Some("say"));

        let resp = Resp::error(codes::NOT_FOUND, "no such chat");
        assert!(!resp.is_ok());
    }
}
