//! Control-surface wire protocol
//!
//! JSON-over-newline. Each request is `{"id": ..., "command": {...}}` and
//! each response echoes the id: `{"id": ..., "result": {...}}`. At most
//! one request is in flight per id.

use serde::{Deserialize, Serialize};

use crate::rotation::StartOptions;

/// Command payloads, discriminated by a `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Command {
    /// Replace the configuration and (re)start rotation.
    Start {
        #[serde(flatten)]
        options: StartOptions,
    },
    /// Stop rotation.
    Stop,
    /// Observable engine state.
    Status,
    /// Liveness probe.
    Ping,
    /// The control surface is now open on this connection.
    SurfaceOpen,
    /// The control surface closed (also implied by connection loss).
    SurfaceClose,
}

impl Command {
    /// Known `type` tags, used to classify parse failures.
    pub const KNOWN_TYPES: &'static [&'static str] =
        &["Start", "Stop", "Status", "Ping", "SurfaceOpen", "SurfaceClose"];
}

/// Stable error codes surfaced to callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInterval,
    UnknownCommand,
    InternalError,
}

/// Response payload. `ok` is always present; the remaining fields appear
/// per command.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deferred: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl CommandResult {
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    pub fn deferred() -> Self {
        Self {
            ok: true,
            deferred: Some(true),
            ..Default::default()
        }
    }

    pub fn error(code: ErrorCode) -> Self {
        Self {
            ok: false,
            error: Some(code),
            ..Default::default()
        }
    }

    pub fn status(running: bool, interval_sec: f64, targets: usize) -> Self {
        Self {
            ok: true,
            running: Some(running),
            interval_sec: Some(interval_sec),
            targets: Some(targets),
            ..Default::default()
        }
    }

    pub fn pong() -> Self {
        Self {
            ok: true,
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            ..Default::default()
        }
    }
}

/// One request line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub id: String,
    pub command: Command,
}

/// One response line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub id: String,
    pub result: CommandResult,
}

/// Classify a line that failed to parse as a [`Request`]: an unrecognized
/// `type` tag is the caller's mistake, anything else is on us.
pub fn classify_bad_request(line: &str) -> (String, ErrorCode) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
        return (String::new(), ErrorCode::InternalError);
    };
    let id = value
        .get("id")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let code = match value.get("command").and_then(|c| c.get("type")).and_then(|t| t.as_str()) {
        Some(tag) if !Command::KNOWN_TYPES.contains(&tag) => ErrorCode::UnknownCommand,
        Some(_) => ErrorCode::InternalError,
        None => ErrorCode::UnknownCommand,
    };
    (id, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_request_serialize() {
        let req = Request {
            id: "r-1".to_string(),
            command: Command::Stop,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"id":"r-1","command":{"type":"Stop"}}"#);
    }

    #[test]
    fn test_start_request_flattens_options() {
        let json = r#"{"id":"r-2","command":{"type":"Start","intervalSec":5,"useCustomList":true,"customEntries":["a.test",{"url":"b.test","refresh":true}]}}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        match req.command {
            Command::Start { options } => {
                assert_eq!(options.interval_sec, Some(5.0));
                assert_eq!(options.use_custom_list, Some(true));
                assert_eq!(options.custom_entries.len(), 2);
            }
            other => panic!("expected Start, got {other:?}"),
        }
    }

    #[test]
    fn test_ok_result_shape() {
        let json = serde_json::to_string(&CommandResult::ok()).unwrap();
        assert_eq!(json, r#"{"ok":true}"#);
    }

    #[test]
    fn test_deferred_result_shape() {
        let json = serde_json::to_string(&CommandResult::deferred()).unwrap();
        assert_eq!(json, r#"{"ok":true,"deferred":true}"#);
    }

    #[test]
    fn test_error_result_shape() {
        let json = serde_json::to_string(&CommandResult::error(ErrorCode::InvalidInterval)).unwrap();
        assert_eq!(json, r#"{"ok":false,"error":"INVALID_INTERVAL"}"#);
    }

    #[test]
    fn test_classify_unknown_command() {
        let (id, code) = classify_bad_request(r#"{"id":"x","command":{"type":"Reboot"}}"#);
        assert_eq!(id, "x");
        assert_eq!(code, ErrorCode::UnknownCommand);
    }

    #[test]
    fn test_classify_malformed_known_command() {
        // Known tag but a payload that cannot parse.
        let (_, code) = classify_bad_request(r#"{"id":"x","command":{"type":"Start","intervalSec":{}}}"#);
        assert_eq!(code, ErrorCode::InternalError);
    }

    #[test]
    fn test_classify_garbage() {
        let (id, code) = classify_bad_request("not json at all");
        assert!(id.is_empty());
        assert_eq!(code, ErrorCode::InternalError);
    }

    #[test]
    fn test_roundtrip_all_commands() {
        let commands = vec![
            Command::Stop,
            Command::Status,
            Command::Ping,
            Command::SurfaceOpen,
            Command::SurfaceClose,
        ];
        for command in commands {
            let json = serde_json::to_string(&command).unwrap();
            let parsed: Command = serde_json::from_str(&json).unwrap();
            assert_eq!(command, parsed);
        }
    }
}
