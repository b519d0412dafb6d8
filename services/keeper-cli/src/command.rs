//! Command-line commands and document actions

use std::str::FromStr;

use keeper_client::DocumentApi;
use serde_json::Value;

use crate::error::{Error, Result};

const USAGE: &str = "keeper [--config <path>] <authorize <redirect_uri> | token <redirect_uri> <code> | refresh | get <id> | post | put <id> | delete <id>>";

/// Document verb selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Get,
    Post,
    Put,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Get => "get",
            Action::Post => "post",
            Action::Put => "put",
            Action::Delete => "delete",
        }
    }

    /// Everything but `post` addresses an existing document.
    pub fn requires_id(self) -> bool {
        !matches!(self, Action::Post)
    }

    /// Whether the action sends a document read from stdin.
    pub fn takes_payload(self) -> bool {
        matches!(self, Action::Post | Action::Put)
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Action::Get),
            "post" => Ok(Action::Post),
            "put" => Ok(Action::Put),
            "delete" => Ok(Action::Delete),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

/// One parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Authorize {
        redirect_uri: String,
    },
    Token {
        redirect_uri: String,
        code: String,
    },
    Refresh,
    Document {
        action: Action,
        id: Option<String>,
    },
}

impl Command {
    /// Parse positional arguments, `--config <path>` already removed.
    pub fn parse(args: &[&str]) -> Result<Self> {
        match args {
            ["authorize", redirect_uri] => Ok(Command::Authorize {
                redirect_uri: redirect_uri.to_string(),
            }),
            ["token", redirect_uri, code] => Ok(Command::Token {
                redirect_uri: redirect_uri.to_string(),
                code: code.to_string(),
            }),
            ["refresh"] => Ok(Command::Refresh),
            [action] => Ok(Command::Document {
                action: action.parse()?,
                id: None,
            }),
            [action, id] => Ok(Command::Document {
                action: action.parse()?,
                id: Some(id.to_string()),
            }),
            _ => Err(Error::Usage(USAGE.into())),
        }
    }
}

/// Split `--config <path>` out of the raw arguments (program name excluded).
pub fn split_config_arg(args: &[String]) -> (Option<&str>, Vec<&str>) {
    let mut config = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            config = iter.next().map(String::as_str);
        } else {
            rest.push(arg.as_str());
        }
    }
    (config, rest)
}

/// Document id for `action`: the explicit argument, else the payload's `id`.
pub fn resolve_id(action: Action, explicit: Option<&str>, payload: &Value) -> Result<Option<String>> {
    let id = match explicit {
        Some(id) if !id.is_empty() => Some(id.to_string()),
        _ => match payload.get("id") {
            Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        },
    };
    if action.requires_id() && id.is_none() {
        return Err(Error::NoDocumentId(action.as_str()));
    }
    Ok(id)
}

/// Parse a stdin payload. Blank input is an empty object.
pub fn parse_payload(input: &str) -> Result<Value> {
    if input.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(input).map_err(|e| Error::InvalidPayload(e.to_string()))
}

/// Run one document action against the API.
pub async fn run_action(
    api: &DocumentApi,
    action: Action,
    id: Option<&str>,
    payload: Value,
) -> Result<Value> {
    let id = resolve_id(action, id, &payload)?;
    let target = || serde_json::json!({ "id": id.clone().unwrap_or_default() });

    let reply = match action {
        Action::Get => api.get_document(&id.clone().unwrap_or_default()).await?,
        Action::Post => api.create_document(&payload).await?,
        Action::Put => api.update_document(&target(), &payload).await?,
        Action::Delete => api.remove_document(&target()).await?,
    };
    Ok(reply)
}
