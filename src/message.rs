//! Request and response envelopes, and their JSON wire form.
//!
//! Requests arrive either as an object
//! (`{"action", "payload", "password", "fileName", "providerType"}`) or as the
//! positional array `[action, payload, password, fileName, providerType?]`
//! (`[action, providerType?]` for `INIT`). Payloads are base64 strings or
//! arrays of byte values.
//!
//! Responses are always positional arrays:
//!
//! ```text
//! ["INIT_SUCCESS", providerType]
//! ["INIT_ERROR", message, code?]
//! [action, resultBytes, outputFileName]
//! ["ERROR", userMessage, action|null, code?]
//! ```

use std::str::FromStr;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde_json::{Map, Value, json};

use crate::error::{ErrorCode, NormalizedError};
use crate::secret::Secret;
use crate::types::{Action, ProviderType};
use crate::validate::{self, INVALID_ACTION, INVALID_FILE_DATA, INVALID_MESSAGE, INVALID_PASSWORD, INVALID_PROVIDER};

/// Fields shared by `ENCRYPT` and `DECRYPT`.
#[derive(Clone, Debug)]
pub struct Operation {
    pub payload: Vec<u8>,
    pub password: Secret,
    pub file_name: String,
    pub provider: Option<ProviderType>,
}

#[derive(Clone, Debug)]
pub enum Request {
    Init { provider: Option<ProviderType> },
    Encrypt(Operation),
    Decrypt(Operation),
}

impl Request {
    /// Decodes and validates a wire envelope.
    ///
    /// Checks run in a fixed order and the first failure becomes the response:
    /// shape, action, then (per action) payload, password, file name and
    /// provider identifier.
    pub fn decode(message: &Value) -> Result<Self, Response> {
        let fields = Fields::new(message).ok_or_else(|| Response::error(None, INVALID_MESSAGE))?;

        let action = match fields.get("action", 0) {
            Some(Value::String(tag)) => Action::from_str(tag).map_err(|_| Response::error(None, INVALID_ACTION))?,
            Some(_) => return Err(Response::error(None, INVALID_ACTION)),
            None => return Err(Response::error(None, INVALID_MESSAGE)),
        };

        match action {
            Action::Init => {
                let provider = provider_type(fields.get("providerType", 1)).map_err(|message| Response::InitError { message: message.to_owned(), code: None })?;
                Ok(Self::Init { provider })
            }
            Action::Encrypt => Ok(Self::Encrypt(operation(&fields).map_err(|message| Response::error(Some(action), message))?)),
            Action::Decrypt => Ok(Self::Decrypt(operation(&fields).map_err(|message| Response::error(Some(action), message))?)),
        }
    }
}

fn operation(fields: &Fields<'_>) -> Result<Operation, &'static str> {
    let payload = payload(fields.get("payload", 1))?;

    let password = match fields.get("password", 2) {
        Some(Value::String(password)) => password,
        _ => return Err(INVALID_PASSWORD),
    };
    validate::password(password)?;

    let file_name = match fields.get("fileName", 3) {
        Some(Value::String(name)) => name,
        _ => return Err(validate::INVALID_FILENAME),
    };
    validate::file_name(file_name)?;

    let provider = provider_type(fields.get("providerType", 4))?;

    Ok(Operation { payload, password: Secret::new(password), file_name: file_name.clone(), provider })
}

fn payload(value: Option<&Value>) -> Result<Vec<u8>, &'static str> {
    match value {
        Some(Value::String(encoded)) => BASE64_STANDARD.decode(encoded).map_err(|_| INVALID_FILE_DATA),
        Some(Value::Array(items)) => items.iter().map(|item| item.as_u64().and_then(|byte| u8::try_from(byte).ok()).ok_or(INVALID_FILE_DATA)).collect(),
        _ => Err(INVALID_FILE_DATA),
    }
}

fn provider_type(value: Option<&Value>) -> Result<Option<ProviderType>, &'static str> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => ProviderType::from_str(id).map(Some).map_err(|_| INVALID_PROVIDER),
        Some(_) => Err(INVALID_PROVIDER),
    }
}

/// Named or positional access to envelope fields.
enum Fields<'a> {
    Named(&'a Map<String, Value>),
    Positional(&'a [Value]),
}

impl<'a> Fields<'a> {
    fn new(message: &'a Value) -> Option<Self> {
        match message {
            Value::Object(map) => Some(Self::Named(map)),
            Value::Array(items) if !items.is_empty() => Some(Self::Positional(items)),
            _ => None,
        }
    }

    fn get(&self, name: &str, index: usize) -> Option<&'a Value> {
        match self {
            Self::Named(map) => map.get(name),
            Self::Positional(items) => items.get(index),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    InitSuccess { provider: ProviderType },
    InitError { message: String, code: Option<ErrorCode> },
    Success { action: Action, payload: Vec<u8>, file_name: String },
    Error { action: Option<Action>, user_message: String, code: Option<ErrorCode> },
}

impl Response {
    /// A validation failure; carries no error code.
    pub fn error(action: Option<Action>, user_message: &str) -> Self {
        Self::Error { action, user_message: user_message.to_owned(), code: None }
    }

    /// An operation failure after normalization. Only the user message and
    /// code leave the process.
    pub fn failure(action: Action, error: &NormalizedError) -> Self {
        Self::Error { action: Some(action), user_message: error.user_message.clone(), code: Some(error.code) }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::InitError { code, .. } | Self::Error { code, .. } => *code,
            Self::InitSuccess { .. } | Self::Success { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::InitSuccess { .. } | Self::Success { .. })
    }

    pub fn encode(&self) -> Value {
        match self {
            Self::InitSuccess { provider } => json!(["INIT_SUCCESS", provider.as_str()]),
            Self::InitError { message, code } => with_code(vec![json!("INIT_ERROR"), json!(message)], *code),
            Self::Success { action, payload, file_name } => json!([action.as_str(), BASE64_STANDARD.encode(payload), file_name]),
            Self::Error { action, user_message, code } => with_code(vec![json!("ERROR"), json!(user_message), action.map_or(Value::Null, |action| json!(action.as_str()))], *code),
        }
    }
}

fn with_code(mut items: Vec<Value>, code: Option<ErrorCode>) -> Value {
    if let Some(code) = code {
        items.push(json!(code.as_str()));
    }
    Value::Array(items)
}
