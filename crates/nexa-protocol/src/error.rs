//! Wire error type and numeric error codes.
//!
//! Codes follow the JSON-RPC 2.0 ranges; the file-service specific codes
//! live in the server-error block (-32000 to -32099).

use serde::{Deserialize, Serialize};

/// Error codes returned by the backend file service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdeErrorCode {
    // JSON-RPC 2.0 standard errors
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,

    // Server errors
    ServerError,
    ServerNotInitialized,
    ServerShuttingDown,

    // File service errors
    FileNotFound,
    InvalidPath,
    StorageFailure,

    // Custom code
    Custom(i32),
}

impl IdeErrorCode {
    pub fn code(&self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerError => -32000,
            Self::ServerNotInitialized => -32001,
            Self::ServerShuttingDown => -32002,
            Self::FileNotFound => -32020,
            Self::InvalidPath => -32021,
            Self::StorageFailure => -32022,
            Self::Custom(c) => *c,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            -32000 => Self::ServerError,
            -32001 => Self::ServerNotInitialized,
            -32002 => Self::ServerShuttingDown,
            -32020 => Self::FileNotFound,
            -32021 => Self::InvalidPath,
            -32022 => Self::StorageFailure,
            c => Self::Custom(c),
        }
    }

    /// HTTP status the REST surface answers with for this code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ParseError | Self::InvalidRequest | Self::InvalidParams | Self::InvalidPath => 400,
            Self::MethodNotFound | Self::FileNotFound => 404,
            Self::ServerNotInitialized | Self::ServerShuttingDown => 503,
            _ => 500,
        }
    }
}

/// Error body: `{ "code": -32021, "error": "..." }`.
///
/// The message travels under `error`; `message` is accepted on input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeError {
    pub code: i32,
    #[serde(rename = "error", alias = "message")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl IdeError {
    pub fn new(code: IdeErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(IdeErrorCode::ParseError, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(IdeErrorCode::MethodNotFound, format!("Method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(IdeErrorCode::InvalidParams, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(IdeErrorCode::InternalError, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(IdeErrorCode::ServerError, message)
    }

    pub fn file_not_found(path: &str) -> Self {
        Self::new(IdeErrorCode::FileNotFound, format!("File not found: {path}"))
    }

    pub fn invalid_path(path: &str, reason: &str) -> Self {
        Self::new(IdeErrorCode::InvalidPath, format!("Invalid path '{path}': {reason}"))
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(IdeErrorCode::StorageFailure, message)
    }

    pub fn not_initialized() -> Self {
        Self::new(IdeErrorCode::ServerNotInitialized, "Server is not initialized")
    }

    pub fn shutting_down() -> Self {
        Self::new(IdeErrorCode::ServerShuttingDown, "Server is shutting down")
    }

    pub fn error_code(&self) -> IdeErrorCode {
        IdeErrorCode::from_code(self.code)
    }
}

impl std::fmt::Display for IdeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nexa Error [{}]: {}", self.code, self.message)
    }
}

impl std::error::Error for IdeError {}
