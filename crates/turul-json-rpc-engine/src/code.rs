//! Error catalog: the standard JSON-RPC 2.0 codes, their default messages and
//! the server-defined range.

use std::fmt;

use crate::error::MessageError;
use crate::error_codes::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
    SERVER_ERROR_END, SERVER_ERROR_START,
};

/// JSON-RPC error codes
///
/// Every integer in `-32099..=-32000` resolves to [`ErrorCode::ServerError`],
/// whose canonical code is the start of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError,
}

impl ErrorCode {
    /// Look up the catalog entry for a raw code.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::UnknownErrorCode`] when the code is neither a
    /// standard code nor inside the server range.
    pub fn resolve(code: i64) -> Result<Self, MessageError> {
        if Self::is_server_code(code) {
            return Ok(ErrorCode::ServerError);
        }
        match code {
            PARSE_ERROR => Ok(ErrorCode::ParseError),
            INVALID_REQUEST => Ok(ErrorCode::InvalidRequest),
            METHOD_NOT_FOUND => Ok(ErrorCode::MethodNotFound),
            INVALID_PARAMS => Ok(ErrorCode::InvalidParams),
            INTERNAL_ERROR => Ok(ErrorCode::InternalError),
            other => Err(MessageError::UnknownErrorCode(other)),
        }
    }

    /// Canonical integer for this entry
    pub fn code(&self) -> i64 {
        match self {
            ErrorCode::ParseError => PARSE_ERROR,
            ErrorCode::InvalidRequest => INVALID_REQUEST,
            ErrorCode::MethodNotFound => METHOD_NOT_FOUND,
            ErrorCode::InvalidParams => INVALID_PARAMS,
            ErrorCode::InternalError => INTERNAL_ERROR,
            ErrorCode::ServerError => SERVER_ERROR_START,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::ServerError => "Server error",
        }
    }

    pub fn is_server_code(code: i64) -> bool {
        (SERVER_ERROR_START..=SERVER_ERROR_END).contains(&code)
    }

    /// Keep a code inside the server range, falling back to its start.
    pub fn clamp_server_code(code: i64) -> i64 {
        if Self::is_server_code(code) {
            code
        } else {
            SERVER_ERROR_START
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.default_message())
    }
}

impl TryFrom<i64> for ErrorCode {
    type Error = MessageError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::resolve(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_codes_resolve() {
        assert_eq!(ErrorCode::resolve(-32700).unwrap(), ErrorCode::ParseError);
        assert_eq!(ErrorCode::resolve(-32600).unwrap(), ErrorCode::InvalidRequest);
        assert_eq!(ErrorCode::resolve(-32601).unwrap(), ErrorCode::MethodNotFound);
        assert_eq!(ErrorCode::resolve(-32602).unwrap(), ErrorCode::InvalidParams);
        assert_eq!(ErrorCode::resolve(-32603).unwrap(), ErrorCode::InternalError);
    }

    #[test]
    fn test_server_range_collapses_to_start() {
        let start = ErrorCode::resolve(-32099).unwrap();
        for code in [-32099, -32050, -32001, -32000] {
            let resolved = ErrorCode::resolve(code).unwrap();
            assert_eq!(resolved, start);
            assert_eq!(resolved.code(), -32099);
            assert_eq!(resolved.default_message(), "Server error");
        }
    }

    #[test]
    fn test_codes_just_outside_range_rejected() {
        assert!(matches!(
            ErrorCode::resolve(-31999),
            Err(MessageError::UnknownErrorCode(-31999))
        ));
        assert!(matches!(
            ErrorCode::resolve(-32100),
            Err(MessageError::UnknownErrorCode(-32100))
        ));
        assert!(ErrorCode::resolve(0).is_err());
    }

    #[test]
    fn test_clamp_server_code() {
        assert_eq!(ErrorCode::clamp_server_code(-32010), -32010);
        assert_eq!(ErrorCode::clamp_server_code(-32000), -32000);
        assert_eq!(ErrorCode::clamp_server_code(-32100), -32099);
        assert_eq!(ErrorCode::clamp_server_code(42), -32099);
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::MethodNotFound.to_string(), "-32601: Method not found");
    }
}
