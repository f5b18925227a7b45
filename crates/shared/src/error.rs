use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotInRoom,
    RoomNotFound,
    RoomFull,
    SeatNotFound,
    OutOfTurn,
    MatchAlreadyDecided,
    ColumnFull,
    MalformedRequest,
    Internal,
}

/// Rejection notice returned to the single caller that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

impl From<crate::domain::RoomCodeError> for ApiError {
    fn from(value: crate::domain::RoomCodeError) -> Self {
        Self::malformed(value.to_string())
    }
}
