use serde::{Serialize, Deserialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    #[error("This email has already been used for voting")]
    AlreadyVoted,
    #[error("Failed to deliver email")]
    DeliveryFailed,
    #[error("No pending OTP for this email")]
    NoChallenge,
    #[error("Invalid OTP")]
    CodeMismatch,
    #[error("OTP has expired")]
    Expired,
    #[error("This email has already been registered")]
    DuplicateEmail,
    #[error("Voter not found")]
    VoterNotFound,
    #[error("Invalid voting code")]
    InvalidCredential,
    #[error("Please vote for all positions")]
    IncompleteBallot,
    #[error("Invalid input provided")]
    InvalidInput,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Operation not authorized")]
    Unauthorized,
    #[error("Internal system error")]
    SystemError,
}

/// Body of every non-2xx JSON response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code,
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.to_string())
    }
}
