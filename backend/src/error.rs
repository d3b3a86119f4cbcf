use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use thiserror::Error;
use tracing::error;
use shared::error::{ErrorCode, ErrorResponse};
use crate::processor::{BallotError, ResultsError};
use crate::rate_limiter::RateLimitExceeded;
use crate::registry::RegistrationError;
use crate::store::StoreError;
use crate::verifier::OtpError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Otp(#[from] OtpError),
    #[error(transparent)]
    Ballot(#[from] BallotError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Results(#[from] ResultsError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),
}

impl ApiError {
    pub fn status_and_code(&self) -> (Status, ErrorCode) {
        match self {
            ApiError::Otp(e) => match e {
                OtpError::Invalid(_) => (Status::BadRequest, ErrorCode::InvalidInput),
                OtpError::AlreadyVoted => (Status::Conflict, ErrorCode::AlreadyVoted),
                OtpError::DeliveryFailed(_) => (Status::BadGateway, ErrorCode::DeliveryFailed),
                OtpError::NoChallenge => (Status::BadRequest, ErrorCode::NoChallenge),
                OtpError::CodeMismatch => (Status::BadRequest, ErrorCode::CodeMismatch),
                OtpError::Expired => (Status::BadRequest, ErrorCode::Expired),
                OtpError::Store(_) | OtpError::Randomness => (Status::InternalServerError, ErrorCode::SystemError),
            },
            ApiError::Ballot(e) => match e {
                BallotError::VoterNotFound => (Status::NotFound, ErrorCode::VoterNotFound),
                BallotError::AlreadyVoted => (Status::Conflict, ErrorCode::AlreadyVoted),
                BallotError::InvalidCredential => (Status::Forbidden, ErrorCode::InvalidCredential),
                BallotError::IncompleteBallot(_) => (Status::BadRequest, ErrorCode::IncompleteBallot),
                BallotError::Store(_) => (Status::InternalServerError, ErrorCode::SystemError),
            },
            ApiError::Registration(e) => match e {
                RegistrationError::Invalid(_) | RegistrationError::InappropriateName(_) => {
                    (Status::BadRequest, ErrorCode::InvalidInput)
                }
                RegistrationError::DuplicateEmail => (Status::Conflict, ErrorCode::DuplicateEmail),
                RegistrationError::Store(_) | RegistrationError::Randomness => {
                    (Status::InternalServerError, ErrorCode::SystemError)
                }
            },
            ApiError::Results(e) => match e {
                ResultsError::UnknownPosition(_) => (Status::NotFound, ErrorCode::InvalidInput),
                ResultsError::Store(_) => (Status::InternalServerError, ErrorCode::SystemError),
            },
            ApiError::Store(_) => (Status::InternalServerError, ErrorCode::SystemError),
            ApiError::RateLimited(_) => (Status::TooManyRequests, ErrorCode::RateLimited),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let (status, code) = self.status_and_code();

        // Dependency failures stay opaque to the caller.
        let message = match code {
            ErrorCode::SystemError => {
                error!("{} {} failed: {}", req.method(), req.uri(), self);
                code.to_string()
            }
            ErrorCode::DeliveryFailed => {
                "We could not send the email. Please request a new code.".to_string()
            }
            _ => self.to_string(),
        };

        rocket::Response::build_from(Json(ErrorResponse::new(code, message)).respond_to(req)?)
            .status(status)
            .ok()
    }
}
