use std::sync::Arc;
use ring::rand::SystemRandom;
use rustrict::CensorStr;
use tracing::{debug, info};
use shared::models::{RegisterVoterRequest, VoterRecord};
use shared::validation::{normalize_email, validate_registration, ValidationError};
use crate::store::{StoreError, VoterStore};
use crate::utils::{generate_credential, Clock};

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Possible profanity detected in name: {0}")]
    InappropriateName(String),
    #[error("This email has already been registered")]
    DuplicateEmail,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Random source unavailable")]
    Randomness,
}

/// Registration without OTP. The credential is delivered later by the
/// batch mailer in `notifier`.
pub struct Registry {
    voters: Arc<dyn VoterStore>,
    clock: Arc<dyn Clock>,
    rng: SystemRandom,
}

impl Registry {
    pub fn new(voters: Arc<dyn VoterStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            voters,
            clock,
            rng: SystemRandom::new(),
        }
    }

    pub async fn register(&self, request: &RegisterVoterRequest) -> Result<(), RegistrationError> {
        validate_registration(request)?;

        for name in [&request.first_name, &request.last_name] {
            if name.is_inappropriate() {
                return Err(RegistrationError::InappropriateName(name.trim().to_string()));
            }
        }

        let email = normalize_email(&request.email);
        let credential = generate_credential(&self.rng).map_err(|_| RegistrationError::Randomness)?;
        let voter = VoterRecord::direct(request, email.clone(), credential, self.clock.now());

        if !self.voters.insert_new(&voter).await? {
            debug!("Duplicate registration for {}", email);
            return Err(RegistrationError::DuplicateEmail);
        }

        info!("Voter registered directly: {}", email);
        Ok(())
    }
}
