use std::sync::Arc;
use ring::rand::SystemRandom;
use time::Duration;
use tracing::{debug, error, info, warn};
use shared::models::{OtpChallenge, VoterRecord};
use shared::validation::{normalize_email, validate_email, ValidationError};
use crate::mailer::{otp_email, MailError, Mailer};
use crate::store::{ChallengeStore, StoreError, VoterStore};
use crate::utils::{codes_match, generate_credential, generate_otp, Clock};

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("This email has already been used for voting")]
    AlreadyVoted,
    #[error("OTP stored but the email could not be sent: {0}")]
    DeliveryFailed(MailError),
    #[error("No OTP has been requested for this email")]
    NoChallenge,
    #[error("Invalid OTP")]
    CodeMismatch,
    #[error("OTP has expired")]
    Expired,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Random source unavailable")]
    Randomness,
}

/// Proves control of an email address and mints the voting credential.
pub struct OtpVerifier {
    voters: Arc<dyn VoterStore>,
    challenges: Arc<dyn ChallengeStore>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    rng: SystemRandom,
    ttl: Duration,
}

impl OtpVerifier {
    pub fn new(
        voters: Arc<dyn VoterStore>,
        challenges: Arc<dyn ChallengeStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            voters,
            challenges,
            mailer,
            clock,
            rng: SystemRandom::new(),
            ttl,
        }
    }

    /// Stores a fresh challenge for `email`, replacing any earlier one, then
    /// emails the code. A failed send leaves the stored challenge usable.
    pub async fn issue(&self, email: &str) -> Result<(), OtpError> {
        let email = normalize_email(email);
        validate_email(&email)?;

        if let Some(voter) = self.voters.get_voter(&email).await? {
            if voter.has_voted {
                debug!("OTP refused for {}: already voted", email);
                return Err(OtpError::AlreadyVoted);
            }
        }

        let code = generate_otp(&self.rng).map_err(|_| OtpError::Randomness)?;
        let challenge = OtpChallenge {
            email: email.clone(),
            code,
            expires_at: self.clock.now() + self.ttl,
            verified: false,
        };
        self.challenges.put_challenge(&challenge).await?;

        let message = otp_email(&email, &challenge.code, self.ttl.whole_minutes());
        if let Err(e) = self.mailer.send(&message).await {
            error!("Failed to send OTP to {}: {}", email, e);
            return Err(OtpError::DeliveryFailed(e));
        }

        info!("OTP issued for {}", email);
        Ok(())
    }

    /// Checks `code` against the live challenge and, on success, registers
    /// the voter and returns the credential. It is not retrievable again.
    pub async fn verify(&self, email: &str, code: &str) -> Result<String, OtpError> {
        let email = normalize_email(email);

        let challenge = self.challenges
            .get_challenge(&email)
            .await?
            .ok_or(OtpError::NoChallenge)?;

        if !codes_match(&challenge.code, code) {
            debug!("OTP mismatch for {}", email);
            return Err(OtpError::CodeMismatch);
        }

        let now = self.clock.now();
        if challenge.is_expired(now) {
            self.challenges.delete_challenge(&email).await?;
            debug!("Expired OTP removed for {}", email);
            return Err(OtpError::Expired);
        }

        // A concurrent verify or a newer issue may have replaced the challenge.
        if !self.challenges.consume_challenge(&email, &challenge.code).await? {
            return Err(OtpError::NoChallenge);
        }

        let credential = generate_credential(&self.rng).map_err(|_| OtpError::Randomness)?;
        let voter = VoterRecord::verified(email.clone(), credential.clone(), now);
        if !self.voters.register(&voter).await? {
            warn!("Verified OTP for {} but the voter has already voted", email);
            return Err(OtpError::AlreadyVoted);
        }

        info!("Voter registered via OTP: {}", email);
        Ok(credential)
    }
}
