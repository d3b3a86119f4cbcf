use crate::election::ElectionConfig;
use crate::models::{RegisterVoterRequest, Selections};

pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_NAME_LENGTH: usize = 64;
pub const MIN_PHONE_LENGTH: usize = 7;
pub const MAX_PHONE_LENGTH: usize = 20;
pub const OTP_LENGTH: usize = 6;
pub const CREDENTIAL_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Name must be 1-{MAX_NAME_LENGTH} characters")]
    InvalidName,
    #[error("Phone number must be {MIN_PHONE_LENGTH}-{MAX_PHONE_LENGTH} digits")]
    InvalidPhone,
    #[error("No vote for position: {0}")]
    MissingSelection(String),
    #[error("Unknown candidate {candidate} for position {position}")]
    UnknownCandidate { position: String, candidate: String },
    #[error("Unknown position: {0}")]
    UnknownPosition(String),
}

/// Emails key every collection, so they are compared in this form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Plausibility only: one `@`, a non-empty local part and a dotted domain.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };

    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(())
}

pub fn validate_registration(request: &RegisterVoterRequest) -> Result<(), ValidationError> {
    validate_email(&normalize_email(&request.email))?;

    for name in [&request.first_name, &request.last_name] {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
            return Err(ValidationError::InvalidName);
        }
    }

    let phone = request.phone_number.trim();
    let phone_ok = (MIN_PHONE_LENGTH..=MAX_PHONE_LENGTH).contains(&phone.len())
        && phone.chars().any(|c| c.is_ascii_digit())
        && phone.chars().all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'));
    if !phone_ok {
        return Err(ValidationError::InvalidPhone);
    }

    Ok(())
}

/// A ballot is complete when every configured position has exactly one
/// non-empty choice naming one of that position's candidates, and nothing
/// else is selected.
pub fn validate_selections(config: &ElectionConfig, selections: &Selections) -> Result<(), ValidationError> {
    if let Some(position) = selections.keys().find(|p| config.position(p).is_none()) {
        return Err(ValidationError::UnknownPosition(position.clone()));
    }

    for position in &config.positions {
        let choice = selections
            .get(&position.id)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ValidationError::MissingSelection(position.id.clone()))?;

        if position.candidate(choice).is_none() {
            return Err(ValidationError::UnknownCandidate {
                position: position.id.clone(),
                candidate: choice.to_string(),
            });
        }
    }

    Ok(())
}
