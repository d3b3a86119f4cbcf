use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

pub type PositionId = String;
pub type CandidateId = String;

/// Ballot selections keyed by position, one candidate each.
pub type Selections = BTreeMap<PositionId, CandidateId>;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "backend", derive(sqlx::FromRow))]
pub struct VoterRecord {
    pub email: String,
    pub credential: String,
    pub has_voted: bool,
    pub voted_at: Option<OffsetDateTime>,
    pub registered_at: OffsetDateTime,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email_sent: bool,
}

impl VoterRecord {
    /// Record created by a successful OTP verification. The credential is
    /// shown on screen, so there is nothing left for the batch mailer.
    pub fn verified(email: impl Into<String>, credential: impl Into<String>, now: OffsetDateTime) -> Self {
        Self {
            email: email.into(),
            credential: credential.into(),
            has_voted: false,
            voted_at: None,
            registered_at: now,
            first_name: None,
            last_name: None,
            phone: None,
            email_sent: true,
        }
    }

    pub fn direct(
        request: &RegisterVoterRequest,
        email: impl Into<String>,
        credential: impl Into<String>,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            email: email.into(),
            credential: credential.into(),
            has_voted: false,
            voted_at: None,
            registered_at: now,
            first_name: Some(request.first_name.trim().to_string()),
            last_name: Some(request.last_name.trim().to_string()),
            phone: Some(request.phone_number.trim().to_string()),
            email_sent: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "backend", derive(sqlx::FromRow))]
pub struct OtpChallenge {
    pub email: String,
    pub code: String,
    pub expires_at: OffsetDateTime,
    pub verified: bool,
}

impl OtpChallenge {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyRecord {
    pub position: PositionId,
    pub counts: BTreeMap<CandidateId, u64>,
}

impl TallyRecord {
    pub fn empty(position: impl Into<PositionId>) -> Self {
        Self {
            position: position.into(),
            counts: BTreeMap::new(),
        }
    }

    pub fn count(&self, candidate: &str) -> u64 {
        self.counts.get(candidate).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub voting_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVoterRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotRequest {
    pub email: String,
    pub code: String,
    pub votes: Selections,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BallotResponse {
    pub success: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub voted_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateShare {
    pub candidate_id: CandidateId,
    pub name: String,
    pub count: u64,
    /// Fraction of the position's votes, in `[0, 1]`.
    pub share: f64,
    /// `share` as a percentage rounded to one decimal.
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionResults {
    pub position: PositionId,
    pub title: String,
    pub total_votes: u64,
    pub candidates: Vec<CandidateShare>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    pub version: u32,
    pub title: String,
    pub positions: Vec<PositionResults>,
}

impl ElectionResults {
    pub fn position(&self, id: &str) -> Option<&PositionResults> {
        self.positions.iter().find(|p| p.position == id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub sent_count: usize,
    pub error_count: usize,
    pub errors: Vec<String>,
    pub aborted: bool,
}

impl BatchSummary {
    pub fn is_partial(&self) -> bool {
        self.error_count > 0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoterStats {
    pub total_voters: u64,
    pub pending_emails: u64,
    pub voted: u64,
}
