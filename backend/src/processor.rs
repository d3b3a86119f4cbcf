use std::sync::Arc;
use futures::future::try_join_all;
use time::OffsetDateTime;
use tracing::{debug, error, info};
use shared::election::ElectionConfig;
use shared::models::{CandidateShare, ElectionResults, PositionResults, Selections};
use shared::tally::{compute_shares, position_results};
use shared::validation::{normalize_email, validate_selections, ValidationError};
use crate::store::{StoreError, TallyStore, VoterStore};
use crate::utils::{codes_match, Clock};

#[derive(Debug, thiserror::Error)]
pub enum BallotError {
    #[error("Voter not found")]
    VoterNotFound,
    #[error("You have already voted")]
    AlreadyVoted,
    #[error("Invalid voting code")]
    InvalidCredential,
    #[error("Incomplete ballot: {0}")]
    IncompleteBallot(ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    #[error("Unknown position: {0}")]
    UnknownPosition(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct BallotProcessor {
    voters: Arc<dyn VoterStore>,
    tallies: Arc<dyn TallyStore>,
    election: Arc<ElectionConfig>,
    clock: Arc<dyn Clock>,
}

impl BallotProcessor {
    pub fn new(
        voters: Arc<dyn VoterStore>,
        tallies: Arc<dyn TallyStore>,
        election: Arc<ElectionConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { voters, tallies, election, clock }
    }

    /// Casts one ballot. The voter is marked as voted before any counter
    /// moves; if an increment then fails the ballot is undercounted, never
    /// counted twice.
    pub async fn submit(
        &self,
        email: &str,
        credential: &str,
        selections: &Selections,
    ) -> Result<OffsetDateTime, BallotError> {
        let email = normalize_email(email);

        let voter = self.voters
            .get_voter(&email)
            .await?
            .ok_or(BallotError::VoterNotFound)?;

        if voter.has_voted {
            return Err(BallotError::AlreadyVoted);
        }

        if !codes_match(&voter.credential, credential.trim()) {
            debug!("Credential mismatch for {}", email);
            return Err(BallotError::InvalidCredential);
        }

        validate_selections(&self.election, selections).map_err(BallotError::IncompleteBallot)?;

        let voted_at = self.clock.now();
        if !self.voters.mark_voted(&email, voted_at).await? {
            debug!("Lost vote race for {}", email);
            return Err(BallotError::AlreadyVoted);
        }

        for (position, candidate) in selections {
            if let Err(e) = self.tallies.increment(position, candidate).await {
                error!(
                    "Ballot from {} recorded but tally increment failed at {}: {}",
                    email, position, e
                );
                return Err(BallotError::Store(e));
            }
        }

        info!("Ballot cast by {}", email);
        Ok(voted_at)
    }
}

/// Read-only view over the tallies, in configured order.
pub struct ResultsAggregator {
    tallies: Arc<dyn TallyStore>,
    election: Arc<ElectionConfig>,
}

impl ResultsAggregator {
    pub fn new(tallies: Arc<dyn TallyStore>, election: Arc<ElectionConfig>) -> Self {
        Self { tallies, election }
    }

    pub async fn compute_shares(&self, position: &str) -> Result<Vec<CandidateShare>, ResultsError> {
        let config = self.election
            .position(position)
            .ok_or_else(|| ResultsError::UnknownPosition(position.to_string()))?;
        let tally = self.tallies.get_tally(&config.id).await?;
        Ok(compute_shares(config, &tally))
    }

    pub async fn position(&self, position: &str) -> Result<PositionResults, ResultsError> {
        let config = self.election
            .position(position)
            .ok_or_else(|| ResultsError::UnknownPosition(position.to_string()))?;
        let tally = self.tallies.get_tally(&config.id).await?;
        Ok(position_results(config, &tally))
    }

    pub async fn results(&self) -> Result<ElectionResults, ResultsError> {
        let tallies = try_join_all(
            self.election.positions.iter().map(|p| self.tallies.get_tally(&p.id)),
        )
        .await?;

        let positions = self.election
            .positions
            .iter()
            .zip(tallies.iter())
            .map(|(config, tally)| position_results(config, tally))
            .collect();

        Ok(ElectionResults {
            version: self.election.version,
            title: self.election.title.clone(),
            positions,
        })
    }
}
