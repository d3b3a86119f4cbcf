//! Persistence seams. Each trait is one keyed collection; every mutation
//! the voting rules depend on is a single atomic operation on one document.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use time::OffsetDateTime;
use shared::models::{OtpChallenge, TallyRecord, VoterRecord, VoterStats};
use shared::election::ElectionConfig;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    #[error("Store lock poisoned")]
    LockFailed,
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

#[rocket::async_trait]
pub trait VoterStore: Send + Sync {
    async fn get_voter(&self, email: &str) -> Result<Option<VoterRecord>, StoreError>;

    /// Creates or replaces the record for `voter.email`, unless the stored
    /// record has already voted. Returns `false` when the write was refused.
    async fn register(&self, voter: &VoterRecord) -> Result<bool, StoreError>;

    /// Inserts only when no record exists. Returns `false` on conflict.
    async fn insert_new(&self, voter: &VoterRecord) -> Result<bool, StoreError>;

    /// Sets `has_voted` only if it is currently false. Returns `true` when
    /// this call performed the transition.
    async fn mark_voted(&self, email: &str, at: OffsetDateTime) -> Result<bool, StoreError>;

    /// Voters whose credential has not been emailed, oldest first.
    async fn pending_emails(&self) -> Result<Vec<VoterRecord>, StoreError>;

    async fn mark_email_sent(&self, email: &str) -> Result<(), StoreError>;

    async fn stats(&self) -> Result<VoterStats, StoreError>;
}

#[rocket::async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Stores the challenge, superseding any earlier one for the email.
    async fn put_challenge(&self, challenge: &OtpChallenge) -> Result<(), StoreError>;

    async fn get_challenge(&self, email: &str) -> Result<Option<OtpChallenge>, StoreError>;

    /// Deletes the challenge only if it still carries `code`. Returns `true`
    /// when this call consumed it.
    async fn consume_challenge(&self, email: &str, code: &str) -> Result<bool, StoreError>;

    async fn delete_challenge(&self, email: &str) -> Result<(), StoreError>;
}

#[rocket::async_trait]
pub trait TallyStore: Send + Sync {
    /// Adds one vote, creating the position document when absent.
    async fn increment(&self, position: &str, candidate: &str) -> Result<(), StoreError>;

    /// Absent documents read as an empty tally.
    async fn get_tally(&self, position: &str) -> Result<TallyRecord, StoreError>;

    /// Creates zeroed documents for positions that have none yet.
    async fn seed(&self, election: &ElectionConfig) -> Result<(), StoreError>;
}

/// The three collections the service works against.
#[derive(Clone)]
pub struct Stores {
    pub voters: Arc<dyn VoterStore>,
    pub challenges: Arc<dyn ChallengeStore>,
    pub tallies: Arc<dyn TallyStore>,
}

impl Stores {
    pub fn from_backend<S>(store: Arc<S>) -> Self
    where
        S: VoterStore + ChallengeStore + TallyStore + 'static,
    {
        Self {
            voters: store.clone(),
            challenges: store.clone(),
            tallies: store,
        }
    }
}

/// Process-local store for development and tests. Each collection sits
/// behind its own mutex, so every operation is atomic per document.
#[derive(Debug, Default)]
pub struct MemoryStore {
    voters: Mutex<HashMap<String, VoterRecord>>,
    challenges: Mutex<HashMap<String, OtpChallenge>>,
    tallies: Mutex<HashMap<String, TallyRecord>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex.lock().map_err(|_| StoreError::LockFailed)
}

#[rocket::async_trait]
impl VoterStore for MemoryStore {
    async fn get_voter(&self, email: &str) -> Result<Option<VoterRecord>, StoreError> {
        Ok(lock(&self.voters)?.get(email).cloned())
    }

    async fn register(&self, voter: &VoterRecord) -> Result<bool, StoreError> {
        let mut voters = lock(&self.voters)?;
        if voters.get(&voter.email).is_some_and(|v| v.has_voted) {
            return Ok(false);
        }
        voters.insert(voter.email.clone(), voter.clone());
        Ok(true)
    }

    async fn insert_new(&self, voter: &VoterRecord) -> Result<bool, StoreError> {
        let mut voters = lock(&self.voters)?;
        if voters.contains_key(&voter.email) {
            return Ok(false);
        }
        voters.insert(voter.email.clone(), voter.clone());
        Ok(true)
    }

    async fn mark_voted(&self, email: &str, at: OffsetDateTime) -> Result<bool, StoreError> {
        let mut voters = lock(&self.voters)?;
        match voters.get_mut(email) {
            Some(voter) if !voter.has_voted => {
                voter.has_voted = true;
                voter.voted_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn pending_emails(&self) -> Result<Vec<VoterRecord>, StoreError> {
        let mut pending: Vec<_> = lock(&self.voters)?
            .values()
            .filter(|v| !v.email_sent)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.registered_at.cmp(&b.registered_at).then_with(|| a.email.cmp(&b.email)));
        Ok(pending)
    }

    async fn mark_email_sent(&self, email: &str) -> Result<(), StoreError> {
        if let Some(voter) = lock(&self.voters)?.get_mut(email) {
            voter.email_sent = true;
        }
        Ok(())
    }

    async fn stats(&self) -> Result<VoterStats, StoreError> {
        let voters = lock(&self.voters)?;
        Ok(VoterStats {
            total_voters: voters.len() as u64,
            pending_emails: voters.values().filter(|v| !v.email_sent).count() as u64,
            voted: voters.values().filter(|v| v.has_voted).count() as u64,
        })
    }
}

#[rocket::async_trait]
impl ChallengeStore for MemoryStore {
    async fn put_challenge(&self, challenge: &OtpChallenge) -> Result<(), StoreError> {
        lock(&self.challenges)?.insert(challenge.email.clone(), challenge.clone());
        Ok(())
    }

    async fn get_challenge(&self, email: &str) -> Result<Option<OtpChallenge>, StoreError> {
        Ok(lock(&self.challenges)?.get(email).cloned())
    }

    async fn consume_challenge(&self, email: &str, code: &str) -> Result<bool, StoreError> {
        let mut challenges = lock(&self.challenges)?;
        if challenges.get(email).is_some_and(|c| c.code == code) {
            challenges.remove(email);
            return Ok(true);
        }
        Ok(false)
    }

    async fn delete_challenge(&self, email: &str) -> Result<(), StoreError> {
        lock(&self.challenges)?.remove(email);
        Ok(())
    }
}

#[rocket::async_trait]
impl TallyStore for MemoryStore {
    async fn increment(&self, position: &str, candidate: &str) -> Result<(), StoreError> {
        let mut tallies = lock(&self.tallies)?;
        let tally = tallies
            .entry(position.to_string())
            .or_insert_with(|| TallyRecord::empty(position));
        *tally.counts.entry(candidate.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn get_tally(&self, position: &str) -> Result<TallyRecord, StoreError> {
        Ok(lock(&self.tallies)?
            .get(position)
            .cloned()
            .unwrap_or_else(|| TallyRecord::empty(position)))
    }

    async fn seed(&self, election: &ElectionConfig) -> Result<(), StoreError> {
        let mut tallies = lock(&self.tallies)?;
        for position in &election.positions {
            tallies.entry(position.id.clone()).or_insert_with(|| TallyRecord {
                position: position.id.clone(),
                counts: position.candidates.iter().map(|c| (c.id.clone(), 0)).collect(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn voter(email: &str) -> VoterRecord {
        VoterRecord::verified(email, "AB12CD", OffsetDateTime::UNIX_EPOCH)
    }

    #[tokio::test]
    async fn mark_voted_flips_once() {
        let store = MemoryStore::default();
        store.register(&voter("a@x.com")).await.unwrap();

        let at = OffsetDateTime::UNIX_EPOCH + Duration::hours(1);
        assert!(store.mark_voted("a@x.com", at).await.unwrap());
        assert!(!store.mark_voted("a@x.com", at + Duration::minutes(1)).await.unwrap());
        assert!(!store.mark_voted("missing@x.com", at).await.unwrap());

        let stored = store.get_voter("a@x.com").await.unwrap().unwrap();
        assert!(stored.has_voted);
        assert_eq!(stored.voted_at, Some(at));
    }

    #[tokio::test]
    async fn register_never_overwrites_a_voted_record() {
        let store = MemoryStore::default();
        store.register(&voter("a@x.com")).await.unwrap();
        store.mark_voted("a@x.com", OffsetDateTime::UNIX_EPOCH).await.unwrap();

        let mut replacement = voter("a@x.com");
        replacement.credential = "ZZZZZZ".into();
        assert!(!store.register(&replacement).await.unwrap());
        assert_eq!(store.get_voter("a@x.com").await.unwrap().unwrap().credential, "AB12CD");
    }

    #[tokio::test]
    async fn insert_new_rejects_existing_email() {
        let store = MemoryStore::default();
        assert!(store.insert_new(&voter("a@x.com")).await.unwrap());
        assert!(!store.insert_new(&voter("a@x.com")).await.unwrap());
    }

    #[tokio::test]
    async fn consume_requires_current_code() {
        let store = MemoryStore::default();
        let challenge = OtpChallenge {
            email: "a@x.com".into(),
            code: "123456".into(),
            expires_at: OffsetDateTime::UNIX_EPOCH,
            verified: false,
        };
        store.put_challenge(&challenge).await.unwrap();

        assert!(!store.consume_challenge("a@x.com", "654321").await.unwrap());
        assert!(store.consume_challenge("a@x.com", "123456").await.unwrap());
        assert!(!store.consume_challenge("a@x.com", "123456").await.unwrap());
        assert!(store.get_challenge("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn increments_create_and_accumulate() {
        let store = MemoryStore::default();
        assert_eq!(store.get_tally("president").await.unwrap(), TallyRecord::empty("president"));

        store.increment("president", "1").await.unwrap();
        store.increment("president", "1").await.unwrap();
        store.increment("president", "2").await.unwrap();

        let tally = store.get_tally("president").await.unwrap();
        assert_eq!(tally.count("1"), 2);
        assert_eq!(tally.count("2"), 1);
        assert_eq!(tally.count("3"), 0);
    }

    #[tokio::test]
    async fn seed_keeps_existing_counts() {
        let election = ElectionConfig::from_json(
            r#"{"version": 1, "title": "t", "positions": [
                {"id": "president", "title": "P", "candidates": [{"id": "1", "name": "A"}, {"id": "2", "name": "B"}]}
            ]}"#,
        )
        .unwrap();
        let store = MemoryStore::default();
        store.increment("president", "1").await.unwrap();
        store.seed(&election).await.unwrap();

        let tally = store.get_tally("president").await.unwrap();
        assert_eq!(tally.count("1"), 1);
        assert!(!tally.counts.contains_key("2"));
    }
}
