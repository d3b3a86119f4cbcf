use std::collections::BTreeMap;
use sqlx::{types::Json, PgPool};
use time::OffsetDateTime;
use shared::election::ElectionConfig;
use shared::models::{OtpChallenge, TallyRecord, VoterRecord, VoterStats};
use crate::store::{ChallengeStore, StoreError, TallyStore, VoterStore};

const VOTER_COLUMNS: &str =
    "email, credential, has_voted, voted_at, registered_at, first_name, last_name, phone, email_sent";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[rocket::async_trait]
impl VoterStore for PgStore {
    async fn get_voter(&self, email: &str) -> Result<Option<VoterRecord>, StoreError> {
        let sql = format!("SELECT {VOTER_COLUMNS} FROM voters WHERE email = $1");
        Ok(sqlx::query_as::<_, VoterRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn register(&self, voter: &VoterRecord) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO voters
             (email, credential, has_voted, voted_at, registered_at, first_name, last_name, phone, email_sent)
             VALUES ($1, $2, FALSE, NULL, $3, $4, $5, $6, $7)
             ON CONFLICT (email) DO UPDATE SET
                credential = EXCLUDED.credential,
                registered_at = EXCLUDED.registered_at,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                phone = EXCLUDED.phone,
                email_sent = EXCLUDED.email_sent
             WHERE voters.has_voted = FALSE",
        )
        .bind(&voter.email)
        .bind(&voter.credential)
        .bind(voter.registered_at)
        .bind(&voter.first_name)
        .bind(&voter.last_name)
        .bind(&voter.phone)
        .bind(voter.email_sent)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_new(&self, voter: &VoterRecord) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO voters
             (email, credential, has_voted, voted_at, registered_at, first_name, last_name, phone, email_sent)
             VALUES ($1, $2, FALSE, NULL, $3, $4, $5, $6, $7)
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(&voter.email)
        .bind(&voter.credential)
        .bind(voter.registered_at)
        .bind(&voter.first_name)
        .bind(&voter.last_name)
        .bind(&voter.phone)
        .bind(voter.email_sent)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_voted(&self, email: &str, at: OffsetDateTime) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE voters SET has_voted = TRUE, voted_at = $2
             WHERE email = $1 AND has_voted = FALSE",
        )
        .bind(email)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn pending_emails(&self) -> Result<Vec<VoterRecord>, StoreError> {
        let sql = format!(
            "SELECT {VOTER_COLUMNS} FROM voters WHERE email_sent = FALSE ORDER BY registered_at, email"
        );
        Ok(sqlx::query_as::<_, VoterRecord>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn mark_email_sent(&self, email: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE voters SET email_sent = TRUE WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn stats(&self) -> Result<VoterStats, StoreError> {
        let (total, pending, voted) = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE email_sent = FALSE),
                    COUNT(*) FILTER (WHERE has_voted)
             FROM voters",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(VoterStats {
            total_voters: total.max(0) as u64,
            pending_emails: pending.max(0) as u64,
            voted: voted.max(0) as u64,
        })
    }
}

#[rocket::async_trait]
impl ChallengeStore for PgStore {
    async fn put_challenge(&self, challenge: &OtpChallenge) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO otp_challenges (email, code, expires_at, verified)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (email) DO UPDATE SET
                code = EXCLUDED.code,
                expires_at = EXCLUDED.expires_at,
                verified = EXCLUDED.verified",
        )
        .bind(&challenge.email)
        .bind(&challenge.code)
        .bind(challenge.expires_at)
        .bind(challenge.verified)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_challenge(&self, email: &str) -> Result<Option<OtpChallenge>, StoreError> {
        Ok(sqlx::query_as::<_, OtpChallenge>(
            "SELECT email, code, expires_at, verified FROM otp_challenges WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn consume_challenge(&self, email: &str, code: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM otp_challenges WHERE email = $1 AND code = $2")
            .bind(email)
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_challenge(&self, email: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM otp_challenges WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[rocket::async_trait]
impl TallyStore for PgStore {
    async fn increment(&self, position: &str, candidate: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO tallies (position, counts)
             VALUES ($1, jsonb_build_object($2::text, 1))
             ON CONFLICT (position) DO UPDATE SET
                counts = tallies.counts || jsonb_build_object(
                    $2::text,
                    COALESCE((tallies.counts ->> $2::text)::bigint, 0) + 1
                )",
        )
        .bind(position)
        .bind(candidate)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_tally(&self, position: &str) -> Result<TallyRecord, StoreError> {
        let counts = sqlx::query_scalar::<_, Json<BTreeMap<String, i64>>>(
            "SELECT counts FROM tallies WHERE position = $1",
        )
        .bind(position)
        .fetch_optional(&self.pool)
        .await?;

        let Some(Json(counts)) = counts else {
            return Ok(TallyRecord::empty(position));
        };

        let counts = counts
            .into_iter()
            .map(|(candidate, count)| {
                u64::try_from(count)
                    .map(|count| (candidate.clone(), count))
                    .map_err(|_| StoreError::Corrupt(format!("negative count for {candidate} in {position}")))
            })
            .collect::<Result<_, _>>()?;

        Ok(TallyRecord {
            position: position.to_string(),
            counts,
        })
    }

    async fn seed(&self, election: &ElectionConfig) -> Result<(), StoreError> {
        for position in &election.positions {
            let zeroed: BTreeMap<String, i64> = position.candidates.iter().map(|c| (c.id.clone(), 0)).collect();
            sqlx::query(
                "INSERT INTO tallies (position, counts) VALUES ($1, $2)
                 ON CONFLICT (position) DO NOTHING",
            )
            .bind(&position.id)
            .bind(Json(zeroed))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}
