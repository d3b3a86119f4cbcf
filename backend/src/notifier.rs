use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use shared::models::{BatchSummary, VoterStats};
use crate::mailer::{credential_email, Mailer};
use crate::store::{StoreError, VoterStore};

/// Emails credentials to voters who registered without OTP.
pub struct CredentialNotifier {
    voters: Arc<dyn VoterStore>,
    mailer: Arc<dyn Mailer>,
    vote_url: Option<String>,
    max_consecutive_failures: usize,
    send_delay: Duration,
}

impl CredentialNotifier {
    pub fn new(
        voters: Arc<dyn VoterStore>,
        mailer: Arc<dyn Mailer>,
        vote_url: Option<String>,
        max_consecutive_failures: usize,
        send_delay: Duration,
    ) -> Self {
        Self {
            voters,
            mailer,
            vote_url,
            max_consecutive_failures,
            send_delay,
        }
    }

    /// Sends every pending credential once. A voter is marked only after its
    /// send succeeded, so a rerun picks up exactly the failures. A send that
    /// went out but could not be marked is reported as a failure and may be
    /// repeated next run. The run stops early once consecutive failures
    /// exceed the configured limit.
    pub async fn send_pending(&self) -> Result<BatchSummary, StoreError> {
        let pending = self.voters.pending_emails().await?;
        info!("📬 {} voters awaiting their voting code", pending.len());

        let mut summary = BatchSummary::default();
        let mut consecutive_failures = 0;

        for voter in pending {
            let message = credential_email(&voter, self.vote_url.as_deref());

            let outcome = match self.mailer.send(&message).await {
                Ok(()) => self.voters
                    .mark_email_sent(&voter.email)
                    .await
                    .map_err(|e| format!("sent but not marked: {}", e)),
                Err(e) => Err(e.to_string()),
            };

            match outcome {
                Ok(()) => {
                    summary.sent_count += 1;
                    consecutive_failures = 0;
                    if !self.send_delay.is_zero() {
                        tokio::time::sleep(self.send_delay).await;
                    }
                }
                Err(reason) => {
                    error!("Voting code for {} failed: {}", voter.email, reason);
                    summary.error_count += 1;
                    summary.errors.push(format!("{}: {}", voter.email, reason));
                    consecutive_failures += 1;

                    if consecutive_failures > self.max_consecutive_failures {
                        warn!("Too many consecutive failures ({}), stopping the batch", consecutive_failures);
                        summary.aborted = true;
                        break;
                    }
                }
            }
        }

        info!(
            "✓ Voting code batch finished: {} sent, {} failed{}",
            summary.sent_count,
            summary.error_count,
            if summary.aborted { " (aborted)" } else { "" }
        );
        Ok(summary)
    }

    pub async fn stats(&self) -> Result<VoterStats, StoreError> {
        self.voters.stats().await
    }
}
