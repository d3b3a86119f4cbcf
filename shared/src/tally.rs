use crate::election::PositionConfig;
use crate::models::{CandidateShare, PositionResults, TallyRecord};

/// Share of each configured candidate in one position, in configured order.
///
/// The denominator is every count stored for the position, so votes for a
/// candidate that was later dropped from the configuration still dilute the
/// others. A position with no votes yields zero shares.
pub fn compute_shares(position: &PositionConfig, tally: &TallyRecord) -> Vec<CandidateShare> {
    let total = tally.total();

    position
        .candidates
        .iter()
        .map(|candidate| {
            let count = tally.count(&candidate.id);
            let share = if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            };
            CandidateShare {
                candidate_id: candidate.id.clone(),
                name: candidate.name.clone(),
                count,
                share,
                percentage: as_percentage(share),
            }
        })
        .collect()
}

pub fn position_results(position: &PositionConfig, tally: &TallyRecord) -> PositionResults {
    PositionResults {
        position: position.id.clone(),
        title: position.title.clone(),
        total_votes: tally.total(),
        candidates: compute_shares(position, tally),
    }
}

/// Rounds a share to a one-decimal percentage for display.
pub fn as_percentage(share: f64) -> f64 {
    (share * 1000.0).round() / 10.0
}
