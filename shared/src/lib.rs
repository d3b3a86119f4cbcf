pub mod error;
pub mod election;
pub mod models;
pub mod tally;
pub mod validation;
pub mod user_info;

pub use error::{ErrorCode, ErrorResponse};
pub use election::{CandidateConfig, ElectionConfig, ElectionConfigError, PositionConfig};
pub use models::*;
pub use validation::*;
pub use user_info::*;
pub use tally::{compute_shares, position_results};

#[cfg(test)]
mod tests;
