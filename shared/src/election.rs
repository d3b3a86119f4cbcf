//! Immutable definition of one election run: its contested positions and
//! the candidates standing for each, in display order.

use serde::{Serialize, Deserialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::models::PositionId;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ElectionConfigError {
    #[error("Election defines no positions")]
    NoPositions,
    #[error("Position {0} has no candidates")]
    NoCandidates(String),
    #[error("Duplicate position: {0}")]
    DuplicatePosition(String),
    #[error("Duplicate candidate {candidate} in position {position}")]
    DuplicateCandidate { position: String, candidate: String },
    #[error("Empty identifier in election definition")]
    EmptyId,
    #[error("Malformed election definition: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateConfig {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionConfig {
    pub id: PositionId,
    pub title: String,
    pub candidates: Vec<CandidateConfig>,
}

impl PositionConfig {
    pub fn candidate(&self, id: &str) -> Option<&CandidateConfig> {
        self.candidates.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElectionConfig {
    pub version: u32,
    pub title: String,
    pub positions: Vec<PositionConfig>,
}

impl ElectionConfig {
    pub fn from_json(raw: &str) -> Result<Self, ElectionConfigError> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| ElectionConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ElectionConfigError> {
        if self.positions.is_empty() {
            return Err(ElectionConfigError::NoPositions);
        }

        let mut seen_positions = HashSet::new();
        for position in &self.positions {
            if position.id.trim().is_empty() {
                return Err(ElectionConfigError::EmptyId);
            }
            if !seen_positions.insert(position.id.as_str()) {
                return Err(ElectionConfigError::DuplicatePosition(position.id.clone()));
            }
            if position.candidates.is_empty() {
                return Err(ElectionConfigError::NoCandidates(position.id.clone()));
            }

            let mut seen_candidates = HashSet::new();
            for candidate in &position.candidates {
                if candidate.id.trim().is_empty() {
                    return Err(ElectionConfigError::EmptyId);
                }
                if !seen_candidates.insert(candidate.id.as_str()) {
                    return Err(ElectionConfigError::DuplicateCandidate {
                        position: position.id.clone(),
                        candidate: candidate.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn position(&self, id: &str) -> Option<&PositionConfig> {
        self.positions.iter().find(|p| p.id == id)
    }

    pub fn position_ids(&self) -> impl Iterator<Item = &str> {
        self.positions.iter().map(|p| p.id.as_str())
    }
}
