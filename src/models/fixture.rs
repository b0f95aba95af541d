//! Fixture (a scheduled match between two teams) and the unpersisted FixtureSpec.

use crate::models::error::TournamentError;
use crate::models::team::TeamId;
use crate::models::tournament::TournamentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a fixture.
pub type FixtureId = Uuid;

/// Idempotency key of one generation request. A retry carries the same key.
pub type GenerationKey = Uuid;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

/// Pairing output: who plays whom, in which round, under which match number.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct FixtureSpec {
    pub round_number: u32,
    pub match_number: u32,
    pub team_1_id: TeamId,
    /// None for a bye.
    pub team_2_id: Option<TeamId>,
}

impl FixtureSpec {
    pub fn new(round_number: u32, match_number: u32, team_1_id: TeamId, team_2_id: TeamId) -> Self {
        Self {
            round_number,
            match_number,
            team_1_id,
            team_2_id: Some(team_2_id),
        }
    }

    pub fn bye(round_number: u32, match_number: u32, team_id: TeamId) -> Self {
        Self {
            round_number,
            match_number,
            team_1_id: team_id,
            team_2_id: None,
        }
    }

    pub fn is_bye(&self) -> bool {
        self.team_2_id.is_none()
    }
}

/// A persisted fixture row.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: FixtureId,
    pub tournament_id: TournamentId,
    pub round_number: u32,
    /// Unique per tournament, contiguous from 1.
    pub match_number: u32,
    pub team_1_id: TeamId,
    pub team_2_id: Option<TeamId>,
    /// None until played.
    pub team_1_score: Option<u32>,
    pub team_2_score: Option<u32>,
    pub winner_id: Option<TeamId>,
    pub status: FixtureStatus,
    pub venue: Option<String>,
    pub scheduled_datetime: Option<DateTime<Utc>>,
}

impl Fixture {
    /// Materialize a spec. A bye is born completed with the lone team as winner.
    pub fn from_spec(tournament_id: TournamentId, spec: FixtureSpec) -> Self {
        let (status, winner_id) = if spec.is_bye() {
            (FixtureStatus::Completed, Some(spec.team_1_id))
        } else {
            (FixtureStatus::Scheduled, None)
        };
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            round_number: spec.round_number,
            match_number: spec.match_number,
            team_1_id: spec.team_1_id,
            team_2_id: spec.team_2_id,
            team_1_score: None,
            team_2_score: None,
            winner_id,
            status,
            venue: None,
            scheduled_datetime: None,
        }
    }

    pub fn involves(&self, team_id: TeamId) -> bool {
        self.team_1_id == team_id || self.team_2_id == Some(team_id)
    }

    /// Record the final score. Higher score wins; a draw leaves `winner_id` empty and is only
    /// accepted when `allow_draw` is set.
    pub fn record_result(
        &mut self,
        team_1_score: u32,
        team_2_score: u32,
        allow_draw: bool,
    ) -> Result<(), TournamentError> {
        if self.status != FixtureStatus::Scheduled {
            return Err(TournamentError::InvalidState);
        }
        let Some(team_2_id) = self.team_2_id else {
            return Err(TournamentError::InvalidState);
        };
        let winner_id = match team_1_score.cmp(&team_2_score) {
            std::cmp::Ordering::Greater => Some(self.team_1_id),
            std::cmp::Ordering::Less => Some(team_2_id),
            std::cmp::Ordering::Equal if allow_draw => None,
            std::cmp::Ordering::Equal => {
                return Err(TournamentError::validation(
                    "knockout fixtures cannot end in a draw",
                ))
            }
        };
        self.team_1_score = Some(team_1_score);
        self.team_2_score = Some(team_2_score);
        self.winner_id = winner_id;
        self.status = FixtureStatus::Completed;
        Ok(())
    }
}
