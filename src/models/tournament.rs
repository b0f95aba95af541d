//! Tournament, its status enums, and the lifecycle transitions on it.

use crate::models::error::TournamentError;
use crate::models::fixture::GenerationKey;
use crate::models::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Competition format chosen by the organizer.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    #[default]
    Knockout,
    RoundRobin,
    League,
    Swiss,
}

impl TournamentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            TournamentFormat::Knockout => "knockout",
            TournamentFormat::RoundRobin => "round_robin",
            TournamentFormat::League => "league",
            TournamentFormat::Swiss => "swiss",
        }
    }
}

impl std::fmt::Display for TournamentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentFormat {
    type Err = TournamentError;

    /// Accepts the snake_case name plus the spellings people type ("round robin", "round-robin").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "knockout" | "knock_out" => Ok(TournamentFormat::Knockout),
            "round_robin" | "roundrobin" => Ok(TournamentFormat::RoundRobin),
            "league" => Ok(TournamentFormat::League),
            "swiss" => Ok(TournamentFormat::Swiss),
            _ => Err(TournamentError::validation(format!(
                "unknown tournament format '{}'",
                s.trim()
            ))),
        }
    }
}

/// How the final is played. Recorded with the fixtures; knockout advancement itself is not generated.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalsFormat {
    SingleMatch,
    BestOfThree,
    TwoLegs,
}

impl std::fmt::Display for FinalsFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FinalsFormat::SingleMatch => "single match",
            FinalsFormat::BestOfThree => "best of three",
            FinalsFormat::TwoLegs => "two legs",
        })
    }
}

/// Current phase of the tournament.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Teams register and get approved or rejected.
    #[default]
    RegistrationOpen,
    /// Fixture set persisted; play has not started.
    FixturesGenerated,
    /// Results are being recorded.
    Active,
    Completed,
    /// Terminal. Reason and timestamp are recorded on the tournament.
    Cancelled,
}

/// Guard against generating fixtures twice.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureGenerationStatus {
    #[default]
    Pending,
    Completed,
}

/// Organizer input for creating a tournament.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewTournament {
    pub name: String,
    pub sport: String,
    #[serde(default)]
    pub format: TournamentFormat,
    pub teams_allowed: u32,
    #[serde(default)]
    pub registration_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub venue: Option<String>,
}

/// A tournament row.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub sport: String,
    pub format: TournamentFormat,
    /// Capacity: pending plus approved teams may not exceed this.
    pub teams_allowed: u32,
    pub organizer_id: UserId,
    pub tournament_status: TournamentStatus,
    pub fixture_generation_status: FixtureGenerationStatus,
    pub registration_deadline: Option<DateTime<Utc>>,
    /// Default venue for generated fixtures.
    pub venue: Option<String>,
    pub finals_format: Option<FinalsFormat>,
    pub created_at: DateTime<Utc>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Key of the generation request whose fixtures are persisted.
    pub generation_key: Option<GenerationKey>,
    pub fixtures_generated_at: Option<DateTime<Utc>>,
}

impl Tournament {
    /// Validate organizer input and create a tournament in (registration_open, pending).
    pub fn new(
        organizer_id: UserId,
        input: NewTournament,
        now: DateTime<Utc>,
    ) -> Result<Self, TournamentError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(TournamentError::validation("tournament name must not be empty"));
        }
        let sport = input.sport.trim();
        if sport.is_empty() {
            return Err(TournamentError::validation("sport must not be empty"));
        }
        if input.teams_allowed < 1 {
            return Err(TournamentError::validation("teams_allowed must be at least 1"));
        }
        let venue = input
            .venue
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            sport: sport.to_string(),
            format: input.format,
            teams_allowed: input.teams_allowed,
            organizer_id,
            tournament_status: TournamentStatus::RegistrationOpen,
            fixture_generation_status: FixtureGenerationStatus::Pending,
            registration_deadline: input.registration_deadline,
            venue,
            finals_format: None,
            created_at: now,
            cancellation_reason: None,
            cancelled_at: None,
            generation_key: None,
            fixtures_generated_at: None,
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.tournament_status == TournamentStatus::Cancelled
    }

    pub fn ensure_not_cancelled(&self) -> Result<(), TournamentError> {
        if self.is_cancelled() {
            return Err(TournamentError::Cancelled);
        }
        Ok(())
    }

    /// New teams may join: not cancelled, still in registration, deadline not passed.
    pub fn ensure_registration_open(&self, now: DateTime<Utc>) -> Result<(), TournamentError> {
        self.ensure_not_cancelled()?;
        if self.tournament_status != TournamentStatus::RegistrationOpen {
            return Err(TournamentError::RegistrationClosed);
        }
        if matches!(self.registration_deadline, Some(deadline) if now > deadline) {
            return Err(TournamentError::RegistrationClosed);
        }
        Ok(())
    }

    /// Approvals, rejections and withdrawals are only meaningful before fixtures exist.
    pub fn ensure_roster_editable(&self) -> Result<(), TournamentError> {
        self.ensure_not_cancelled()?;
        if self.tournament_status != TournamentStatus::RegistrationOpen {
            return Err(TournamentError::InvalidState);
        }
        Ok(())
    }

    /// Status half of the generation guard. Team count and deadline are checked by the caller.
    pub fn check_generation_allowed(&self) -> Result<(), TournamentError> {
        self.ensure_not_cancelled()?;
        if self.fixture_generation_status != FixtureGenerationStatus::Pending
            || self.tournament_status != TournamentStatus::RegistrationOpen
        {
            return Err(TournamentError::InvalidState);
        }
        Ok(())
    }

    pub fn check_registration_closed(&self, now: DateTime<Utc>) -> Result<(), TournamentError> {
        match self.registration_deadline {
            Some(deadline) if now < deadline => {
                Err(TournamentError::RegistrationStillOpen { deadline })
            }
            _ => Ok(()),
        }
    }

    /// Compare-and-swap `pending -> completed` on the generation guard.
    /// Must run in the same transaction as the fixture insert.
    pub fn mark_fixtures_generated(
        &mut self,
        key: GenerationKey,
        now: DateTime<Utc>,
    ) -> Result<(), TournamentError> {
        self.check_generation_allowed()?;
        self.fixture_generation_status = FixtureGenerationStatus::Completed;
        self.tournament_status = TournamentStatus::FixturesGenerated;
        self.generation_key = Some(key);
        self.fixtures_generated_at = Some(now);
        Ok(())
    }

    /// Administrative undo of a generation: back to (registration_open, pending).
    pub fn reset_fixture_generation(&mut self) -> Result<(), TournamentError> {
        self.ensure_not_cancelled()?;
        if self.tournament_status != TournamentStatus::FixturesGenerated
            || self.fixture_generation_status != FixtureGenerationStatus::Completed
        {
            return Err(TournamentError::InvalidState);
        }
        self.tournament_status = TournamentStatus::RegistrationOpen;
        self.fixture_generation_status = FixtureGenerationStatus::Pending;
        self.generation_key = None;
        self.fixtures_generated_at = None;
        Ok(())
    }

    /// Cancel from any non-terminal state. Reason must not be blank.
    pub fn cancel(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), TournamentError> {
        self.ensure_not_cancelled()?;
        if self.tournament_status == TournamentStatus::Completed {
            return Err(TournamentError::InvalidState);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TournamentError::validation("cancellation reason must not be empty"));
        }
        self.tournament_status = TournamentStatus::Cancelled;
        self.cancellation_reason = Some(reason.to_string());
        self.cancelled_at = Some(now);
        Ok(())
    }

    /// FixturesGenerated -> Active.
    pub fn start(&mut self) -> Result<(), TournamentError> {
        self.ensure_not_cancelled()?;
        if self.tournament_status != TournamentStatus::FixturesGenerated {
            return Err(TournamentError::InvalidState);
        }
        self.tournament_status = TournamentStatus::Active;
        Ok(())
    }

    /// Active -> Completed. The caller checks that every fixture has a result.
    pub fn complete(&mut self) -> Result<(), TournamentError> {
        self.ensure_not_cancelled()?;
        if self.tournament_status != TournamentStatus::Active {
            return Err(TournamentError::InvalidState);
        }
        self.tournament_status = TournamentStatus::Completed;
        Ok(())
    }
}
