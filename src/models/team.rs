//! Team entries and their approval workflow.

use crate::models::error::TournamentError;
use crate::models::tournament::TournamentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a team entry (one team in one tournament).
pub type TeamId = Uuid;

/// Organizer decision on a team. Moves only `pending -> approved | rejected`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamStatus {
    #[default]
    Registered,
    Withdrawn,
}

/// How the organizer reaches the team.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Contact {
    fn normalized(self) -> Result<Self, TournamentError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(TournamentError::validation("contact name must not be empty"));
        }
        let email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        if let Some(email) = &email {
            let valid = email
                .split_once('@')
                .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
            if !valid {
                return Err(TournamentError::validation(format!(
                    "'{}' is not a valid email address",
                    email
                )));
            }
        }
        let phone = self
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        Ok(Self { name, email, phone })
    }
}

/// A team registered for a tournament.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub tournament_id: TournamentId,
    pub team_name: String,
    pub contact: Contact,
    pub approval_status: ApprovalStatus,
    pub status: TeamStatus,
    /// 1-based position in registration order; breaks ties between equal `created_at`.
    pub registration_number: u32,
    pub created_at: DateTime<Utc>,
    /// When the organizer approved or rejected the team.
    pub processed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Team {
    /// Create a pending, registered team. Name and contact are trimmed and validated.
    pub fn new(
        tournament_id: TournamentId,
        team_name: &str,
        contact: Contact,
        registration_number: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, TournamentError> {
        let team_name = team_name.trim();
        if team_name.is_empty() {
            return Err(TournamentError::validation("team name must not be empty"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            tournament_id,
            team_name: team_name.to_string(),
            contact: contact.normalized()?,
            approval_status: ApprovalStatus::Pending,
            status: TeamStatus::Registered,
            registration_number,
            created_at: now,
            processed_at: None,
            rejection_reason: None,
        })
    }

    /// Counts against capacity: still registered and not rejected.
    pub fn holds_place(&self) -> bool {
        self.status == TeamStatus::Registered
            && matches!(
                self.approval_status,
                ApprovalStatus::Pending | ApprovalStatus::Approved
            )
    }

    /// Eligible for pairing.
    pub fn is_approved(&self) -> bool {
        self.status == TeamStatus::Registered && self.approval_status == ApprovalStatus::Approved
    }

    fn ensure_pending(&self) -> Result<(), TournamentError> {
        if self.approval_status != ApprovalStatus::Pending {
            return Err(TournamentError::AlreadyProcessed {
                team_id: self.id,
                status: self.approval_status,
            });
        }
        Ok(())
    }

    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<(), TournamentError> {
        self.ensure_pending()?;
        if self.status == TeamStatus::Withdrawn {
            return Err(TournamentError::InvalidState);
        }
        self.approval_status = ApprovalStatus::Approved;
        self.processed_at = Some(now);
        Ok(())
    }

    pub fn reject(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), TournamentError> {
        self.ensure_pending()?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TournamentError::validation("rejection reason must not be empty"));
        }
        self.approval_status = ApprovalStatus::Rejected;
        self.rejection_reason = Some(reason.to_string());
        self.processed_at = Some(now);
        Ok(())
    }

    pub fn withdraw(&mut self) -> Result<(), TournamentError> {
        if self.status == TeamStatus::Withdrawn {
            return Err(TournamentError::InvalidState);
        }
        self.status = TeamStatus::Withdrawn;
        Ok(())
    }
}

/// Team registration input.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewTeam {
    pub team_name: String,
    pub contact: Contact,
}
