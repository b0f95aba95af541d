//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use sports_tournament_web::{
    Actor, ByePolicy, Contact, FixedClock, LocalStore, NewTeam, NewTournament, RetryPolicy, Team,
    Tournament, TournamentFormat, TournamentService,
};
use std::sync::Arc;
use uuid::Uuid;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: std::time::Duration::from_millis(1),
        max_backoff: std::time::Duration::from_millis(5),
        multiplier: 2.0,
    }
}

pub fn contact(name: &str) -> Contact {
    Contact {
        name: name.to_string(),
        email: Some(format!("{}@example.com", name.to_ascii_lowercase())),
        phone: None,
    }
}

pub fn new_team(name: &str) -> NewTeam {
    NewTeam {
        team_name: name.to_string(),
        contact: contact("Captain"),
    }
}

pub struct Harness {
    pub service: TournamentService<LocalStore>,
    pub clock: Arc<FixedClock>,
    pub organizer: Actor,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_bye_policy(ByePolicy::Exclude)
    }

    pub fn with_bye_policy(bye_policy: ByePolicy) -> Self {
        let clock = Arc::new(FixedClock::new(t0()));
        let service = TournamentService::new(LocalStore::in_memory())
            .with_clock(clock.clone())
            .with_retry(fast_retry())
            .with_bye_policy(bye_policy);
        Self {
            service,
            clock,
            organizer: Actor::new(Uuid::new_v4()),
        }
    }

    pub fn stranger(&self) -> Actor {
        Actor::new(Uuid::new_v4())
    }

    pub fn tournament(&self, format: TournamentFormat, teams_allowed: u32) -> Tournament {
        self.tournament_with_deadline(format, teams_allowed, None)
    }

    pub fn tournament_with_deadline(
        &self,
        format: TournamentFormat,
        teams_allowed: u32,
        registration_deadline: Option<DateTime<Utc>>,
    ) -> Tournament {
        self.service
            .create_tournament(
                self.organizer,
                NewTournament {
                    name: "Spring Cup".to_string(),
                    sport: "football".to_string(),
                    format,
                    teams_allowed,
                    registration_deadline,
                    venue: None,
                },
            )
            .unwrap()
    }

    /// Register one team, one minute after the previous registration.
    pub fn register(&self, tournament: &Tournament, name: &str) -> Team {
        self.clock.advance(Duration::minutes(1));
        self.service
            .register_team(tournament.id, new_team(name))
            .unwrap()
    }

    /// Register and approve teams in the given order.
    pub fn approved(&self, tournament: &Tournament, names: &[&str]) -> Vec<Team> {
        names
            .iter()
            .map(|name| {
                let team = self.register(tournament, name);
                self.service.approve_team(self.organizer, team.id).unwrap()
            })
            .collect()
    }

    /// Team names of each fixture's pairing, e.g. ("A", "B"); a bye shows as "-".
    pub fn pairing_names(&self, tournament: &Tournament) -> Vec<(String, String)> {
        let teams = self.service.list_teams(tournament.id, None).unwrap();
        let name = |id| {
            teams
                .iter()
                .find(|t| t.id == id)
                .map(|t| t.team_name.clone())
                .unwrap()
        };
        self.service
            .fixtures(tournament.id)
            .unwrap()
            .iter()
            .map(|f| {
                (
                    name(f.team_1_id),
                    f.team_2_id.map(name).unwrap_or_else(|| "-".to_string()),
                )
            })
            .collect()
    }
}
