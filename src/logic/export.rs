//! CSV export of a tournament's fixture list.

use crate::models::{Fixture, FixtureStatus, Team, TeamId, TournamentError};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Serialize)]
struct FixtureRow<'a> {
    match_number: u32,
    round_number: u32,
    team_1: &'a str,
    team_2: &'a str,
    venue: &'a str,
    scheduled_datetime: String,
    status: FixtureStatus,
    team_1_score: Option<u32>,
    team_2_score: Option<u32>,
    winner: &'a str,
}

/// One row per fixture, teams by name. A bye shows `BYE` as the second team.
pub fn fixtures_to_csv(fixtures: &[Fixture], teams: &[Team]) -> Result<String, TournamentError> {
    let names: HashMap<TeamId, &str> = teams
        .iter()
        .map(|t| (t.id, t.team_name.as_str()))
        .collect();
    let name = |id: TeamId| names.get(&id).copied().unwrap_or("?");

    let mut wtr = csv::Writer::from_writer(Vec::new());
    for f in fixtures {
        wtr.serialize(FixtureRow {
            match_number: f.match_number,
            round_number: f.round_number,
            team_1: name(f.team_1_id),
            team_2: f.team_2_id.map_or("BYE", name),
            venue: f.venue.as_deref().unwrap_or(""),
            scheduled_datetime: f
                .scheduled_datetime
                .map(|d| d.to_rfc3339())
                .unwrap_or_default(),
            status: f.status,
            team_1_score: f.team_1_score,
            team_2_score: f.team_2_score,
            winner: f.winner_id.map_or("", name),
        })
        .map_err(|e| TournamentError::Persistence(format!("csv export: {}", e)))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| TournamentError::Persistence(format!("csv export: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| TournamentError::Persistence(e.to_string()))
}
