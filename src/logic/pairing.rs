//! Pairing: turn an ordered list of approved teams into fixture specs.
//!
//! Everything here is pure. The same input order always yields the same output, so the caller
//! owns determinism by passing teams in registration order.

use crate::models::{FixtureSpec, TeamId, TournamentError, TournamentFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Every pairing of one generation event belongs to the first phase.
pub const FIRST_ROUND: u32 = 1;

/// What happens to the trailing team when a knockout round has an odd team count.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByePolicy {
    /// The last team sits out round 1. Reported in `Pairings::bye`, no fixture row.
    #[default]
    Exclude,
    /// The last team gets a bye fixture (no opponent) that counts as a win.
    AutoAdvance,
    /// Odd team counts are refused with `OddTeamCount`.
    Reject,
}

impl FromStr for ByePolicy {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclude" => Ok(ByePolicy::Exclude),
            "auto_advance" | "auto-advance" => Ok(ByePolicy::AutoAdvance),
            "reject" => Ok(ByePolicy::Reject),
            other => Err(TournamentError::Validation(format!(
                "unknown bye policy '{}'",
                other
            ))),
        }
    }
}

/// Result of a pairing run.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Pairings {
    /// Match numbers are contiguous from 1 in this order.
    pub fixtures: Vec<FixtureSpec>,
    /// Team left without an opponent (odd knockout count).
    pub bye: Option<TeamId>,
}

fn check_roster(teams: &[TeamId]) -> Result<(), TournamentError> {
    if teams.len() < 2 {
        return Err(TournamentError::InsufficientTeams {
            approved: teams.len(),
        });
    }
    let mut seen = HashSet::with_capacity(teams.len());
    if !teams.iter().all(|id| seen.insert(*id)) {
        return Err(TournamentError::validation("team listed twice in roster"));
    }
    Ok(())
}

/// Every unordered pair `(teams[i], teams[j])` with `i < j`, in lexicographic order of `(i, j)`.
///
/// All fixtures are round 1: round-robin is one phase containing every pairing. Calendar
/// spreading is the scheduler's concern, not the pairing's.
pub fn generate_round_robin(teams: &[TeamId]) -> Result<Pairings, TournamentError> {
    check_roster(teams)?;
    let n = teams.len();
    let mut fixtures = Vec::with_capacity(n * (n - 1) / 2);
    for (i, &home) in teams.iter().enumerate() {
        for &away in &teams[i + 1..] {
            let match_number = fixtures.len() as u32 + 1;
            fixtures.push(FixtureSpec::new(FIRST_ROUND, match_number, home, away));
        }
    }
    log::debug!("round robin: {} teams -> {} fixtures", n, fixtures.len());
    Ok(Pairings { fixtures, bye: None })
}

/// First knockout round: `(teams[0], teams[1]), (teams[2], teams[3]), ...`.
///
/// With an odd count the last team is the bye; what that means is decided by `bye_policy`.
pub fn generate_knockout_first_round(
    teams: &[TeamId],
    bye_policy: ByePolicy,
) -> Result<Pairings, TournamentError> {
    check_roster(teams)?;
    let mut fixtures: Vec<FixtureSpec> = teams
        .chunks_exact(2)
        .zip(1u32..)
        .map(|(pair, match_number)| FixtureSpec::new(FIRST_ROUND, match_number, pair[0], pair[1]))
        .collect();

    let bye = teams.chunks_exact(2).remainder().first().copied();
    if let Some(bye_team) = bye {
        match bye_policy {
            ByePolicy::Exclude => {}
            ByePolicy::AutoAdvance => {
                let match_number = fixtures.len() as u32 + 1;
                fixtures.push(FixtureSpec::bye(FIRST_ROUND, match_number, bye_team));
            }
            ByePolicy::Reject => return Err(TournamentError::OddTeamCount(teams.len())),
        }
        log::debug!("knockout: team {} has a bye ({:?})", bye_team, bye_policy);
    }
    Ok(Pairings { fixtures, bye })
}

/// Pick the pairing scheme for a format. Round-robin and league share one scheme.
pub fn generate_for_format(
    format: TournamentFormat,
    teams: &[TeamId],
    bye_policy: ByePolicy,
) -> Result<Pairings, TournamentError> {
    match format {
        TournamentFormat::RoundRobin | TournamentFormat::League => generate_round_robin(teams),
        TournamentFormat::Knockout => generate_knockout_first_round(teams, bye_policy),
        TournamentFormat::Swiss => Err(TournamentError::UnsupportedFormat(format)),
    }
}
