//! Assign venue and kick-off times to freshly paired fixtures.
//!
//! Times come only from what the caller supplies; nothing here reads the wall clock.

use crate::models::{FinalsFormat, Fixture, TournamentError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Match length used when a start time is given without a duration.
pub const DEFAULT_MATCH_MINUTES: u32 = 60;
/// Longest accepted match slot (one day).
pub const MAX_MATCH_MINUTES: u32 = 24 * 60;
pub const MAX_REST_DAYS: u32 = 30;

/// Scheduling preferences attached to a generation request.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOptions {
    #[serde(default)]
    pub venue: Option<String>,
    /// First kick-off. Without it fixtures stay unscheduled.
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub match_duration_minutes: Option<u32>,
    /// Whole days between the last match of a round and the first of the next.
    #[serde(default)]
    pub rest_days: Option<u32>,
    #[serde(default)]
    pub finals_format: Option<FinalsFormat>,
}

impl ScheduleOptions {
    pub fn validate(&self) -> Result<(), TournamentError> {
        if let Some(minutes) = self.match_duration_minutes {
            if minutes == 0 || minutes > MAX_MATCH_MINUTES {
                return Err(TournamentError::Validation(format!(
                    "match duration must be between 1 and {} minutes",
                    MAX_MATCH_MINUTES
                )));
            }
        }
        if matches!(self.rest_days, Some(days) if days > MAX_REST_DAYS) {
            return Err(TournamentError::Validation(format!(
                "rest days must be at most {}",
                MAX_REST_DAYS
            )));
        }
        if matches!(&self.venue, Some(v) if v.trim().is_empty()) {
            return Err(TournamentError::validation("venue must not be blank"));
        }
        Ok(())
    }
}

/// Fill `venue` and `scheduled_datetime` on `fixtures`.
///
/// Within a round, matches are back to back in match-number order. Round `r` starts
/// `(r - 1) * (1 + rest_days)` days after `starts_at`. Byes get neither venue nor time.
pub fn apply_schedule(
    fixtures: &mut [Fixture],
    options: &ScheduleOptions,
    default_venue: Option<&str>,
) -> Result<(), TournamentError> {
    options.validate()?;
    let venue = options
        .venue
        .as_deref()
        .map(str::trim)
        .or(default_venue)
        .map(str::to_string);
    let slot = Duration::minutes(
        options
            .match_duration_minutes
            .unwrap_or(DEFAULT_MATCH_MINUTES)
            .into(),
    );
    let round_gap_days = i64::from(options.rest_days.unwrap_or(0)) + 1;

    fixtures.sort_by_key(|f| (f.round_number, f.match_number));
    let mut current_round = None;
    let mut index_in_round: i32 = 0;
    for fixture in fixtures.iter_mut().filter(|f| f.team_2_id.is_some()) {
        if current_round != Some(fixture.round_number) {
            current_round = Some(fixture.round_number);
            index_in_round = 0;
        }
        fixture.venue = venue.clone();
        fixture.scheduled_datetime = options.starts_at.map(|start| {
            let round_offset =
                Duration::days(i64::from(fixture.round_number.saturating_sub(1)) * round_gap_days);
            start + round_offset + slot * index_in_round
        });
        index_in_round += 1;
    }
    Ok(())
}
