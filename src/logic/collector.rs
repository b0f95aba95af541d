//! Conversational slot filling for fixture generation.
//!
//! The collector reads free text, fills five slots, and once they are known (or the user asks to
//! generate) hands a `GenerationRequest` to a caller-supplied function. It never touches the
//! store: the lifecycle re-validates everything it is asked to do.

use crate::logic::lifecycle::GenerationRequest;
use crate::logic::schedule::{ScheduleOptions, MAX_MATCH_MINUTES, MAX_REST_DAYS};
use crate::models::{FinalsFormat, GenerationKey, TournamentError, TournamentFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Oldest messages are dropped beyond this.
pub const MAX_TRANSCRIPT_LEN: usize = 100;
const MAX_VENUE_LEN: usize = 120;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    TournamentType,
    VenueDetails,
    MatchDuration,
    RestDays,
    FinalsFormat,
}

impl Slot {
    pub const ALL: [Slot; 5] = [
        Slot::TournamentType,
        Slot::VenueDetails,
        Slot::MatchDuration,
        Slot::RestDays,
        Slot::FinalsFormat,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Slot::TournamentType => "tournament type (knockout, round robin or league)",
            Slot::VenueDetails => "venue",
            Slot::MatchDuration => "match duration (e.g. 90 minutes)",
            Slot::RestDays => "rest days between rounds (e.g. 1 day rest)",
            Slot::FinalsFormat => "finals format (single match, best of three or two legs)",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorState {
    #[default]
    Collecting,
    /// Every slot is filled; the last generation attempt did not succeed.
    Ready,
    Generated,
}

/// Values gathered so far.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Slots {
    pub tournament_type: Option<TournamentFormat>,
    pub venue: Option<String>,
    pub match_duration_minutes: Option<u32>,
    pub rest_days: Option<u32>,
    pub finals_format: Option<FinalsFormat>,
}

impl Slots {
    fn is_filled(&self, slot: Slot) -> bool {
        match slot {
            Slot::TournamentType => self.tournament_type.is_some(),
            Slot::VenueDetails => self.venue.is_some(),
            Slot::MatchDuration => self.match_duration_minutes.is_some(),
            Slot::RestDays => self.rest_days.is_some(),
            Slot::FinalsFormat => self.finals_format.is_some(),
        }
    }

    pub fn missing(&self) -> Vec<Slot> {
        Slot::ALL
            .into_iter()
            .filter(|s| !self.is_filled(*s))
            .collect()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub speaker: Speaker,
    pub text: String,
}

/// One parsed slot value.
#[derive(Clone, Debug, PartialEq)]
enum SlotValue {
    TournamentType(TournamentFormat),
    Venue(String),
    MatchDuration(u32),
    RestDays(u32),
    FinalsFormat(FinalsFormat),
}

/// What one utterance contained.
#[derive(Debug, Default, PartialEq)]
struct Extraction {
    values: Vec<SlotValue>,
    /// Slot mentioned with a value outside its enumeration or range.
    rejected: Vec<(Slot, String)>,
    wants_generate: bool,
}

static FORMAT_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(knock[\s-]?out|round[\s-]?robin|league|swiss)\b").expect("valid regex")
});
/// Negation right before a format keyword: "not knockout", "instead of a league".
static FORMAT_NEGATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:\b(?:not|no|never|without|instead\s+of|rather\s+than)|\bdon'?t\s+want)\s+(?:an?\s+|the\s+)?$",
    )
    .expect("valid regex")
});
static FORMAT_EXPLICIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:format|tournament\s+type|type)\s*(?:is|:|=|-)\s*([a-z]+(?:[\s-][a-z]+)?)")
        .expect("valid regex")
});
static VENUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bvenue\s*(?:is|:|=|-)?|\b(?:play(?:s|ed|ing)?|held|hosted)\s+(?:at|in))\s+([^,.;!?\n]+)")
        .expect("valid regex")
});
static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,5})\s*(minutes?|mins?|hours?|hrs?)\b").expect("valid regex")
});
static REST_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})\s*(?:rest\s*days?|days?\s*(?:of\s+)?rest)\b").expect("valid regex")
});
static REST_LABELLED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\brest\s*days?\s*(?:is|are|:|=|-)?\s*(\d{1,3})\b").expect("valid regex")
});
static NO_REST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bno\s+rest(?:\s+days?)?\b").expect("valid regex"));
static FINALS_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(single\s+(?:match|final|game)|one[\s-]off\s+final|best\s+of\s+(?:three|3)|two[\s-]leg(?:s|ged)?|home\s+and\s+away)\b",
    )
    .expect("valid regex")
});
static FINALS_EXPLICIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bfinals?\s*(?:format)?\s*(?:is|:|=|-)\s*([a-z0-9]+(?:[\s-][a-z0-9]+){0,2})")
        .expect("valid regex")
});
static GENERATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(generate|create\s+(?:the\s+)?fixtures|make\s+(?:the\s+)?fixtures|go\s+ahead)\b")
        .expect("valid regex")
});

fn parse_finals(text: &str) -> Option<FinalsFormat> {
    let lower = text.to_ascii_lowercase();
    if lower.starts_with("single") || lower.starts_with("one") {
        Some(FinalsFormat::SingleMatch)
    } else if lower.starts_with("best") {
        Some(FinalsFormat::BestOfThree)
    } else if lower.starts_with("two") || lower.starts_with("home") {
        Some(FinalsFormat::TwoLegs)
    } else {
        None
    }
}

fn extract(utterance: &str) -> Extraction {
    let mut out = Extraction::default();

    let mut mentioned = false;
    let mut wanted: Vec<(TournamentFormat, &str)> = Vec::new();
    for m in FORMAT_KEYWORD.find_iter(utterance) {
        mentioned = true;
        if FORMAT_NEGATED.is_match(&utterance[..m.start()]) {
            continue;
        }
        match m.as_str().parse::<TournamentFormat>() {
            Ok(format) if !wanted.iter().any(|(f, _)| *f == format) => {
                wanted.push((format, m.as_str()))
            }
            Ok(_) => {}
            Err(_) => out.rejected.push((Slot::TournamentType, m.as_str().to_string())),
        }
    }
    match wanted.as_slice() {
        [(format, _)] => out.values.push(SlotValue::TournamentType(*format)),
        [] => {}
        several => {
            let names: Vec<&str> = several.iter().map(|(_, text)| *text).collect();
            out.rejected.push((Slot::TournamentType, names.join(" or ")));
        }
    }
    if !mentioned {
        if let Some(m) = FORMAT_EXPLICIT.captures(utterance) {
            out.rejected.push((Slot::TournamentType, m[1].trim().to_string()));
        }
    }

    if let Some(m) = VENUE.captures(utterance) {
        let venue = m[1].trim();
        if venue.is_empty() || venue.len() > MAX_VENUE_LEN {
            out.rejected.push((Slot::VenueDetails, venue.to_string()));
        } else {
            out.values.push(SlotValue::Venue(venue.to_string()));
        }
    }

    if let Some(m) = DURATION.captures(utterance) {
        let amount: u32 = m[1].parse().unwrap_or(0);
        let unit = m[2].to_ascii_lowercase();
        let minutes = if unit.starts_with('h') {
            amount.saturating_mul(60)
        } else {
            amount
        };
        if (1..=MAX_MATCH_MINUTES).contains(&minutes) {
            out.values.push(SlotValue::MatchDuration(minutes));
        } else {
            out.rejected.push((Slot::MatchDuration, m[0].to_string()));
        }
    }

    let rest = REST_COUNT
        .captures(utterance)
        .or_else(|| REST_LABELLED.captures(utterance))
        .map(|m| (m[1].parse::<u32>().unwrap_or(u32::MAX), m[0].to_string()));
    match rest {
        Some((days, _)) if days <= MAX_REST_DAYS => out.values.push(SlotValue::RestDays(days)),
        Some((_, text)) => out.rejected.push((Slot::RestDays, text)),
        None if NO_REST.is_match(utterance) => out.values.push(SlotValue::RestDays(0)),
        None => {}
    }

    if let Some(m) = FINALS_KEYWORD.captures(utterance) {
        if let Some(finals) = parse_finals(&m[1]) {
            out.values.push(SlotValue::FinalsFormat(finals));
        }
    } else if let Some(m) = FINALS_EXPLICIT.captures(utterance) {
        out.rejected.push((Slot::FinalsFormat, m[1].trim().to_string()));
    }

    out.wants_generate = GENERATE.is_match(utterance);
    out
}

/// Conversation state for one tournament. Serializable so callers can keep it per session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterCollector {
    state: CollectorState,
    slots: Slots,
    transcript: Vec<Message>,
    /// Idempotency key reused by every generation attempt of this conversation.
    request_key: GenerationKey,
}

impl Default for ParameterCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// The collector's answer to one utterance.
#[derive(Clone, Debug, Serialize)]
pub struct Reply {
    pub text: String,
    pub state: CollectorState,
    pub missing: Vec<Slot>,
    /// Fixture count when this utterance triggered a successful generation.
    pub generated: Option<usize>,
}

impl ParameterCollector {
    pub fn new() -> Self {
        Self {
            state: CollectorState::Collecting,
            slots: Slots::default(),
            transcript: Vec::new(),
            request_key: Uuid::new_v4(),
        }
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn slots(&self) -> &Slots {
        &self.slots
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn missing(&self) -> Vec<Slot> {
        self.slots.missing()
    }

    /// The request that would be sent now, if the tournament type is known.
    pub fn generation_request(&self) -> Option<GenerationRequest> {
        let format = self.slots.tournament_type?;
        Some(GenerationRequest {
            format: Some(format),
            key: self.request_key,
            schedule: ScheduleOptions {
                venue: self.slots.venue.clone(),
                starts_at: None,
                match_duration_minutes: self.slots.match_duration_minutes,
                rest_days: self.slots.rest_days,
                finals_format: self.slots.finals_format,
            },
        })
    }

    /// Drop all but the last `n` transcript messages.
    pub fn keep_recent(&mut self, n: usize) {
        let excess = self.transcript.len().saturating_sub(n);
        self.transcript.drain(..excess);
    }

    fn push(&mut self, speaker: Speaker, text: String) {
        self.transcript.push(Message { speaker, text });
        self.keep_recent(MAX_TRANSCRIPT_LEN);
    }

    fn apply(&mut self, value: SlotValue) -> String {
        match value {
            SlotValue::TournamentType(f) => {
                self.slots.tournament_type = Some(f);
                format!("format: {}", f)
            }
            SlotValue::Venue(v) => {
                let note = format!("venue: {}", v);
                self.slots.venue = Some(v);
                note
            }
            SlotValue::MatchDuration(m) => {
                self.slots.match_duration_minutes = Some(m);
                format!("match duration: {} minutes", m)
            }
            SlotValue::RestDays(d) => {
                self.slots.rest_days = Some(d);
                format!("rest days: {}", d)
            }
            SlotValue::FinalsFormat(f) => {
                self.slots.finals_format = Some(f);
                format!("finals: {}", f)
            }
        }
    }

    fn missing_text(missing: &[Slot]) -> String {
        let items: Vec<&str> = missing.iter().map(|s| s.label()).collect();
        format!("Still needed: {}.", items.join(", "))
    }

    /// Take one user utterance. When the slots are complete, or the user asks to generate and
    /// the tournament type is known, `invoke` is called with the request and must return the
    /// number of fixtures written.
    pub fn handle<F>(&mut self, utterance: &str, invoke: F) -> Reply
    where
        F: FnOnce(&GenerationRequest) -> Result<usize, TournamentError>,
    {
        self.push(Speaker::User, utterance.to_string());

        let mut generated = None;
        let text = if self.state == CollectorState::Generated {
            "Fixtures have already been generated for this tournament.".to_string()
        } else {
            let extraction = extract(utterance);
            let mut parts: Vec<String> = Vec::new();
            let notes: Vec<String> = extraction
                .values
                .into_iter()
                .map(|v| self.apply(v))
                .collect();
            if !notes.is_empty() {
                parts.push(format!("Got it ({}).", notes.join("; ")));
            }
            for (slot, value) in &extraction.rejected {
                parts.push(format!(
                    "I can't use '{}' as the {}.",
                    value,
                    slot.label()
                ));
            }

            let missing = self.slots.missing();
            let should_generate = missing.is_empty()
                || (extraction.wants_generate && self.slots.tournament_type.is_some());
            match self.generation_request() {
                Some(request) if should_generate => match invoke(&request) {
                    Ok(count) => {
                        self.state = CollectorState::Generated;
                        generated = Some(count);
                        parts.push(format!("Generated {} fixture(s).", count));
                    }
                    Err(e) => {
                        self.state = if missing.is_empty() {
                            CollectorState::Ready
                        } else {
                            CollectorState::Collecting
                        };
                        parts.push(format!("Could not generate fixtures: {}.", e));
                    }
                },
                _ => {
                    self.state = if missing.is_empty() {
                        CollectorState::Ready
                    } else {
                        CollectorState::Collecting
                    };
                    parts.push(Self::missing_text(&missing));
                }
            }
            parts.join(" ")
        };

        self.push(Speaker::Assistant, text.clone());
        Reply {
            text,
            state: self.state,
            missing: self.slots.missing(),
            generated,
        }
    }
}
