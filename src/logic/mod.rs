//! Tournament business logic: pairing, registration, lifecycle, scheduling, conversation.

pub mod collector;
mod export;
mod lifecycle;
pub mod pairing;
mod registry;
mod schedule;

pub use collector::{CollectorState, ParameterCollector, Reply, Slot, Slots};
pub use export::fixtures_to_csv;
pub use lifecycle::{GenerationOutcome, GenerationRequest};
pub use pairing::{
    generate_for_format, generate_knockout_first_round, generate_round_robin, ByePolicy, Pairings,
};
pub use schedule::{apply_schedule, ScheduleOptions, DEFAULT_MATCH_MINUTES};
