//! Sports tournament core: team registration and approval, deterministic fixture generation,
//! and the tournament lifecycle, with an actix-web front end in `src/bin/web.rs`.

pub mod config;
pub mod logic;
pub mod models;
pub mod service;
pub mod store;

pub use config::Config;
pub use logic::{
    fixtures_to_csv, generate_for_format, generate_knockout_first_round, generate_round_robin,
    ByePolicy, CollectorState, GenerationOutcome, GenerationRequest, Pairings,
    ParameterCollector, Reply, ScheduleOptions, Slot,
};
pub use models::{
    ApprovalStatus, Contact, ErrorKind, FinalsFormat, Fixture, FixtureGenerationStatus,
    FixtureId, FixtureSpec, FixtureStatus, GenerationKey, NewTeam, NewTournament, Team, TeamId,
    TeamStatus, Tournament, TournamentError, TournamentFormat, TournamentId, TournamentStatus,
    UserId,
};
pub use service::{
    Actor, Clock, CreatorIsOrganizer, FixedClock, OrganizerCheck, SystemClock, TournamentService,
};
pub use store::{LocalStore, RetryPolicy, Store};
