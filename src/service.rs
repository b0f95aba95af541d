//! TournamentService: the collaborators every core operation needs, shared by the registry and
//! the lifecycle. Per-request state (the acting user) is passed into each call.

use crate::logic::ByePolicy;
use crate::models::{Fixture, Tournament, TournamentError, TournamentId, UserId};
use crate::store::{RetryPolicy, Store, StoreTx};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Source of "now" for deadlines and timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut t) = self.0.lock() {
            *t = now;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut t) = self.0.lock() {
            *t += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.0.lock() {
            Ok(t) => *t,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Identity collaborator: may this user act as organizer of this tournament?
pub trait OrganizerCheck: Send + Sync {
    fn is_organizer(&self, tournament: &Tournament, user_id: UserId) -> bool;
}

/// The user who created a tournament is its only organizer.
#[derive(Clone, Copy, Debug, Default)]
pub struct CreatorIsOrganizer;

impl OrganizerCheck for CreatorIsOrganizer {
    fn is_organizer(&self, tournament: &Tournament, user_id: UserId) -> bool {
        tournament.organizer_id == user_id
    }
}

/// The user on whose behalf a call is made.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
}

impl Actor {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

/// Tournament core over a store `S`.
pub struct TournamentService<S> {
    store: S,
    organizers: Box<dyn OrganizerCheck>,
    clock: Box<dyn Clock>,
    retry: RetryPolicy,
    bye_policy: ByePolicy,
}

impl<S: Store> TournamentService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            organizers: Box::new(CreatorIsOrganizer),
            clock: Box::new(SystemClock),
            retry: RetryPolicy::default(),
            bye_policy: ByePolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_organizers(mut self, organizers: impl OrganizerCheck + 'static) -> Self {
        self.organizers = Box::new(organizers);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_bye_policy(mut self, bye_policy: ByePolicy) -> Self {
        self.bye_policy = bye_policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bye_policy(&self) -> ByePolicy {
        self.bye_policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn authorize(
        &self,
        tournament: &Tournament,
        actor: Actor,
    ) -> Result<(), TournamentError> {
        if !self.organizers.is_organizer(tournament, actor.user_id) {
            log::warn!(
                "user {} denied organizer action on tournament {}",
                actor.user_id,
                tournament.id
            );
            return Err(TournamentError::Unauthorized {
                user_id: actor.user_id,
            });
        }
        Ok(())
    }

    /// Run `f` in a transaction, retrying store failures that left nothing written. A commit
    /// with an unknown outcome is returned to the caller, since running `f` again against the
    /// committed state would report a guard error for a write that succeeded.
    pub(crate) fn write<T, F>(&self, what: &str, mut f: F) -> Result<T, TournamentError>
    where
        F: FnMut(&mut dyn StoreTx) -> Result<T, TournamentError>,
    {
        self.retry.run_if(what, TournamentError::is_retry_safe, || {
            self.store.transaction(|tx| f(tx))
        })
    }

    /// Like `write`, for operations that recognise their own committed result (fixture
    /// generation replays by key), so unknown commits are retried too.
    pub(crate) fn write_idempotent<T, F>(&self, what: &str, mut f: F) -> Result<T, TournamentError>
    where
        F: FnMut(&mut dyn StoreTx) -> Result<T, TournamentError>,
    {
        self.retry
            .run(what, || self.store.transaction(|tx| f(tx)))
    }

    pub fn tournament(&self, id: TournamentId) -> Result<Tournament, TournamentError> {
        self.store.read(|r| r.tournament(id))
    }

    /// Fixture set of a tournament, by match number. Empty until generation commits.
    pub fn fixtures(&self, id: TournamentId) -> Result<Vec<Fixture>, TournamentError> {
        self.store.read(|r| {
            r.tournament(id)?;
            r.fixtures(id)
        })
    }
}
