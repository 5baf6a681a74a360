//! Sequential, rate-limited geocoding of the latest reply's places.
//!
//! Only one run matters at a time: starting a run with [`GeocodeResolver::begin`]
//! supersedes every earlier one, and a superseded run never commits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::{GeocodeQuery, GeocodeSearch};
use crate::language::Language;
use crate::state::{PlaceReference, ResolvedPlace, UserFix};

/// Identifies one resolution run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunToken(u64);

impl RunToken {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Same places as the last committed run, nothing was looked up
    Unchanged,
    Resolved(Vec<ResolvedPlace>),
    /// A newer run started before this one finished
    Superseded,
}

pub struct GeocodeResolver {
    search: Arc<dyn GeocodeSearch>,
    spacing: Duration,
    generation: AtomicU64,
    last_dispatch: Mutex<Option<Instant>>,
    committed: Mutex<Vec<ResolvedPlace>>,
}

impl GeocodeResolver {
    pub fn new(search: Arc<dyn GeocodeSearch>, spacing: Duration) -> Self {
        Self {
            search,
            spacing,
            generation: AtomicU64::new(0),
            last_dispatch: Mutex::new(None),
            committed: Mutex::new(Vec::new()),
        }
    }

    /// Start a new run, superseding any run still in flight
    pub fn begin(&self) -> RunToken {
        RunToken(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RunToken) -> bool {
        self.generation.load(Ordering::SeqCst) == token.0
    }

    /// Places from the last committed run
    pub fn committed(&self) -> Vec<ResolvedPlace> {
        self.committed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Cheap identity check: same first title and same count as what is
    /// already on the map.
    pub fn matches_committed(&self, references: &[PlaceReference]) -> bool {
        let committed = self.committed.lock().unwrap_or_else(|e| e.into_inner());
        match (committed.first(), references.first()) {
            (Some(first), Some(reference)) => {
                first.title == reference.title && committed.len() == references.len()
            }
            _ => false,
        }
    }

    /// Geocode `references` one at a time, at least `spacing` apart.
    /// Places that fail or have no match are skipped.
    pub async fn resolve(
        &self,
        token: RunToken,
        references: &[PlaceReference],
        user_fix: Option<UserFix>,
        language: Language,
    ) -> Resolution {
        if references.is_empty() {
            return self.commit(token, Vec::new());
        }
        if self.matches_committed(references) {
            debug!("Places unchanged, skipping geocoding");
            return Resolution::Unchanged;
        }

        let mut places = Vec::with_capacity(references.len());
        for reference in references {
            if !self.is_current(token) {
                return Resolution::Superseded;
            }
            let query = GeocodeQuery::new(&reference.title, user_fix, language);
            if query.text.is_empty() {
                continue;
            }

            self.wait_for_slot().await;
            if !self.is_current(token) {
                return Resolution::Superseded;
            }

            match self.search.search(&query).await {
                Ok(Some(position)) => places.push(ResolvedPlace {
                    title: reference.title.clone(),
                    latitude: position.lat,
                    longitude: position.lon,
                }),
                Ok(None) => debug!("No match for {:?}", query.text),
                Err(e) => warn!("Geocoding {:?} failed: {:#}", query.text, e),
            }
        }

        self.commit(token, places)
    }

    fn commit(&self, token: RunToken, places: Vec<ResolvedPlace>) -> Resolution {
        if !self.is_current(token) {
            return Resolution::Superseded;
        }
        info!("Resolved {} place(s) for the map", places.len());
        let mut committed = self.committed.lock().unwrap_or_else(|e| e.into_inner());
        *committed = places.clone();
        Resolution::Resolved(places)
    }

    /// Reserve the next dispatch slot and sleep until it arrives. Slots are
    /// reserved under the lock so overlapping runs still keep their distance.
    async fn wait_for_slot(&self) {
        let slot = {
            let mut last = self.last_dispatch.lock().unwrap_or_else(|e| e.into_inner());
            let now = Instant::now();
            let slot = match *last {
                Some(previous) => (previous + self.spacing).max(now),
                None => now,
            };
            *last = Some(slot);
            slot
        };
        sleep_until(slot).await;
    }
}
