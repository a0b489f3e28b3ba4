//! In-memory registry of running attempts.
//!
//! Each attempt sits behind its own mutex so one action at a time mutates it;
//! the map lock is only held to look entries up. Attempts nobody touched for
//! the idle TTL are dropped, lazily on access and by the periodic sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::attempt::Attempt;

pub type SharedAttempt = Arc<Mutex<Attempt>>;

struct Entry {
    user_id: String,
    attempt: SharedAttempt,
    last_active: Instant,
}

#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<RwLock<HashMap<Uuid, Entry>>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl,
        }
    }

    pub async fn insert(&self, attempt: Attempt) -> SharedAttempt {
        self.evict_idle().await;

        let id = attempt.id;
        let entry = Entry {
            user_id: attempt.user_id.clone(),
            attempt: Arc::new(Mutex::new(attempt)),
            last_active: Instant::now(),
        };
        let shared = entry.attempt.clone();
        self.entries.write().await.insert(id, entry);
        debug!("Session {id} registered");
        shared
    }

    /// The attempt if it exists, is still live and belongs to `user_id`.
    /// A successful lookup counts as activity.
    pub async fn get(&self, id: Uuid, user_id: &str) -> Result<SharedAttempt, AppError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let not_found = || AppError::NotFound(format!("Session {id} not found"));

        let (expired, owned) = match entries.get(&id) {
            Some(entry) => (
                now.saturating_duration_since(entry.last_active) >= self.idle_ttl,
                entry.user_id == user_id,
            ),
            None => return Err(not_found()),
        };
        if expired {
            entries.remove(&id);
            info!("Session {id} expired after being idle");
            return Err(not_found());
        }
        if !owned {
            return Err(AppError::Forbidden);
        }

        let entry = entries.get_mut(&id).ok_or_else(not_found)?;
        entry.last_active = now;
        Ok(entry.attempt.clone())
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.entries.write().await.remove(&id).is_some();
        if removed {
            debug!("Session {id} discarded");
        }
        removed
    }

    /// Drops every attempt idle for at least the TTL; returns how many went.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.last_active) < self.idle_ttl);
        let evicted = before - entries.len();
        if evicted > 0 {
            info!("Evicted {evicted} idle sessions ({} active)", entries.len());
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Runs `evict_idle` every `period` for as long as the process lives.
pub fn spawn_sweeper(store: SessionStore, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(period);
        ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            store.evict_idle().await;
        }
    })
}
