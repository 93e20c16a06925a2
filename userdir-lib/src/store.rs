//! Client-side collection of entities kept in step with the service.
//!
//! Mutations reach the collection only after the service accepted them.
//! Every refresh and every mutation takes a new generation, so a list
//! response that started before a newer refresh or mutation is discarded.

use crate::api::{ApiError, Resource};
use crate::model::Entity;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No entry with id {0}")]
    NotFound(String),
    #[error("A request for id {0} is already in flight")]
    InFlight(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// The collection was replaced and now holds this many entries.
    Applied(usize),
    /// A newer refresh or mutation happened first; the response was dropped.
    Stale,
}

struct State<E: Entity> {
    entities: Vec<E>,
    generation: u64,
    in_flight: HashSet<E::Key>,
}

impl<E: Entity> State<E> {
    fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn position(&self, key: E::Key) -> Option<usize> {
        self.entities.iter().position(|e| e.key() == key)
    }
}

pub struct ListStore<E: Entity> {
    state: Arc<Mutex<State<E>>>,
}

impl<E: Entity> Clone for ListStore<E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<E: Entity> Default for ListStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> ListStore<E> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                entities: Vec::new(),
                generation: 0,
                in_flight: HashSet::new(),
            })),
        }
    }

    /// Replaces the collection with a fresh list fetch.
    ///
    /// On error the previous collection is left untouched.
    pub async fn refresh<R>(&self, api: &R) -> Result<Refresh, ApiError>
    where
        R: Resource<E> + ?Sized,
    {
        let token = self.state.lock().bump();
        let fetched = api.list().await;

        let mut state = self.state.lock();
        if state.generation != token {
            debug!(token, current = state.generation, "dropping stale list response");
            return Ok(Refresh::Stale);
        }

        let entities = fetched?;
        let count = entities.len();
        state.entities = entities;
        info!(count, "list refreshed");
        Ok(Refresh::Applied(count))
    }

    /// Deletes through `api`, then drops the entry locally.
    ///
    /// The entry stays visible until the service confirms the delete. When the
    /// service no longer knows the entity, the local copy is dropped as well.
    pub async fn remove<R>(&self, api: &R, key: E::Key) -> Result<E, StoreError>
    where
        R: Resource<E> + ?Sized,
    {
        if self.find_by_id(key).is_none() {
            return Err(StoreError::NotFound(key.to_string()));
        }

        let _guard = self.guard(key)?;

        match api.delete(key).await {
            Ok(()) => {
                let mut state = self.state.lock();
                state.bump();
                match state.position(key) {
                    Some(idx) => {
                        info!(%key, "removed");
                        Ok(state.entities.remove(idx))
                    }
                    None => Err(StoreError::NotFound(key.to_string())),
                }
            }
            Err(ApiError::NotFound) => {
                warn!(%key, "already gone on the server, dropping local copy");
                let mut state = self.state.lock();
                state.bump();
                state.entities.retain(|e| e.key() != key);
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Claims `key` for one mutating request. Released when the guard drops.
    pub fn guard(&self, key: E::Key) -> Result<InFlight<E>, StoreError> {
        let mut state = self.state.lock();
        if !state.in_flight.insert(key) {
            return Err(StoreError::InFlight(key.to_string()));
        }
        Ok(InFlight {
            state: self.state.clone(),
            key,
        })
    }

    pub fn is_in_flight(&self, key: E::Key) -> bool {
        self.state.lock().in_flight.contains(&key)
    }

    /// Inserts or replaces an entity the service just returned.
    ///
    /// A replacement keeps nested data the response omitted, see
    /// [`Entity::fill_from`]. Returns true when the entity was new to the
    /// collection.
    pub fn upsert(&self, mut entity: E) -> bool {
        let mut state = self.state.lock();
        state.bump();
        match state.position(entity.key()) {
            Some(idx) => {
                entity.fill_from(&state.entities[idx]);
                state.entities[idx] = entity;
                false
            }
            None => {
                state.entities.push(entity);
                true
            }
        }
    }

    /// Edits one entity in place. Returns false when `key` is unknown.
    pub fn patch(&self, key: E::Key, f: impl FnOnce(&mut E)) -> bool {
        let mut state = self.state.lock();
        match state.position(key) {
            Some(idx) => {
                f(&mut state.entities[idx]);
                state.bump();
                true
            }
            None => false,
        }
    }

    pub fn find_by_id(&self, key: E::Key) -> Option<E> {
        let state = self.state.lock();
        state.position(key).map(|idx| state.entities[idx].clone())
    }

    pub fn snapshot(&self) -> Vec<E> {
        self.state.lock().entities.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entities.is_empty()
    }

    /// Ignore whatever in-flight list requests return.
    pub fn abandon(&self) {
        self.state.lock().bump();
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }
}

/// Marks a key as having a mutating request in flight.
pub struct InFlight<E: Entity> {
    state: Arc<Mutex<State<E>>>,
    key: E::Key,
}

impl<E: Entity> InFlight<E> {
    pub fn key(&self) -> E::Key {
        self.key
    }
}

impl<E: Entity> Drop for InFlight<E> {
    fn drop(&mut self) {
        self.state.lock().in_flight.remove(&self.key);
    }
}
