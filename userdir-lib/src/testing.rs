//! In-memory stand-in for the directory service, used by unit tests.

use crate::api::{ApiError, Resource};
use crate::model::{Gender, Profile, ProfileId, User, UserDraft, UserId};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) fn user(id: u64, username: &str) -> User {
    User {
        id: UserId(id),
        username: username.to_string(),
        phone: format!("98765{:05}", id),
        profile: None,
    }
}

pub(crate) fn profile(user_id: u64) -> Profile {
    Profile {
        id: ProfileId(user_id + 100),
        user_id: UserId(user_id),
        email: format!("user{}@host.com", user_id),
        gender: Gender::Other,
        address: "1 Main St".to_string(),
        pincode: "560001".to_string(),
        city: "Pune".to_string(),
        state: "Maharashtra".to_string(),
        country: "India".to_string(),
        user: None,
    }
}

#[derive(Default)]
pub(crate) struct MemoryUsers {
    users: Mutex<Vec<User>>,
    next_id: Mutex<u64>,
    fail_next: Mutex<Option<StatusCode>>,
    list_delays: Mutex<VecDeque<Duration>>,
    deleted: Mutex<Vec<UserId>>,
    calls: AtomicUsize,
}

impl MemoryUsers {
    pub(crate) fn with(users: Vec<User>) -> Self {
        let next_id = users.iter().map(|u| u.id.0).max().unwrap_or(0) + 1;
        Self {
            users: Mutex::new(users),
            next_id: Mutex::new(next_id),
            ..Default::default()
        }
    }

    /// The next call of any kind fails with `status`.
    pub(crate) fn fail_next(&self, status: StatusCode) {
        *self.fail_next.lock() = Some(status);
    }

    pub(crate) fn delay_next_list(&self, delay: Duration) {
        self.list_delays.lock().push_back(delay);
    }

    pub(crate) fn insert(&self, user: User) {
        self.users.lock().push(user);
    }

    pub(crate) fn deleted(&self) -> Vec<UserId> {
        self.deleted.lock().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_next.lock().take() {
            Some(status) => Err(ApiError::from_response(status, "")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Resource<User> for MemoryUsers {
    async fn list(&self) -> Result<Vec<User>, ApiError> {
        self.enter()?;
        let delay = self.list_delays.lock().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.users.lock().clone())
    }

    async fn get(&self, key: UserId) -> Result<User, ApiError> {
        self.enter()?;
        self.users
            .lock()
            .iter()
            .find(|u| u.id == key)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn create(&self, draft: &UserDraft) -> Result<User, ApiError> {
        self.enter()?;
        let mut next_id = self.next_id.lock();
        let user = User {
            id: UserId(*next_id),
            username: draft.username.clone(),
            phone: draft.phone.clone(),
            profile: None,
        };
        *next_id += 1;
        self.users.lock().push(user.clone());
        Ok(user)
    }

    async fn update(&self, key: UserId, draft: &UserDraft) -> Result<User, ApiError> {
        self.enter()?;
        let mut users = self.users.lock();
        let user = users
            .iter_mut()
            .find(|u| u.id == key)
            .ok_or(ApiError::NotFound)?;
        user.username = draft.username.clone();
        user.phone = draft.phone.clone();
        Ok(user.clone())
    }

    async fn delete(&self, key: UserId) -> Result<(), ApiError> {
        self.enter()?;
        let mut users = self.users.lock();
        let before = users.len();
        users.retain(|u| u.id != key);
        if users.len() == before {
            return Err(ApiError::NotFound);
        }
        self.deleted.lock().push(key);
        Ok(())
    }
}
