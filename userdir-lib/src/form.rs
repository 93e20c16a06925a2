//! Draft-holding form bound to one entity type.
//!
//! A controller owns nothing but its draft and the errors of the last
//! submission. Dropping it discards the draft.

use crate::api::{ApiError, Resource};
use crate::model::{Draft, Entity};
use crate::store::{ListStore, StoreError};
use crate::validation::FieldErrors;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode<K> {
    Create,
    Edit(K),
}

#[derive(Debug)]
pub enum Submission<E> {
    /// The service accepted the draft.
    Committed(E),
    /// Validation failed and nothing was sent.
    Invalid(FieldErrors),
    /// The request failed. The draft is unchanged and can be resubmitted.
    Failed(ApiError),
}

impl<E> Submission<E> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Submission::Committed(_))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown form field {0:?}")]
pub struct UnknownField(pub String);

pub struct FormController<E: Entity> {
    mode: Mode<E::Key>,
    draft: E::Draft,
    errors: FieldErrors,
}

impl<E: Entity> FormController<E> {
    pub fn create() -> Self {
        Self::create_with(E::Draft::default())
    }

    /// Create mode with some fields fixed up front, like a profile's owner.
    pub fn create_with(draft: E::Draft) -> Self {
        Self {
            mode: Mode::Create,
            draft,
            errors: FieldErrors::new(),
        }
    }

    pub fn edit(entity: &E) -> Self {
        Self {
            mode: Mode::Edit(entity.key()),
            draft: entity.to_draft(),
            errors: FieldErrors::new(),
        }
    }

    /// Edit mode for the entity `api` currently has under `key`.
    pub async fn fetch<R>(api: &R, key: E::Key) -> Result<Self, ApiError>
    where
        R: Resource<E> + ?Sized,
    {
        let entity = api.get(key).await?;
        Ok(Self::edit(&entity))
    }

    /// Replaces the draft, e.g. with values fetched for editing.
    pub fn load(&mut self, initial: E::Draft) {
        self.draft = initial;
        self.errors.clear();
    }

    pub fn mode(&self) -> Mode<E::Key> {
        self.mode
    }

    pub fn draft(&self) -> &E::Draft {
        &self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field)
    }

    pub fn value(&self, field: &str) -> Option<&str> {
        self.draft.value(field)
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) -> Result<(), UnknownField> {
        if self.draft.set(field, value.into()) {
            Ok(())
        } else {
            Err(UnknownField(field.to_string()))
        }
    }

    /// Inline check of a value before it is stored in the draft.
    pub fn check_field(field: &str, value: &str) -> Result<(), &'static str> {
        E::Draft::rules().validate_field(field, value)
    }

    /// Validates and, only when every field passes, sends the whole draft.
    pub async fn submit<R>(&mut self, api: &R) -> Submission<E>
    where
        R: Resource<E> + ?Sized,
    {
        self.errors.clear();

        if let Err(errors) = E::Draft::rules().validate(&self.draft) {
            debug!(count = errors.len(), "draft failed validation");
            self.errors = errors.clone();
            return Submission::Invalid(errors);
        }

        let result = match self.mode {
            Mode::Create => api.create(&self.draft).await,
            Mode::Edit(key) => api.update(key, &self.draft).await,
        };

        match result {
            Ok(entity) => {
                info!(key = %entity.key(), "draft committed");
                Submission::Committed(entity)
            }
            Err(e) => {
                warn!("submission failed: {}", e);
                if let Some(fields) = e.field_errors() {
                    self.errors.extend(fields.clone());
                }
                Submission::Failed(e)
            }
        }
    }

    /// Submits and patches `store` with the committed entity.
    ///
    /// An edit holds the store's in-flight guard for its key while the
    /// request runs, so a second submit or delete of the same key is refused.
    pub async fn submit_into<R>(
        &mut self,
        api: &R,
        store: &ListStore<E>,
    ) -> Result<Submission<E>, StoreError>
    where
        R: Resource<E> + ?Sized,
    {
        let _guard = match self.mode {
            Mode::Edit(key) => Some(store.guard(key)?),
            Mode::Create => None,
        };

        let submission = self.submit(api).await;
        if let Submission::Committed(entity) = &submission {
            store.upsert(entity.clone());
        }
        Ok(submission)
    }
}
