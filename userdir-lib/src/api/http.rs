use super::{ApiError, Resource};
use crate::config::ApiConfig;
use crate::model::{Profile, ProfileDraft, User, UserDraft, UserId};
use crate::validation::FieldErrors;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

/// REST adapter for the directory service.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = check(request.send().await?).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        check(request.send().await?).await?;
        Ok(())
    }
}

async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    let err = ApiError::from_response(status, &body);
    warn!(%status, %url, "request failed: {}", err);
    Err(err)
}

#[async_trait]
impl Resource<User> for HttpClient {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<User>, ApiError> {
        let users: Vec<User> = self.send(self.http.get(self.url("users"))).await?;
        debug!(count = users.len(), "fetched users");
        Ok(users)
    }

    #[instrument(skip(self))]
    async fn get(&self, key: UserId) -> Result<User, ApiError> {
        self.send(self.http.get(self.url(&format!("users/{}", key))))
            .await
    }

    #[instrument(skip(self, draft))]
    async fn create(&self, draft: &UserDraft) -> Result<User, ApiError> {
        let user: User = self
            .send(self.http.post(self.url("users")).json(draft))
            .await?;
        debug!(id = %user.id, "created user");
        Ok(user)
    }

    #[instrument(skip(self, draft))]
    async fn update(&self, key: UserId, draft: &UserDraft) -> Result<User, ApiError> {
        self.send(
            self.http
                .patch(self.url(&format!("users/{}", key)))
                .json(draft),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: UserId) -> Result<(), ApiError> {
        self.send_empty(self.http.delete(self.url(&format!("users/{}", key))))
            .await
    }
}

#[async_trait]
impl Resource<Profile> for HttpClient {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Profile>, ApiError> {
        self.send(self.http.get(self.url("profiles"))).await
    }

    /// A `null` body means the user has no profile.
    #[instrument(skip(self))]
    async fn get(&self, key: UserId) -> Result<Profile, ApiError> {
        let profile: Option<Profile> = self
            .send(self.http.get(self.url(&format!("profiles/{}", key))))
            .await?;
        profile.ok_or(ApiError::NotFound)
    }

    /// Refuses to create a second profile for a user that already has one.
    #[instrument(skip(self, draft))]
    async fn create(&self, draft: &ProfileDraft) -> Result<Profile, ApiError> {
        let Some(user_id) = draft.user_id() else {
            let mut fields = FieldErrors::new();
            fields.insert("userId", "Profile must belong to a user");
            return Err(ApiError::Validation {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: "profile draft has no owning user".to_string(),
                fields,
            });
        };

        match Resource::<Profile>::get(self, user_id).await {
            Ok(_) => {
                warn!(%user_id, "profile already exists");
                return Err(ApiError::Conflict);
            }
            Err(ApiError::NotFound) => {}
            Err(e) => return Err(e),
        }

        let profile: Profile = self
            .send(self.http.post(self.url("profiles")).json(draft))
            .await?;
        debug!(id = %profile.id, %user_id, "created profile");
        Ok(profile)
    }

    #[instrument(skip(self, draft))]
    async fn update(&self, key: UserId, draft: &ProfileDraft) -> Result<Profile, ApiError> {
        self.send(
            self.http
                .patch(self.url(&format!("profiles/{}", key)))
                .json(draft),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: UserId) -> Result<(), ApiError> {
        self.send_empty(self.http.delete(self.url(&format!("profiles/{}", key))))
            .await
    }
}
