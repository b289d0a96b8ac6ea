//! Typed wrapper over the REST API.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{header::AUTHORIZATION, Client, RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::forms::{validate_account, validate_pollution};
use crate::error::MessageResponse;
use crate::pollutions::repo_types::PollutionType;
use crate::users::repo_types::Role;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid form: {0}")]
    Validation(String),

    #[error("login response carried no bearer token")]
    MissingToken,
}

/// Pollution as returned by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmittedPollution {
    pub id: i64,
    pub titre: String,
    pub lieu: Option<String>,
    pub date_observation: Option<String>,
    pub type_pollution: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub photo_base64: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<i64>,
    pub user: Option<ReporterSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReporterSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Pollution form as submitted for creation or edition.
#[derive(Debug, Clone, Serialize)]
pub struct PollutionDraft {
    pub titre: String,
    pub type_pollution: Option<PollutionType>,
    pub description: String,
    pub date_observation: String,
    pub lieu: String,
    pub longitude: Decimal,
    pub latitude: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_base64: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client for the pollution and user endpoints. Holds the bearer token
/// obtained from [`ApiClient::login`]; clones share it, and any 401 answer
/// clears it.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Arc::default(),
        }
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_token(Some(token.into()));
        self
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn logout(&self) {
        self.set_token(None);
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    async fn decode<T: DeserializeOwned>(&self, resp: Response) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<T>().await?);
        }
        if status == StatusCode::UNAUTHORIZED && self.token().is_some() {
            warn!("session rejected, dropping token");
            self.logout();
        }
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.message)
            .unwrap_or(text);
        warn!(status = status.as_u16(), %message, "api call failed");
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self.http.get(self.url("/health")).send().await?;
        Ok(resp.status().is_success())
    }

    // ---- pollutions ----

    #[instrument(skip(self))]
    pub async fn list_pollutions(
        &self,
        search: Option<&str>,
        kind: Option<&str>,
    ) -> Result<Vec<SubmittedPollution>, ClientError> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(q) = search.filter(|q| !q.is_empty()) {
            params.push(("q", q));
        }
        if let Some(t) = kind.filter(|t| !t.is_empty()) {
            params.push(("type", t));
        }
        let req = self.http.get(self.url("/pollution")).query(&params);
        self.decode(self.authorized(req).send().await?).await
    }

    #[instrument(skip(self))]
    pub async fn get_pollution(&self, id: i64) -> Result<SubmittedPollution, ClientError> {
        let req = self.http.get(self.url(&format!("/pollution/{id}")));
        self.decode(self.authorized(req).send().await?).await
    }

    #[instrument(skip(self, draft))]
    pub async fn create_pollution(
        &self,
        draft: &PollutionDraft,
    ) -> Result<SubmittedPollution, ClientError> {
        validate_pollution(draft).map_err(ClientError::Validation)?;
        let req = self.http.post(self.url("/pollution")).json(draft);
        self.decode(self.authorized(req).send().await?).await
    }

    #[instrument(skip(self, draft))]
    pub async fn update_pollution(
        &self,
        id: i64,
        draft: &PollutionDraft,
    ) -> Result<MessageResponse, ClientError> {
        validate_pollution(draft).map_err(ClientError::Validation)?;
        let req = self.http.put(self.url(&format!("/pollution/{id}"))).json(draft);
        self.decode(self.authorized(req).send().await?).await
    }

    #[instrument(skip(self))]
    pub async fn delete_pollution(&self, id: i64) -> Result<MessageResponse, ClientError> {
        let req = self.http.delete(self.url(&format!("/pollution/{id}")));
        self.decode(self.authorized(req).send().await?).await
    }

    // ---- users ----

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserAccount>, ClientError> {
        let req = self.http.get(self.url("/user"));
        self.decode(self.authorized(req).send().await?).await
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: i64) -> Result<UserAccount, ClientError> {
        let req = self.http.get(self.url(&format!("/user/{id}")));
        self.decode(self.authorized(req).send().await?).await
    }

    #[instrument(skip(self, account))]
    pub async fn create_user(&self, account: &NewAccount) -> Result<UserAccount, ClientError> {
        validate_account(account).map_err(ClientError::Validation)?;
        let req = self.http.post(self.url("/user")).json(account);
        self.decode(self.authorized(req).send().await?).await
    }

    #[instrument(skip(self, changes))]
    pub async fn update_user(
        &self,
        id: i64,
        changes: &AccountChanges,
    ) -> Result<MessageResponse, ClientError> {
        let req = self.http.put(self.url(&format!("/user/{id}"))).json(changes);
        self.decode(self.authorized(req).send().await?).await
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i64) -> Result<MessageResponse, ClientError> {
        let req = self.http.delete(self.url(&format!("/user/{id}")));
        self.decode(self.authorized(req).send().await?).await
    }

    /// Logs in and keeps the returned bearer token for later calls.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserAccount, ClientError> {
        let resp = self
            .http
            .post(self.url("/user/login"))
            .json(&Credentials { email, password })
            .send()
            .await?;

        let token = resp
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        let user: UserAccount = self.decode(resp).await?;

        let token = token.ok_or(ClientError::MissingToken)?;
        debug!(user_id = user.id, "logged in");
        self.set_token(Some(token));
        Ok(user)
    }
}
