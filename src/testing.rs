//! In-memory repositories and request helpers for handler tests.

use std::sync::Mutex;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use time::OffsetDateTime;
use tower::ServiceExt;

use crate::pollutions::repo::PollutionRepo;
use crate::pollutions::repo_types::{
    NewPollution, Pollution, PollutionChanges, PollutionFilter, Reporter,
};
use crate::users::repo::{EmailTaken, UserRepo};
use crate::users::repo_types::{NewUser, User, UserChanges};

/// Mirrors the relational schema closely enough for handler tests,
/// including `ON DELETE SET NULL` on the reporter reference.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    pollutions: Mutex<Vec<Pollution>>,
    next_user_id: Mutex<i64>,
    next_pollution_id: Mutex<i64>,
}

fn next_id(counter: &Mutex<i64>) -> i64 {
    let mut n = counter.lock().unwrap();
    *n += 1;
    *n
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn list(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert(&self, user: NewUser) -> anyhow::Result<User> {
        if self.users.lock().unwrap().iter().any(|u| u.email == user.email) {
            return Err(EmailTaken.into());
        }
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: next_id(&self.next_user_id),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> anyhow::Result<u64> {
        let mut users = self.users.lock().unwrap();
        if let Some(email) = &changes.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(EmailTaken.into());
            }
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(0);
        };
        if let Some(v) = changes.username {
            user.username = v;
        }
        if let Some(v) = changes.email {
            user.email = v;
        }
        if let Some(v) = changes.password_hash {
            user.password_hash = v;
        }
        if let Some(v) = changes.role {
            user.role = v;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(1)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<u64> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        let removed = (before - users.len()) as u64;
        if removed > 0 {
            for p in self.pollutions.lock().unwrap().iter_mut() {
                if p.user_id == Some(id) {
                    p.user_id = None;
                }
            }
        }
        Ok(removed)
    }
}

fn contains(haystack: &Option<String>, needle: &str) -> bool {
    haystack.as_deref().is_some_and(|h| h.contains(needle))
}

#[async_trait]
impl PollutionRepo for MemoryStore {
    async fn list(&self, filter: &PollutionFilter) -> anyhow::Result<Vec<Pollution>> {
        let rows = self.pollutions.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|p| match filter.search.as_deref() {
                Some(q) => p.title.contains(q) || contains(&p.description, q),
                None => true,
            })
            .filter(|p| match filter.pollution_type.as_deref() {
                Some(t) => p.pollution_type.as_deref() == Some(t),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn find_with_reporter(
        &self,
        id: i64,
    ) -> anyhow::Result<Option<(Pollution, Option<Reporter>)>> {
        let Some(p) = self
            .pollutions
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
        else {
            return Ok(None);
        };
        let reporter = p.user_id.and_then(|uid| {
            self.users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.id == uid)
                .map(|u| Reporter {
                    id: u.id,
                    username: u.username.clone(),
                    email: u.email.clone(),
                })
        });
        Ok(Some((p, reporter)))
    }

    async fn insert(&self, new: NewPollution) -> anyhow::Result<Pollution> {
        let now = OffsetDateTime::now_utc();
        let (photo_data, photo_mime) = match new.photo {
            Some(photo) => (Some(photo.data), Some(photo.mime)),
            None => (None, None),
        };
        let created = Pollution {
            id: next_id(&self.next_pollution_id),
            title: new.title,
            place: new.place,
            observed_at: new.observed_at,
            pollution_type: new.pollution_type.map(|t| t.as_str().to_string()),
            description: new.description,
            latitude: new.latitude,
            longitude: new.longitude,
            photo_data,
            photo_mime,
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        };
        self.pollutions.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, c: PollutionChanges) -> anyhow::Result<u64> {
        let mut rows = self.pollutions.lock().unwrap();
        let Some(p) = rows.iter_mut().find(|p| p.id == id) else {
            return Ok(0);
        };
        p.title = c.title;
        if c.place.is_some() {
            p.place = c.place;
        }
        if c.observed_at.is_some() {
            p.observed_at = c.observed_at;
        }
        if let Some(t) = c.pollution_type {
            p.pollution_type = Some(t.as_str().to_string());
        }
        if c.description.is_some() {
            p.description = c.description;
        }
        if c.latitude.is_some() {
            p.latitude = c.latitude;
        }
        if c.longitude.is_some() {
            p.longitude = c.longitude;
        }
        if let Some(photo) = c.photo {
            p.photo_data = Some(photo.data);
            p.photo_mime = Some(photo.mime);
        }
        p.updated_at = OffsetDateTime::now_utc();
        Ok(1)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<u64> {
        let mut rows = self.pollutions.lock().unwrap();
        let before = rows.len();
        rows.retain(|p| p.id != id);
        Ok((before - rows.len()) as u64)
    }
}

/// Sends one request through the router and returns status, headers and JSON body.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, headers, json)
}
