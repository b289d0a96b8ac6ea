use axum::{
    extract::{FromRef, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use super::{
    dto::{CreateUserRequest, LoginRequest, UpdateUserRequest},
    repo::EmailTaken,
    repo_types::{NewUser, Role, User, UserChanges},
    services::{is_valid_email, is_valid_password, normalize_email, validate_user_create},
};
use crate::{
    auth::{password::hash_password, password::verify_password, AuthUser, JwtKeys, MaybeAuthUser},
    error::{AppError, AppResult, MessageResponse},
    extract::{ApiJson, ApiPath},
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const EMAIL_REGISTERED: &str = "Email already registered";

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(list_users).post(create_user))
        .route("/user/login", post(login))
        .route(
            "/user/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> AppResult<Json<Vec<User>>> {
    let users = state
        .users
        .list()
        .await
        .map_err(|e| AppError::internal("list users failed", e))?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<User>> {
    state
        .users
        .find_by_id(id)
        .await
        .map_err(|e| AppError::internal("get user failed", e))?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User with id={id} not found.")))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    if let Err(msg) = validate_user_create(&payload) {
        warn!(reason = %msg, "user creation rejected");
        return Err(AppError::BadRequest(msg));
    }

    let role = payload.role.unwrap_or_default();
    if role == Role::Admin && !caller.is_some_and(|c| c.is_admin()) {
        warn!("admin account requested without admin token");
        return Err(AppError::Forbidden(
            "Only an administrator can create admin accounts".into(),
        ));
    }

    let email = normalize_email(payload.email.as_deref().unwrap_or_default());
    ensure_email_free(&state, &email, None).await?;

    let password = payload.password.unwrap_or_default();
    let password_hash = hash_password(&password, &state.config.password)
        .map_err(|e| AppError::internal("hash_password failed", e))?;

    let user = state
        .users
        .insert(NewUser {
            username: payload.username.unwrap_or_default().trim().to_string(),
            email,
            password_hash,
            role,
        })
        .await
        .map_err(|e| write_failure("Error creating user", e))?;

    info!(user_id = user.id, email = %user.email, role = %user.role, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<MessageResponse>> {
    if payload.is_empty() {
        return Err(AppError::BadRequest("No fields provided".into()));
    }

    let username = payload.username.map(|u| u.trim().to_string());
    if username.as_deref().is_some_and(str::is_empty) {
        return Err(AppError::BadRequest("Username is required".into()));
    }

    let mut changes = UserChanges {
        username,
        role: payload.role,
        ..Default::default()
    };

    if changes.role.is_some() && !caller.is_admin() {
        warn!(caller = caller.id, target = id, "role change without admin rights");
        return Err(AppError::Forbidden(
            "Only an administrator can change roles".into(),
        ));
    }

    if let Some(email) = payload.email {
        let email = normalize_email(&email);
        if !is_valid_email(&email) {
            return Err(AppError::BadRequest("Invalid email format".into()));
        }
        ensure_email_free(&state, &email, Some(id)).await?;
        changes.email = Some(email);
    }

    if let Some(password) = payload.password {
        if !is_valid_password(&password) {
            return Err(AppError::BadRequest("Weak password".into()));
        }
        let hash = hash_password(&password, &state.config.password)
            .map_err(|e| AppError::internal("hash_password failed", e))?;
        changes.password_hash = Some(hash);
    }

    let updated = state
        .users
        .update(id, changes)
        .await
        .map_err(|e| write_failure("update user failed", e))?;

    if updated == 1 {
        info!(user_id = id, by = caller.id, "user updated");
        Ok(Json(MessageResponse::new("User updated successfully.")))
    } else {
        Err(AppError::NotFound("User not found or no changes.".into()))
    }
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<MessageResponse>> {
    let deleted = state
        .users
        .delete(id)
        .await
        .map_err(|e| AppError::internal(format!("Could not delete user with id={id}"), e))?;

    if deleted == 1 {
        info!(user_id = id, by = caller.id, "user deleted");
        Ok(Json(MessageResponse::new("User was deleted successfully!")))
    } else {
        Err(AppError::NotFound(format!(
            "Cannot delete user with id={id}. User not found."
        )))
    }
}

/// Checks credentials and returns the user with a bearer token in the
/// `Authorization` response header.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<(HeaderMap, Json<User>)> {
    let (Some(email), Some(password)) = (
        payload.email.filter(|e| !e.trim().is_empty()),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::BadRequest("Email and password required".into()));
    };
    let email = normalize_email(&email);

    let user = match state.users.find_by_email(&email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %email, "login unknown email");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
        Err(e) => return Err(AppError::internal("find_by_email failed", e)),
    };

    let ok = match verify_password(&password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, user_id = user.id, "stored password hash unreadable");
            false
        }
    };
    if !ok {
        warn!(email = %email, user_id = user.id, "login invalid password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let token = JwtKeys::from_ref(&state)
        .sign(user.id, user.role)
        .map_err(|e| AppError::internal("jwt sign failed", e))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| AppError::internal("jwt header encoding failed", e.into()))?;

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, bearer);

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok((headers, Json(user)))
}

async fn ensure_email_free(state: &AppState, email: &str, owner: Option<i64>) -> AppResult<()> {
    match state.users.find_by_email(email).await {
        Ok(Some(existing)) if Some(existing.id) != owner => {
            warn!(email = %email, "email already registered");
            Err(AppError::Conflict(EMAIL_REGISTERED.into()))
        }
        Ok(_) => Ok(()),
        Err(e) => Err(AppError::internal("find_by_email failed", e)),
    }
}

/// A concurrent writer can claim the email between the lookup and the write.
fn write_failure(context: &str, err: anyhow::Error) -> AppError {
    if err.downcast_ref::<EmailTaken>().is_some() {
        warn!("email claimed concurrently");
        AppError::Conflict(EMAIL_REGISTERED.into())
    } else {
        AppError::internal(context, err)
    }
}
