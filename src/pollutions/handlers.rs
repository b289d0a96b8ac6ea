use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{PollutionForm, PollutionQuery, PollutionResponse};
use super::services::{build_filter, new_pollution, pollution_changes, require_title};
use crate::{
    auth::MaybeAuthUser,
    error::{AppError, AppResult, MessageResponse},
    extract::{ApiJson, ApiPath},
    state::AppState,
};

pub fn pollution_routes() -> Router<AppState> {
    Router::new()
        .route("/pollution", get(list_pollutions).post(create_pollution))
        .route(
            "/pollution/:id",
            get(get_pollution)
                .put(update_pollution)
                .delete(delete_pollution),
        )
}

#[instrument(skip(state))]
pub async fn list_pollutions(
    State(state): State<AppState>,
    Query(query): Query<PollutionQuery>,
) -> AppResult<Json<Vec<PollutionResponse>>> {
    let filter = build_filter(&query);
    let rows = state
        .pollutions
        .list(&filter)
        .await
        .map_err(|e| AppError::internal("list pollutions failed", e))?;
    Ok(Json(rows.into_iter().map(PollutionResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_pollution(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<PollutionResponse>> {
    match state.pollutions.find_with_reporter(id).await {
        Ok(Some((pollution, reporter))) => {
            Ok(Json(PollutionResponse::from(pollution).with_reporter(reporter)))
        }
        Ok(None) => Err(AppError::NotFound(format!(
            "Pollution with id={id} not found."
        ))),
        Err(e) => Err(AppError::internal("get pollution failed", e)),
    }
}

#[instrument(skip(state, form))]
pub async fn create_pollution(
    State(state): State<AppState>,
    MaybeAuthUser(identity): MaybeAuthUser,
    ApiJson(form): ApiJson<PollutionForm>,
) -> AppResult<(StatusCode, Json<PollutionResponse>)> {
    let title = require_title(&form).map_err(|msg| {
        warn!("pollution without title rejected");
        AppError::BadRequest(msg.into())
    })?;

    let owner = identity.map(|i| i.id);
    let created = state
        .pollutions
        .insert(new_pollution(title, form, owner))
        .await
        .map_err(|e| AppError::internal("Erreur lors de la création de la pollution", e))?;

    info!(pollution_id = created.id, owner = ?owner, "pollution reported");
    Ok((StatusCode::CREATED, Json(PollutionResponse::from(created))))
}

#[instrument(skip(state, form))]
pub async fn update_pollution(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(form): ApiJson<PollutionForm>,
) -> AppResult<Json<MessageResponse>> {
    let title = require_title(&form).map_err(|msg| {
        warn!(pollution_id = id, "update without title rejected");
        AppError::BadRequest(format!(
            "Erreur de mise à jour de la pollution avec l'id={id}: {msg}"
        ))
    })?;

    let updated = state
        .pollutions
        .update(id, pollution_changes(title, form))
        .await
        .map_err(|e| {
            AppError::internal(
                format!("Erreur de mise à jour de la pollution avec l'id={id}"),
                e,
            )
        })?;

    if updated == 1 {
        info!(pollution_id = id, "pollution updated");
        Ok(Json(MessageResponse::new("Pollution à été mise à jour.")))
    } else {
        Err(AppError::NotFound(format!(
            "Impossible de mettre à jour la pollution avec l'id={id}. La pollution n'a pas été trouvée ou req.body est vide!"
        )))
    }
}

#[instrument(skip(state))]
pub async fn delete_pollution(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<MessageResponse>> {
    let deleted = state.pollutions.delete(id).await.map_err(|e| {
        AppError::internal(
            format!("Échec de supprimer la pollution avec l'id={id}"),
            e,
        )
    })?;

    if deleted == 1 {
        info!(pollution_id = id, "pollution deleted");
        Ok(Json(MessageResponse::new("La pollution à été supprimée!")))
    } else {
        Err(AppError::NotFound(format!(
            "Impossible de supprimer la pollution avec l'id={id}. Peut-être la pollution n'a-t-elle pas été trouvée?"
        )))
    }
}
