use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use super::MessageResponse;
use crate::api::state::AppState;
use crate::api::{parse_id, ApiError};
use crate::models::{normalize_email, User};
use crate::storage::DocumentStore;
use crate::validation::Validate;

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let mut users = state.store.find_all::<User>().await?;
    users.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
}

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let Json(req) = payload?;
    let user = User::new(req.email, req.name.trim().to_string());
    user.validate()?;

    if !state
        .store
        .insert_unless(&user, |u: &User| u.email == user.email)
        .await?
    {
        return Err(ApiError::Conflict(format!(
            "A user with email {} already exists",
            user.email
        )));
    }
    info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

async fn load_user(store: &DocumentStore, id: &str) -> Result<User, ApiError> {
    let id = parse_id(id)?;
    store
        .find_by_id::<User>(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(load_user(&state.store, &id).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let Json(req) = payload?;
    let id = parse_id(&id)?;
    let email = req.email.as_deref().map(normalize_email);

    if let Some(email) = &email {
        let clash = state
            .store
            .find_one(|u: &User| &u.email == email && u.id != id)
            .await?;
        if clash.is_some() {
            return Err(ApiError::Conflict(format!(
                "A user with email {} already exists",
                email
            )));
        }
    }

    let user = state
        .store
        .try_update_one(
            |u: &User| u.id == id,
            |user| -> Result<User, ApiError> {
                if let Some(email) = email {
                    user.email = email;
                }
                if let Some(name) = req.name {
                    user.name = name.trim().to_string();
                }
                user.validate()?;
                Ok(user.clone())
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id)?;
    if !state.store.delete::<User>(&id).await? {
        return Err(ApiError::NotFound(format!("User {} not found", id)));
    }
    info!("Deleted user {}", id);
    Ok(Json(MessageResponse::new("User deleted")))
}
