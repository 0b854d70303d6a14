use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{contains_ci, nullable, MessageResponse};
use crate::api::state::AppState;
use crate::api::{parse_id, ApiError, Pagination, PaginationMeta};
use crate::calculate::PlayerStatsReport;
use crate::models::{Player, Position, StatLine, Team, TeamMembership};
use crate::validation::Validate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPlayersParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub name: Option<String>,
    pub position: Option<String>,
    pub retired: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PlayerListResponse {
    pub players: Vec<Player>,
    pub pagination: PaginationMeta,
}

pub async fn list_players(
    State(state): State<AppState>,
    Query(params): Query<ListPlayersParams>,
) -> Result<Json<PlayerListResponse>, ApiError> {
    let position = params
        .position
        .as_deref()
        .map(str::parse::<Position>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let mut players: Vec<Player> = state
        .store
        .find_where(|p: &Player| {
            params.name.as_deref().map_or(true, |n| contains_ci(&p.name, n))
                && position.map_or(true, |pos| p.main_position == pos)
                && params.retired.map_or(true, |r| p.retired == r)
        })
        .await?;
    players.sort_by(|a, b| a.name.cmp(&b.name));

    let pagination = Pagination::new(
        params.page,
        params.page_size,
        state.config.shop.default_page_size,
    );
    let (players, pagination) = pagination.apply(&players);

    Ok(Json(PlayerListResponse {
        players,
        pagination,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlayerRequest {
    pub name: String,
    #[serde(alias = "age")]
    pub birth_date: NaiveDate,
    pub height: f64,
    pub main_position: Position,
    #[serde(default)]
    pub sub_position: Option<Position>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub retired: bool,
    /// Starting counters, e.g. when importing a veteran's history
    #[serde(flatten)]
    pub stats: StatLine,
}

pub async fn create_player(
    State(state): State<AppState>,
    payload: Result<Json<CreatePlayerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Player>), ApiError> {
    let Json(req) = payload?;

    let mut player = Player::new(
        req.name.trim().to_string(),
        req.birth_date,
        req.height,
        req.main_position,
        req.sub_position,
    );
    player.image_url = req.image_url;
    player.retired = req.retired;
    player.stats = req.stats;
    player.validate()?;

    state.store.insert(&player).await?;
    info!("Registered player {} ({})", player.name, player.id);
    Ok((StatusCode::CREATED, Json(player)))
}

pub async fn get_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Player>, ApiError> {
    let id = parse_id(&id)?;
    let player = state
        .store
        .find_by_id::<Player>(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Player {} not found", id)))?;
    Ok(Json(player))
}

/// Profile fields a client may change. Counters only move through match
/// results. `subPosition` and `imageUrl` are cleared by an explicit null.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlayerRequest {
    pub name: Option<String>,
    #[serde(alias = "age")]
    pub birth_date: Option<NaiveDate>,
    pub height: Option<f64>,
    pub main_position: Option<Position>,
    #[serde(default, deserialize_with = "nullable")]
    pub sub_position: Option<Option<Position>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    pub retired: Option<bool>,
}

pub async fn update_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePlayerRequest>, JsonRejection>,
) -> Result<Json<Player>, ApiError> {
    let id = parse_id(&id)?;
    let Json(req) = payload?;

    let player = state
        .store
        .try_update_one(
            |p: &Player| p.id == id,
            |player| -> Result<Player, ApiError> {
                if let Some(name) = req.name {
                    player.name = name.trim().to_string();
                }
                if let Some(birth_date) = req.birth_date {
                    player.birth_date = birth_date;
                }
                if let Some(height) = req.height {
                    player.height = height;
                }
                if let Some(main_position) = req.main_position {
                    player.main_position = main_position;
                }
                if let Some(sub_position) = req.sub_position {
                    player.sub_position = sub_position;
                }
                if let Some(image_url) = req.image_url {
                    player.image_url = image_url;
                }
                if let Some(retired) = req.retired {
                    player.retired = retired;
                }
                player.validate()?;
                Ok(player.clone())
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Player {} not found", id)))?;
    Ok(Json(player))
}

/// Delete a player and every team membership pointing at them.
pub async fn delete_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id)?;
    if !state.store.delete::<Player>(&id).await? {
        return Err(ApiError::NotFound(format!("Player {} not found", id)));
    }
    let unlinked = state
        .store
        .delete_where(|m: &TeamMembership| m.player_id == id)
        .await?;
    info!("Deleted player {} ({} memberships removed)", id, unlinked);
    Ok(Json(MessageResponse::new("Player deleted")))
}

pub async fn player_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PlayerStatsReport>, ApiError> {
    let id = parse_id(&id)?;
    let player = state
        .store
        .find_by_id::<Player>(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Player {} not found", id)))?;
    Ok(Json(PlayerStatsReport::from_player(&player)))
}

pub async fn player_teams(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Team>>, ApiError> {
    let id = parse_id(&id)?;
    if !state.store.exists::<Player>(&id).await? {
        return Err(ApiError::NotFound(format!("Player {} not found", id)));
    }

    let memberships: Vec<TeamMembership> = state
        .store
        .find_where(|m: &TeamMembership| m.player_id == id)
        .await?;
    let mut teams: Vec<Team> = state
        .store
        .find_where(|t: &Team| memberships.iter().any(|m| m.team_id == t.id))
        .await?;
    teams.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(teams))
}
