use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{body_id, nullable, MessageResponse};
use crate::api::state::AppState;
use crate::api::{parse_id, ApiError};
use crate::models::{EntityId, Player, PlayerId, Team, TeamId, TeamMembership};
use crate::storage::DocumentStore;
use crate::validation::Validate;

#[derive(Debug, Deserialize)]
pub struct ListTeamsParams {
    pub name: Option<String>,
    pub address: Option<String>,
}

pub async fn list_teams(
    State(state): State<AppState>,
    Query(params): Query<ListTeamsParams>,
) -> Result<Json<Vec<Team>>, ApiError> {
    let mut teams: Vec<Team> = state
        .store
        .find_where(|t: &Team| t.matches_filter(params.name.as_deref(), params.address.as_deref()))
        .await?;
    teams.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(teams))
}

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub logo: Option<String>,
}

pub async fn create_team(
    State(state): State<AppState>,
    payload: Result<Json<CreateTeamRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Team>), ApiError> {
    let Json(req) = payload?;
    let team = Team::new(req.name.trim().to_string(), req.address, req.logo);
    team.validate()?;

    state.store.insert(&team).await?;
    info!("Created team {} ({})", team.name, team.id);
    Ok((StatusCode::CREATED, Json(team)))
}

/// A team with its current roster.
#[derive(Debug, Serialize)]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    pub players: Vec<Player>,
}

async fn load_team(store: &DocumentStore, id: &TeamId) -> Result<Team, ApiError> {
    store
        .find_by_id::<Team>(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Team {} not found", id)))
}

async fn roster(store: &DocumentStore, team_id: &TeamId) -> Result<Vec<Player>, ApiError> {
    let memberships: Vec<TeamMembership> = store
        .find_where(|m: &TeamMembership| &m.team_id == team_id)
        .await?;
    let mut players: Vec<Player> = store
        .find_where(|p: &Player| memberships.iter().any(|m| m.player_id == p.id))
        .await?;
    players.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(players)
}

pub async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TeamDetail>, ApiError> {
    let id = parse_id(&id)?;
    let team = load_team(&state.store, &id).await?;
    let players = roster(&state.store, &id).await?;
    Ok(Json(TeamDetail { team, players }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub logo: Option<Option<String>>,
}

pub async fn update_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTeamRequest>, JsonRejection>,
) -> Result<Json<Team>, ApiError> {
    let id = parse_id(&id)?;
    let Json(req) = payload?;

    let team = state
        .store
        .try_update_one(
            |t: &Team| t.id == id,
            |team| -> Result<Team, ApiError> {
                if let Some(name) = req.name {
                    team.name = name.trim().to_string();
                }
                if let Some(address) = req.address {
                    team.address = address;
                }
                if let Some(logo) = req.logo {
                    team.logo = logo;
                }
                team.validate()?;
                Ok(team.clone())
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Team {} not found", id)))?;
    Ok(Json(team))
}

pub async fn delete_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id)?;
    if !state.store.delete::<Team>(&id).await? {
        return Err(ApiError::NotFound(format!("Team {} not found", id)));
    }
    let unlinked = state
        .store
        .delete_where(|m: &TeamMembership| m.team_id == id)
        .await?;
    info!("Deleted team {} ({} memberships removed)", id, unlinked);
    Ok(Json(MessageResponse::new("Team deleted")))
}

pub async fn team_players(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Player>>, ApiError> {
    let id = parse_id(&id)?;
    load_team(&state.store, &id).await?;
    Ok(Json(roster(&state.store, &id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPlayerRequest {
    pub player_id: PlayerId,
}

pub async fn add_player_to_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AddPlayerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TeamMembership>), ApiError> {
    let team_id = parse_id(&id)?;
    let Json(req) = payload?;
    let player_id = body_id("playerId", &req.player_id)?;

    load_team(&state.store, &team_id).await?;
    if !state.store.exists::<Player>(&player_id).await? {
        return Err(ApiError::NotFound(format!("Player {} not found", player_id)));
    }

    let membership = TeamMembership::new(player_id, team_id);
    if !state.store.insert_unless(&membership, |_| false).await? {
        return Err(ApiError::Conflict(format!(
            "Player {} is already on team {}",
            membership.player_id, membership.team_id
        )));
    }
    info!(
        "Added player {} to team {}",
        membership.player_id, membership.team_id
    );
    Ok((StatusCode::CREATED, Json(membership)))
}

pub async fn remove_player_from_team(
    State(state): State<AppState>,
    Path((id, player_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let team_id = parse_id(&id)?;
    let player_id = parse_id(&player_id)?;

    let membership_id: EntityId = TeamMembership::id_for(&player_id, &team_id);
    if !state.store.delete::<TeamMembership>(&membership_id).await? {
        return Err(ApiError::NotFound(format!(
            "Player {} is not on team {}",
            player_id, team_id
        )));
    }
    info!("Removed player {} from team {}", player_id, team_id);
    Ok(Json(MessageResponse::new("Player removed from team")))
}
