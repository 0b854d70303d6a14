use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use super::{body_id, MessageResponse};
use crate::api::state::AppState;
use crate::api::{parse_id, ApiError};
use crate::models::{Match, Player, PlayerId, PlayerMatchStats, StatLine, Team, TeamId};
use crate::validation::Validate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMatchesParams {
    pub team_id: Option<String>,
}

/// Matches, most recent first.
pub async fn list_matches(
    State(state): State<AppState>,
    Query(params): Query<ListMatchesParams>,
) -> Result<Json<Vec<Match>>, ApiError> {
    let team = params.team_id.as_deref().map(parse_id).transpose()?;
    let mut matches: Vec<Match> = state
        .store
        .find_where(|m: &Match| {
            team.as_ref()
                .map_or(true, |t| &m.home_team_id == t || &m.away_team_id == t)
        })
        .await?;
    matches.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(Json(matches))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub date: DateTime<Utc>,
    pub location: String,
    #[serde(default)]
    pub home_team_score: u32,
    #[serde(default)]
    pub away_team_score: u32,
}

pub async fn create_match(
    State(state): State<AppState>,
    payload: Result<Json<CreateMatchRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Match>), ApiError> {
    let Json(req) = payload?;
    let home = body_id("homeTeamId", &req.home_team_id)?;
    let away = body_id("awayTeamId", &req.away_team_id)?;

    let mut game = Match::new(home, away, req.date, req.location.trim().to_string());
    game.home_team_score = req.home_team_score;
    game.away_team_score = req.away_team_score;
    game.validate()?;

    for team_id in [&game.home_team_id, &game.away_team_id] {
        if !state.store.exists::<Team>(team_id).await? {
            return Err(ApiError::NotFound(format!("Team {} not found", team_id)));
        }
    }

    state.store.insert(&game).await?;
    info!(
        "Scheduled match {} vs {} ({})",
        game.home_team_id, game.away_team_id, game.id
    );
    Ok((StatusCode::CREATED, Json(game)))
}

pub async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Match>, ApiError> {
    let id = parse_id(&id)?;
    let game = state
        .store
        .find_by_id::<Match>(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Match {} not found", id)))?;
    Ok(Json(game))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMatchRequest {
    pub home_team_score: Option<u32>,
    pub away_team_score: Option<u32>,
    #[serde(default)]
    pub players_stats: Vec<PlayerMatchStats>,
}

/// Record a result: set the scores and add each player's counters to
/// their career totals.
///
/// Every referenced player must exist; otherwise nothing is written.
pub async fn update_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateMatchRequest>, JsonRejection>,
) -> Result<Json<Match>, ApiError> {
    let id = parse_id(&id)?;
    let Json(req) = payload?;

    if !state.store.exists::<Match>(&id).await? {
        return Err(ApiError::NotFound(format!("Match {} not found", id)));
    }

    let mut deltas: HashMap<PlayerId, Vec<StatLine>> = HashMap::new();
    for entry in req.players_stats {
        let player_id = body_id("playerId", &entry.player_id)?;
        deltas.entry(player_id).or_default().push(entry.line);
    }

    if !deltas.is_empty() {
        let known: Vec<Player> = state
            .store
            .find_where(|p: &Player| deltas.contains_key(&p.id))
            .await?;
        if let Some(missing) = deltas
            .keys()
            .find(|id| !known.iter().any(|p| &p.id == *id))
        {
            return Err(ApiError::NotFound(format!("Player {} not found", missing)));
        }
    }

    let updated = state
        .store
        .update::<Match, _>(&id, |game| {
            if let Some(score) = req.home_team_score {
                game.home_team_score = score;
            }
            if let Some(score) = req.away_team_score {
                game.away_team_score = score;
            }
        })
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Match {} not found", id)))?;

    if !deltas.is_empty() {
        let changed = state
            .store
            .update_where(|p: &mut Player| match deltas.get(&p.id) {
                Some(lines) => {
                    for line in lines {
                        p.apply_match_stats(line);
                    }
                    true
                }
                None => false,
            })
            .await?;
        info!("Recorded match {} stats for {} players", id, changed);
    }

    Ok(Json(updated))
}

pub async fn delete_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id)?;
    if !state.store.delete::<Match>(&id).await? {
        return Err(ApiError::NotFound(format!("Match {} not found", id)));
    }
    info!("Deleted match {}", id);
    Ok(Json(MessageResponse::new("Match deleted")))
}
