//! Match model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, MatchId, PlayerId, StatLine, TeamId};
use crate::validation::{Validate, ValidationErrors, Validator};

/// A match between two teams.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub date: DateTime<Utc>,
    pub location: String,
    #[serde(default)]
    pub home_team_score: u32,
    #[serde(default)]
    pub away_team_score: u32,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn new(
        home_team_id: TeamId,
        away_team_id: TeamId,
        date: DateTime<Utc>,
        location: String,
    ) -> Self {
        Self {
            id: EntityId::random(),
            home_team_id,
            away_team_id,
            date,
            location,
            home_team_score: 0,
            away_team_score: 0,
            created_at: Utc::now(),
        }
    }
}

impl Validate for Match {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.check(
            self.home_team_id != self.away_team_id,
            "awayTeamId",
            "awayTeamId cannot be the same as homeTeamId",
        )
        .non_empty("location", &self.location);
        v.finish()
    }
}

/// One player's counters for a single match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMatchStats {
    pub player_id: PlayerId,
    #[serde(flatten)]
    pub line: StatLine,
}
