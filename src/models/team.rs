//! Team and team membership models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{EntityId, PlayerId, TeamId};
use crate::validation::{Validate, ValidationErrors, Validator};

/// A club or squad.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Absolute URL of the team logo
    #[serde(default)]
    pub logo: Option<String>,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub fn new(name: String, address: String, logo: Option<String>) -> Self {
        Self {
            id: EntityId::random(),
            name,
            logo,
            address,
            created_at: Utc::now(),
        }
    }

    /// Case-insensitive substring match on name and address filters.
    pub fn matches_filter(&self, name: Option<&str>, address: Option<&str>) -> bool {
        let contains = |haystack: &str, needle: &str| {
            haystack.to_lowercase().contains(&needle.trim().to_lowercase())
        };
        name.map_or(true, |n| contains(&self.name, n))
            && address.map_or(true, |a| contains(&self.address, a))
    }
}

impl Validate for Team {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.length("name", self.name.trim(), 2, 100)
            .length("address", self.address.trim(), 5, 200);
        if let Some(logo) = &self.logo {
            v.check(
                Url::parse(logo).is_ok_and(|u| u.has_host()),
                "logo",
                "logo must be a valid URL",
            );
        }
        v.finish()
    }
}

/// Link between a player and a team.
///
/// The ID is derived from the pair, so a player can only be linked to a
/// given team once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMembership {
    pub id: EntityId,
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub joined_at: DateTime<Utc>,
}

impl TeamMembership {
    pub fn new(player_id: PlayerId, team_id: TeamId) -> Self {
        Self {
            id: Self::id_for(&player_id, &team_id),
            player_id,
            team_id,
            joined_at: Utc::now(),
        }
    }

    pub fn id_for(player_id: &PlayerId, team_id: &TeamId) -> EntityId {
        EntityId::generate(&[player_id.as_str(), team_id.as_str()])
    }
}
