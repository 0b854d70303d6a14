//! Player model and raw stat counters.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{EntityId, PlayerId};
use crate::validation::{is_valid_person_name, Validate, ValidationErrors, Validator};

/// Court position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "OH", alias = "Outside Hitter")]
    OutsideHitter,
    #[serde(rename = "OPPO", alias = "Opposite Hitter")]
    Opposite,
    #[serde(rename = "S", alias = "Setter")]
    Setter,
    #[serde(rename = "MB", alias = "Middle Blocker")]
    MiddleBlocker,
    #[serde(rename = "L", alias = "Libero")]
    Libero,
    #[serde(rename = "SS", alias = "Server Specialist")]
    ServerSpecialist,
    #[serde(rename = "DS", alias = "Defense Specialist")]
    DefenseSpecialist,
}

impl Position {
    pub const ALL: [Position; 7] = [
        Position::OutsideHitter,
        Position::Opposite,
        Position::Setter,
        Position::MiddleBlocker,
        Position::Libero,
        Position::ServerSpecialist,
        Position::DefenseSpecialist,
    ];

    /// Short code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Position::OutsideHitter => "OH",
            Position::Opposite => "OPPO",
            Position::Setter => "S",
            Position::MiddleBlocker => "MB",
            Position::Libero => "L",
            Position::ServerSpecialist => "SS",
            Position::DefenseSpecialist => "DS",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Position::OutsideHitter => "Outside Hitter",
            Position::Opposite => "Opposite Hitter",
            Position::Setter => "Setter",
            Position::MiddleBlocker => "Middle Blocker",
            Position::Libero => "Libero",
            Position::ServerSpecialist => "Server Specialist",
            Position::DefenseSpecialist => "Defense Specialist",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Position {
    type Err = String;

    /// Accepts either the code ("MB") or the label ("Middle Blocker"),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Position::ALL
            .into_iter()
            .find(|p| p.code().eq_ignore_ascii_case(s) || p.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown position: {}", s))
    }
}

/// Play-by-play counters.
///
/// Used both as the running totals stored on a player and as the per-match
/// delta submitted with a match result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatLine {
    // Reception (pass quality)
    #[serde(rename = "APass")]
    pub a_pass: u32,
    #[serde(rename = "BPass")]
    pub b_pass: u32,
    #[serde(rename = "CPass")]
    pub c_pass: u32,
    pub pass_errors: u32,

    // Setting
    #[serde(rename = "ASet")]
    pub a_set: u32,
    #[serde(rename = "BSet")]
    pub b_set: u32,
    #[serde(rename = "CSet")]
    pub c_set: u32,
    pub set_errors: u32,

    // Attack
    pub kills: u32,
    pub attack_errors: u32,
    pub attack_attempts: u32,

    // Serve
    pub aces: u32,
    pub serve_errors: u32,
    pub serve_attempts: u32,

    // Block
    pub solo_blocks: u32,
    pub assist_blocks: u32,
    pub block_errors: u32,

    // Dig
    pub digs: u32,
    pub dig_attempts: u32,

    // Participation
    pub sets_played: u32,
    pub matches_played: u32,

    // Discipline
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub green_cards: u32,

    // Legacy aggregates, not used by any formula
    pub points: u32,
    pub block_points: u32,
    pub serve_points: u32,
    pub spike_points: u32,
}

impl StatLine {
    /// Add every counter of `delta` except `matches_played`.
    pub fn accumulate(&mut self, delta: &StatLine) {
        let pairs: [(&mut u32, u32); 27] = [
            (&mut self.a_pass, delta.a_pass),
            (&mut self.b_pass, delta.b_pass),
            (&mut self.c_pass, delta.c_pass),
            (&mut self.pass_errors, delta.pass_errors),
            (&mut self.a_set, delta.a_set),
            (&mut self.b_set, delta.b_set),
            (&mut self.c_set, delta.c_set),
            (&mut self.set_errors, delta.set_errors),
            (&mut self.kills, delta.kills),
            (&mut self.attack_errors, delta.attack_errors),
            (&mut self.attack_attempts, delta.attack_attempts),
            (&mut self.aces, delta.aces),
            (&mut self.serve_errors, delta.serve_errors),
            (&mut self.serve_attempts, delta.serve_attempts),
            (&mut self.solo_blocks, delta.solo_blocks),
            (&mut self.assist_blocks, delta.assist_blocks),
            (&mut self.block_errors, delta.block_errors),
            (&mut self.digs, delta.digs),
            (&mut self.dig_attempts, delta.dig_attempts),
            (&mut self.sets_played, delta.sets_played),
            (&mut self.yellow_cards, delta.yellow_cards),
            (&mut self.red_cards, delta.red_cards),
            (&mut self.green_cards, delta.green_cards),
            (&mut self.points, delta.points),
            (&mut self.block_points, delta.block_points),
            (&mut self.serve_points, delta.serve_points),
            (&mut self.spike_points, delta.spike_points),
        ];
        for (total, add) in pairs {
            *total = total.saturating_add(add);
        }
    }
}

/// A registered player together with career counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,

    pub name: String,

    #[serde(alias = "age")]
    pub birth_date: NaiveDate,

    /// Height in meters
    pub height: f64,

    pub main_position: Position,

    #[serde(default)]
    pub sub_position: Option<Position>,

    #[serde(flatten)]
    pub stats: StatLine,

    #[serde(default)]
    pub retired: bool,

    #[serde(default)]
    pub image_url: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Player {
    /// Register a new player with all counters at zero.
    pub fn new(
        name: String,
        birth_date: NaiveDate,
        height: f64,
        main_position: Position,
        sub_position: Option<Position>,
    ) -> Self {
        Self {
            id: EntityId::random(),
            name,
            birth_date,
            height,
            main_position,
            sub_position,
            stats: StatLine::default(),
            retired: false,
            image_url: None,
            created_at: Utc::now(),
        }
    }

    /// Fold one match's counters into the career totals.
    ///
    /// Each recorded match counts as exactly one match played, whatever the
    /// delta says about `matches_played`.
    pub fn apply_match_stats(&mut self, delta: &StatLine) {
        self.stats.accumulate(delta);
        self.stats.matches_played = self.stats.matches_played.saturating_add(1);
    }

    /// Validate against a given "today" so the future-date rule is testable.
    pub fn validate_on(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.length("name", &self.name, 2, 100).check(
            is_valid_person_name(&self.name),
            "name",
            "name may only contain letters, spaces, apostrophes or hyphens",
        );

        let earliest = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN);
        v.check(
            self.birth_date >= earliest,
            "birthDate",
            "birthDate must be after January 1st, 1900",
        )
        .check(
            self.birth_date <= today,
            "birthDate",
            "birthDate cannot be in the future",
        )
        .range("height", self.height, 0.5, 3.0)
        .check(
            self.sub_position != Some(self.main_position),
            "subPosition",
            "subPosition cannot be the same as mainPosition",
        );

        if let Some(url) = &self.image_url {
            v.non_empty("imageUrl", url);
        }
        v.finish()
    }
}

impl Validate for Player {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.validate_on(Utc::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Player {
        Player::new(
            "Giba Godoy".to_string(),
            date(1976, 12, 23),
            1.92,
            Position::OutsideHitter,
            Some(Position::Opposite),
        )
    }

    #[test]
    fn test_new_player_has_zero_counters() {
        let p = sample();
        assert_eq!(p.stats, StatLine::default());
        assert!(!p.retired);
    }

    #[test]
    fn test_position_from_code_and_label() {
        assert_eq!("MB".parse::<Position>().unwrap(), Position::MiddleBlocker);
        assert_eq!("oppo".parse::<Position>().unwrap(), Position::Opposite);
        assert_eq!("Libero".parse::<Position>().unwrap(), Position::Libero);
        assert!("Goalkeeper".parse::<Position>().is_err());
    }

    #[test]
    fn test_position_serde_codes_and_aliases() {
        assert_eq!(serde_json::to_string(&Position::MiddleBlocker).unwrap(), "\"MB\"");
        let p: Position = serde_json::from_str("\"Defense Specialist\"").unwrap();
        assert_eq!(p, Position::DefenseSpecialist);
    }

    #[test]
    fn test_player_json_field_names() {
        let mut p = sample();
        p.stats.a_pass = 4;
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["APass"], 4);
        assert_eq!(json["mainPosition"], "OH");
        assert_eq!(json["attackAttempts"], 0);
        assert!(json.get("stats").is_none());
    }

    #[test]
    fn test_player_deserializes_with_missing_counters() {
        let json = r#"{
            "id": "p1",
            "name": "Ana",
            "age": "2000-01-01",
            "height": 1.8,
            "mainPosition": "Setter",
            "kills": 7,
            "createdAt": "2024-01-01T00:00:00Z"
        }"#;
        let p: Player = serde_json::from_str(json).unwrap();
        assert_eq!(p.main_position, Position::Setter);
        assert_eq!(p.stats.kills, 7);
        assert_eq!(p.stats.aces, 0);
        assert!(p.sub_position.is_none());
    }

    #[test]
    fn test_apply_match_stats_adds_and_counts_once() {
        let mut p = sample();
        let delta = StatLine {
            kills: 10,
            attack_attempts: 25,
            yellow_cards: 1,
            matches_played: 5,
            ..Default::default()
        };
        p.apply_match_stats(&delta);
        p.apply_match_stats(&delta);
        assert_eq!(p.stats.kills, 20);
        assert_eq!(p.stats.attack_attempts, 50);
        assert_eq!(p.stats.yellow_cards, 2);
        assert_eq!(p.stats.matches_played, 2);
    }

    #[test]
    fn test_accumulate_saturates() {
        let mut line = StatLine {
            digs: u32::MAX - 1,
            ..Default::default()
        };
        line.accumulate(&StatLine {
            digs: 10,
            ..Default::default()
        });
        assert_eq!(line.digs, u32::MAX);
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample().validate_on(date(2025, 1, 1)).is_ok());
    }

    #[test]
    fn test_validate_same_positions() {
        let mut p = sample();
        p.sub_position = Some(Position::OutsideHitter);
        let errors = p.validate_on(date(2025, 1, 1)).unwrap_err();
        assert!(errors.has_field("subPosition"));
    }

    #[test]
    fn test_validate_name_rules() {
        let mut p = sample();
        p.name = "X".to_string();
        assert!(p.validate_on(date(2025, 1, 1)).unwrap_err().has_field("name"));

        p.name = "R2-D2".to_string();
        assert!(p.validate_on(date(2025, 1, 1)).unwrap_err().has_field("name"));

        p.name = "Zé D'Ávila-Souza".to_string();
        assert!(p.validate_on(date(2025, 1, 1)).is_ok());
    }

    #[test]
    fn test_validate_birth_date_bounds() {
        let mut p = sample();
        p.birth_date = date(1899, 12, 31);
        assert!(p.validate_on(date(2025, 1, 1)).unwrap_err().has_field("birthDate"));

        p.birth_date = date(2025, 1, 2);
        assert!(p.validate_on(date(2025, 1, 1)).unwrap_err().has_field("birthDate"));
    }

    #[test]
    fn test_validate_height_bounds() {
        let mut p = sample();
        p.height = 0.4;
        assert!(p.validate_on(date(2025, 1, 1)).unwrap_err().has_field("height"));
        p.height = 3.0;
        assert!(p.validate_on(date(2025, 1, 1)).is_ok());
    }
}
