//! Player efficiency metrics and performance index.

use serde::Serialize;

use super::{ratio, ratio_or};
use crate::models::{Player, PlayerId, Position, StatLine};

/// Relative importance of each skill for a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SkillWeights {
    pub reception: f64,
    pub attack: f64,
    pub serve: f64,
    pub block: f64,
    pub dig: f64,
}

impl SkillWeights {
    const fn new(reception: f64, attack: f64, serve: f64, block: f64, dig: f64) -> Self {
        Self {
            reception,
            attack,
            serve,
            block,
            dig,
        }
    }

    /// Used for positions without a dedicated row (server specialists).
    pub const DEFAULT: SkillWeights = SkillWeights::new(0.20, 0.25, 0.20, 0.20, 0.15);

    pub fn for_position(position: Position) -> Self {
        match position {
            Position::OutsideHitter => Self::new(0.25, 0.35, 0.15, 0.15, 0.10),
            Position::Opposite => Self::new(0.10, 0.40, 0.20, 0.20, 0.10),
            Position::Setter => Self::new(0.15, 0.10, 0.25, 0.15, 0.35),
            Position::MiddleBlocker => Self::new(0.05, 0.30, 0.15, 0.40, 0.10),
            Position::Libero => Self::new(0.40, 0.00, 0.00, 0.00, 0.60),
            Position::DefenseSpecialist => Self::new(0.35, 0.05, 0.10, 0.05, 0.45),
            Position::ServerSpecialist => Self::DEFAULT,
        }
    }

    pub fn sum(&self) -> f64 {
        self.reception + self.attack + self.serve + self.block + self.dig
    }
}

/// Sum of counters, widened first so saturated counters cannot overflow.
fn total(counters: &[u32]) -> f64 {
    counters.iter().map(|&c| c as f64).sum()
}

/// Weighted pass quality over all reception attempts, in [0, 3].
pub fn reception_efficiency(s: &StatLine) -> f64 {
    let attempts = total(&[s.a_pass, s.b_pass, s.c_pass, s.pass_errors]);
    let graded = 3.0 * s.a_pass as f64 + 2.0 * s.b_pass as f64 + s.c_pass as f64;
    ratio(graded, attempts)
}

/// (kills - errors) / attempts. Negative when errors outnumber kills.
pub fn attack_efficiency(s: &StatLine) -> f64 {
    ratio(s.kills as f64 - s.attack_errors as f64, s.attack_attempts)
}

pub fn kill_percentage(s: &StatLine) -> f64 {
    ratio(s.kills as f64, s.attack_attempts)
}

pub fn serve_efficiency(s: &StatLine) -> f64 {
    ratio(s.aces as f64 - s.serve_errors as f64, s.serve_attempts)
}

pub fn ace_percentage(s: &StatLine) -> f64 {
    ratio(s.aces as f64, s.serve_attempts)
}

pub fn blocks_per_set(s: &StatLine) -> f64 {
    ratio(total(&[s.solo_blocks, s.assist_blocks]), s.sets_played)
}

pub fn dig_efficiency(s: &StatLine) -> f64 {
    ratio(s.digs as f64, s.dig_attempts)
}

/// Green cards count in favour, yellow and red against, per match.
pub fn disciplinary_score(s: &StatLine) -> f64 {
    let score = 2.0 * s.green_cards as f64 - s.yellow_cards as f64 - 3.0 * s.red_cards as f64;
    ratio(score, s.matches_played)
}

pub fn cards_per_match(s: &StatLine) -> f64 {
    ratio(total(&[s.yellow_cards, s.red_cards]), s.matches_played)
}

/// 0-100 behaviour rating. Players with no matches start at 100.
pub fn conduct_rating(s: &StatLine) -> f64 {
    if s.matches_played == 0 {
        return 100.0;
    }
    let penalties = 5.0 * (s.yellow_cards as f64 + 2.0 * s.red_cards as f64);
    let bonuses = 2.0 * s.green_cards as f64;
    (100.0 - penalties + bonuses).clamp(0.0, 100.0)
}

/// Share of error-free attempts, 0-100. 100 with no attempts at all.
pub fn consistency_score(s: &StatLine) -> f64 {
    let attempts = total(&[s.attack_attempts, s.serve_attempts, s.dig_attempts]);
    let errors = total(&[s.attack_errors, s.serve_errors, s.block_errors]);
    let error_rate = ratio_or(errors, attempts, 0.0);
    (1.0 - error_rate).max(0.0) * 100.0
}

/// How evenly skills are spread, 0-100.
///
/// One minus the coefficient of variation of the five skill scores. The
/// reception score is left on its 0-3 scale here.
pub fn versatility_score(s: &StatLine) -> f64 {
    let skills = [
        reception_efficiency(s),
        attack_efficiency(s) + 0.5,
        serve_efficiency(s) + 0.5,
        blocks_per_set(s) / 2.0,
        dig_efficiency(s),
    ];
    let n = skills.len() as f64;
    let mean = skills.iter().sum::<f64>() / n;
    let variance = skills.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let cv = if mean > 0.0 { variance.sqrt() / mean } else { 1.0 };
    ((1.0 - cv) * 100.0).max(0.0)
}

/// Position-weighted composite of the five skills, scaled by 100.
///
/// Not clamped: attack or serve efficiencies above 0.5 push the shifted
/// score past 1 and the index past 100.
pub fn performance_index(s: &StatLine, position: Position) -> f64 {
    let w = SkillWeights::for_position(position);

    let reception = reception_efficiency(s) / 3.0;
    let attack = (attack_efficiency(s) + 0.5).max(0.0);
    let serve = (serve_efficiency(s) + 0.5).max(0.0);
    let block = (blocks_per_set(s) / 2.0).min(1.0);
    let dig = dig_efficiency(s);

    (reception * w.reception
        + attack * w.attack
        + serve * w.serve
        + block * w.block
        + dig * w.dig)
        * 100.0
}

/// Every derived metric for one player.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedStats {
    pub reception_efficiency: f64,
    pub attack_efficiency: f64,
    pub kill_percentage: f64,
    pub serve_efficiency: f64,
    pub ace_percentage: f64,
    pub blocks_per_set: f64,
    pub dig_efficiency: f64,
    pub performance_index: f64,
    pub consistency_score: f64,
    pub versatility_score: f64,
    pub disciplinary_score: f64,
    pub cards_per_match: f64,
    pub conduct_rating: f64,
}

impl AdvancedStats {
    pub fn compute(s: &StatLine, position: Position) -> Self {
        Self {
            reception_efficiency: reception_efficiency(s),
            attack_efficiency: attack_efficiency(s),
            kill_percentage: kill_percentage(s),
            serve_efficiency: serve_efficiency(s),
            ace_percentage: ace_percentage(s),
            blocks_per_set: blocks_per_set(s),
            dig_efficiency: dig_efficiency(s),
            performance_index: performance_index(s, position),
            consistency_score: consistency_score(s),
            versatility_score: versatility_score(s),
            disciplinary_score: disciplinary_score(s),
            cards_per_match: cards_per_match(s),
            conduct_rating: conduct_rating(s),
        }
    }
}

/// Response body of the player stats endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatsReport {
    pub player_id: PlayerId,
    pub player_name: String,
    pub position: Position,
    pub stats: AdvancedStats,
}

impl PlayerStatsReport {
    pub fn from_player(player: &Player) -> Self {
        Self {
            player_id: player.id.clone(),
            player_name: player.name.clone(),
            position: player.main_position,
            stats: AdvancedStats::compute(&player.stats, player.main_position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EPS: f64 = 1e-9;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn test_weights_sum_to_one() {
        for p in Position::ALL {
            assert!(close(SkillWeights::for_position(p).sum(), 1.0), "{:?}", p);
        }
    }

    #[test]
    fn test_server_specialist_uses_default_weights() {
        assert_eq!(
            SkillWeights::for_position(Position::ServerSpecialist),
            SkillWeights::DEFAULT
        );
    }

    #[test]
    fn test_reception_efficiency_example() {
        let s = StatLine {
            a_pass: 10,
            b_pass: 5,
            c_pass: 2,
            pass_errors: 3,
            ..Default::default()
        };
        assert!(close(reception_efficiency(&s), 2.1));
    }

    #[test]
    fn test_attack_example() {
        let s = StatLine {
            kills: 20,
            attack_errors: 5,
            attack_attempts: 50,
            ..Default::default()
        };
        assert!(close(attack_efficiency(&s), 0.3));
        assert!(close(kill_percentage(&s), 0.4));
    }

    #[test]
    fn test_attack_efficiency_can_go_negative() {
        let s = StatLine {
            kills: 1,
            attack_errors: 6,
            attack_attempts: 10,
            ..Default::default()
        };
        assert!(close(attack_efficiency(&s), -0.5));
    }

    #[test]
    fn test_no_matches_discipline_defaults() {
        let s = StatLine::default();
        assert_eq!(conduct_rating(&s), 100.0);
        assert_eq!(disciplinary_score(&s), 0.0);
        assert_eq!(cards_per_match(&s), 0.0);
    }

    #[test]
    fn test_conduct_rating_example() {
        let s = StatLine {
            yellow_cards: 2,
            red_cards: 1,
            green_cards: 1,
            matches_played: 1,
            ..Default::default()
        };
        assert_eq!(conduct_rating(&s), 82.0);
        assert!(close(disciplinary_score(&s), 2.0 - 2.0 - 3.0));
        assert!(close(cards_per_match(&s), 3.0));
    }

    #[test]
    fn test_conduct_rating_clamped() {
        let s = StatLine {
            red_cards: 50,
            matches_played: 3,
            ..Default::default()
        };
        assert_eq!(conduct_rating(&s), 0.0);

        let s = StatLine {
            green_cards: 50,
            matches_played: 3,
            ..Default::default()
        };
        assert_eq!(conduct_rating(&s), 100.0);
    }

    #[test]
    fn test_all_zero_record() {
        let stats = AdvancedStats::compute(&StatLine::default(), Position::Libero);
        assert_eq!(stats.reception_efficiency, 0.0);
        assert_eq!(stats.attack_efficiency, 0.0);
        assert_eq!(stats.kill_percentage, 0.0);
        assert_eq!(stats.serve_efficiency, 0.0);
        assert_eq!(stats.ace_percentage, 0.0);
        assert_eq!(stats.blocks_per_set, 0.0);
        assert_eq!(stats.dig_efficiency, 0.0);
        assert_eq!(stats.disciplinary_score, 0.0);
        assert_eq!(stats.cards_per_match, 0.0);
        assert_eq!(stats.versatility_score, 0.0);
        assert_eq!(stats.conduct_rating, 100.0);
        assert_eq!(stats.consistency_score, 100.0);
        // Liberos carry no attack or serve weight, so nothing is shifted in.
        assert_eq!(stats.performance_index, 0.0);
    }

    #[test]
    fn test_all_zero_is_nan_free_for_every_position() {
        for p in Position::ALL {
            let json = serde_json::to_value(AdvancedStats::compute(&StatLine::default(), p)).unwrap();
            for (key, value) in json.as_object().unwrap() {
                assert!(value.is_number(), "{} for {:?} is {}", key, p, value);
            }
        }
    }

    #[test]
    fn test_consistency_score() {
        let s = StatLine {
            attack_attempts: 40,
            serve_attempts: 40,
            dig_attempts: 20,
            attack_errors: 5,
            serve_errors: 3,
            block_errors: 2,
            ..Default::default()
        };
        assert!(close(consistency_score(&s), 90.0));

        let s = StatLine {
            attack_attempts: 1,
            attack_errors: 1,
            block_errors: 10,
            ..Default::default()
        };
        assert_eq!(consistency_score(&s), 0.0);
    }

    #[test]
    fn test_versatility_even_skills() {
        // reception 1.0, attack 0.5+0.5, serve 0.5+0.5, blocks 2/2, digs 1.0
        let s = StatLine {
            a_pass: 0,
            c_pass: 4,
            kills: 5,
            attack_attempts: 10,
            aces: 5,
            serve_attempts: 10,
            solo_blocks: 4,
            sets_played: 2,
            digs: 3,
            dig_attempts: 3,
            ..Default::default()
        };
        assert!(close(versatility_score(&s), 100.0));
    }

    #[test]
    fn test_bounded_ratios() {
        let s = StatLine {
            a_pass: 7,
            pass_errors: 1,
            kills: 9,
            attack_attempts: 9,
            aces: 0,
            serve_attempts: 4,
            digs: 2,
            dig_attempts: 8,
            ..Default::default()
        };
        let r = reception_efficiency(&s);
        assert!((0.0..=3.0).contains(&r));
        for v in [kill_percentage(&s), ace_percentage(&s), dig_efficiency(&s)] {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_saturated_counters_stay_in_range() {
        let max = u32::MAX;
        let s = StatLine {
            a_pass: max,
            b_pass: max,
            c_pass: max,
            pass_errors: max,
            kills: max,
            attack_errors: max,
            attack_attempts: max,
            aces: max,
            serve_errors: max,
            serve_attempts: max,
            solo_blocks: max,
            assist_blocks: max,
            block_errors: max,
            digs: max,
            dig_attempts: max,
            sets_played: max,
            matches_played: max,
            yellow_cards: max,
            red_cards: max,
            green_cards: max,
            ..Default::default()
        };
        let stats = AdvancedStats::compute(&s, Position::OutsideHitter);

        assert!(close(stats.reception_efficiency, 1.5));
        assert!((0.0..=3.0).contains(&stats.reception_efficiency));
        for v in [stats.kill_percentage, stats.ace_percentage, stats.dig_efficiency] {
            assert!((0.0..=1.0).contains(&v));
        }
        for v in [stats.attack_efficiency, stats.serve_efficiency] {
            assert!((-1.0..=1.0).contains(&v));
        }
        assert!(close(stats.blocks_per_set, 2.0));
        assert!(close(stats.cards_per_match, 2.0));
        for v in [stats.consistency_score, stats.versatility_score, stats.conduct_rating] {
            assert!((0.0..=100.0).contains(&v));
        }
        assert!(stats.performance_index.is_finite());
        assert!(stats.disciplinary_score.is_finite());
    }

    #[test]
    fn test_single_saturated_counter() {
        let s = StatLine {
            a_pass: u32::MAX,
            pass_errors: 1,
            ..Default::default()
        };
        let r = reception_efficiency(&s);
        assert!(r > 2.99 && r <= 3.0);
    }

    #[test]
    fn test_position_changes_performance_index() {
        let s = StatLine {
            a_pass: 10,
            b_pass: 5,
            kills: 20,
            attack_errors: 5,
            attack_attempts: 50,
            solo_blocks: 6,
            assist_blocks: 4,
            sets_played: 10,
            digs: 8,
            dig_attempts: 10,
            ..Default::default()
        };
        let oh = performance_index(&s, Position::OutsideHitter);
        let mb = performance_index(&s, Position::MiddleBlocker);
        assert!((oh - mb).abs() > 1e-6);
    }

    #[test]
    fn test_performance_index_not_clamped() {
        let s = StatLine {
            kills: 10,
            attack_attempts: 10,
            aces: 10,
            serve_attempts: 10,
            ..Default::default()
        };
        // attack and serve both shift to 1.5
        assert!(close(performance_index(&s, Position::Opposite), 90.0));
        assert!(performance_index(&s, Position::Opposite) <= 100.0);

        let s = StatLine {
            kills: 10,
            attack_attempts: 10,
            aces: 10,
            serve_attempts: 10,
            a_pass: 10,
            solo_blocks: 10,
            sets_played: 1,
            digs: 10,
            dig_attempts: 10,
            ..Default::default()
        };
        assert!(performance_index(&s, Position::Opposite) > 100.0);
    }

    #[test]
    fn test_pure() {
        let s = StatLine {
            a_pass: 3,
            kills: 7,
            attack_attempts: 13,
            matches_played: 2,
            yellow_cards: 1,
            ..Default::default()
        };
        let a = AdvancedStats::compute(&s, Position::Setter);
        let b = AdvancedStats::compute(&s, Position::Setter);
        assert_eq!(a, b);
    }

    #[test]
    fn test_report_shape() {
        let player = Player::new(
            "Ana Moser".to_string(),
            chrono::NaiveDate::from_ymd_opt(1968, 8, 14).unwrap(),
            1.85,
            Position::OutsideHitter,
            None,
        );
        let report = PlayerStatsReport::from_player(&player);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["playerName"], "Ana Moser");
        assert_eq!(json["position"], "OH");
        assert_eq!(json["playerId"], player.id.as_str());
        assert_eq!(json["stats"]["conductRating"], 100.0);
        assert!(json["stats"].get("performanceIndex").is_some());
    }
}
