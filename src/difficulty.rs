//! Rule-based difficulty engine
//!
//! Maps a performance snapshot to a difficulty tier with a fixed weighted
//! threshold function. There is no hidden state and nothing is learned:
//! the same snapshot always yields the same tier.

use serde::{Deserialize, Serialize};

/// Score at which the score ratio saturates
pub const SCORE_SATURATION: f64 = 300.0;
/// Reaction time (ms) at which the reaction ratio bottoms out
pub const REACTION_CEILING_MS: f64 = 1500.0;
/// Mistake count at which the mistake ratio bottoms out
pub const MISTAKE_CEILING: f64 = 5.0;

const SCORE_WEIGHT: f64 = 0.5;
const REACTION_WEIGHT: f64 = 0.25;
const MISTAKE_WEIGHT: f64 = 0.25;

/// Performance below this is EASY
pub const EASY_BELOW: f64 = 0.25;
/// Performance below this (and not EASY) is MEDIUM
pub const MEDIUM_BELOW: f64 = 0.55;

/// Difficulty classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DifficultyTier {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl DifficultyTier {
    pub const ALL: [DifficultyTier; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyTier::Easy => "EASY",
            DifficultyTier::Medium => "MEDIUM",
            DifficultyTier::Hard => "HARD",
        }
    }

    /// Static settings table for this tier
    pub fn settings(&self) -> DifficultySettings {
        match self {
            DifficultyTier::Easy => DifficultySettings {
                speed_multiplier: 0.5,
                lives_allowed: 5,
                description: "Relaxed pace, more lives",
            },
            DifficultyTier::Medium => DifficultySettings {
                speed_multiplier: 1.0,
                lives_allowed: 3,
                description: "Normal pace, standard lives",
            },
            DifficultyTier::Hard => DifficultySettings {
                speed_multiplier: 1.5,
                lives_allowed: 1,
                description: "Fast pace, minimal lives",
            },
        }
    }

    /// Speed gained per unit of distance
    pub fn speed_slope(&self) -> f32 {
        match self {
            DifficultyTier::Easy => 0.0003,
            DifficultyTier::Medium => 0.0006,
            DifficultyTier::Hard => 0.001,
        }
    }

    /// Speed ceiling
    pub fn speed_cap(&self) -> f32 {
        match self {
            DifficultyTier::Easy => 2.0,
            DifficultyTier::Medium => 3.0,
            DifficultyTier::Hard => 4.0,
        }
    }

    /// Speed after covering `distance` under this tier
    pub fn speed_at(&self, distance: f32) -> f32 {
        (1.0 + distance * self.speed_slope()).min(self.speed_cap())
    }
}

impl std::fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived per-tier game settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DifficultySettings {
    pub speed_multiplier: f64,
    pub lives_allowed: u32,
    pub description: &'static str,
}

/// Performance summary sent to the rule engine
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub score: f64,
    pub reaction_time_ms: f64,
    pub mistakes: f64,
    pub speed: f64,
    pub distance: f64,
    pub combo: f64,
}

/// Weighted performance score in [0, 1]
pub fn performance_score(snapshot: &PerformanceSnapshot) -> f64 {
    let score_ratio = (snapshot.score / SCORE_SATURATION).min(1.0);
    let reaction_ratio = (1.0 - snapshot.reaction_time_ms / REACTION_CEILING_MS).max(0.0);
    let mistake_ratio = (1.0 - snapshot.mistakes / MISTAKE_CEILING).max(0.0);

    score_ratio * SCORE_WEIGHT + reaction_ratio * REACTION_WEIGHT + mistake_ratio * MISTAKE_WEIGHT
}

/// Tier for a weighted performance score
pub fn tier_for_performance(performance: f64) -> DifficultyTier {
    if performance < EASY_BELOW {
        DifficultyTier::Easy
    } else if performance < MEDIUM_BELOW {
        DifficultyTier::Medium
    } else {
        DifficultyTier::Hard
    }
}

/// Map a snapshot to a tier
pub fn calculate_difficulty(snapshot: &PerformanceSnapshot) -> DifficultyTier {
    tier_for_performance(performance_score(snapshot))
}

/// Score-only tier used when no remote tier is available
pub fn local_tier(score: u64) -> DifficultyTier {
    if score >= 100 {
        DifficultyTier::Hard
    } else if score >= 50 {
        DifficultyTier::Medium
    } else {
        DifficultyTier::Easy
    }
}

/// Direction a player's recent results are heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlayerTrend {
    Improving,
    Stable,
    Struggling,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub trend: PlayerTrend,
    pub confidence: f64,
}

/// Number of most recent samples considered by `analyze_trends`
pub const TREND_WINDOW: usize = 5;

/// Classify the last few snapshots of a player history (oldest first)
pub fn analyze_trends(history: &[PerformanceSnapshot]) -> TrendAnalysis {
    if history.is_empty() {
        return TrendAnalysis {
            trend: PlayerTrend::Stable,
            confidence: 0.0,
        };
    }

    let recent = &history[history.len().saturating_sub(TREND_WINDOW)..];
    let n = recent.len() as f64;
    let avg_score = recent.iter().map(|s| s.score).sum::<f64>() / n;
    let avg_reaction = recent.iter().map(|s| s.reaction_time_ms).sum::<f64>() / n;

    if avg_score > 500.0 && avg_reaction < 800.0 {
        TrendAnalysis {
            trend: PlayerTrend::Improving,
            confidence: 0.8,
        }
    } else if avg_score < 200.0 || avg_reaction > 1500.0 {
        TrendAnalysis {
            trend: PlayerTrend::Struggling,
            confidence: 0.7,
        }
    } else {
        TrendAnalysis {
            trend: PlayerTrend::Stable,
            confidence: 0.6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snap(score: f64, reaction_time_ms: f64, mistakes: f64) -> PerformanceSnapshot {
        PerformanceSnapshot {
            score,
            reaction_time_ms,
            mistakes,
            speed: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_perfect_run_is_hard() {
        let s = snap(300.0, 0.0, 0.0);
        assert!((performance_score(&s) - 1.0).abs() < 1e-9);
        assert_eq!(calculate_difficulty(&s), DifficultyTier::Hard);
    }

    #[test]
    fn test_worst_run_is_easy() {
        let s = snap(0.0, 1500.0, 5.0);
        assert!(performance_score(&s).abs() < 1e-9);
        assert_eq!(calculate_difficulty(&s), DifficultyTier::Easy);
    }

    #[test]
    fn test_just_above_medium_threshold() {
        // 0.25 + 0.1167 + 0.2 = 0.5667
        let s = snap(150.0, 800.0, 1.0);
        let perf = performance_score(&s);
        assert!((perf - 0.566_666).abs() < 1e-4, "perf = {perf}");
        assert_eq!(calculate_difficulty(&s), DifficultyTier::Hard);
    }

    #[test]
    fn test_thresholds_are_exclusive_upper_bounds() {
        assert_eq!(tier_for_performance(0.2499), DifficultyTier::Easy);
        assert_eq!(tier_for_performance(0.25), DifficultyTier::Medium);
        assert_eq!(tier_for_performance(0.5499), DifficultyTier::Medium);
        assert_eq!(tier_for_performance(0.55), DifficultyTier::Hard);
    }

    #[test]
    fn test_settings_table() {
        let easy = DifficultyTier::Easy.settings();
        assert_eq!(easy.speed_multiplier, 0.5);
        assert_eq!(easy.lives_allowed, 5);
        let medium = DifficultyTier::Medium.settings();
        assert_eq!(medium.speed_multiplier, 1.0);
        assert_eq!(medium.lives_allowed, 3);
        let hard = DifficultyTier::Hard.settings();
        assert_eq!(hard.speed_multiplier, 1.5);
        assert_eq!(hard.lives_allowed, 1);
    }

    #[test]
    fn test_local_tier() {
        assert_eq!(local_tier(0), DifficultyTier::Easy);
        assert_eq!(local_tier(49), DifficultyTier::Easy);
        assert_eq!(local_tier(50), DifficultyTier::Medium);
        assert_eq!(local_tier(60), DifficultyTier::Medium);
        assert_eq!(local_tier(100), DifficultyTier::Hard);
    }

    #[test]
    fn test_speed_curve_caps_per_tier() {
        assert!((DifficultyTier::Easy.speed_at(0.0) - 1.0).abs() < 1e-6);
        assert!((DifficultyTier::Medium.speed_at(1000.0) - 1.6).abs() < 1e-5);
        assert_eq!(DifficultyTier::Easy.speed_at(1e9), 2.0);
        assert_eq!(DifficultyTier::Hard.speed_at(1e9), 4.0);
    }

    #[test]
    fn test_tier_serializes_uppercase() {
        let json = serde_json::to_string(&DifficultyTier::Medium).unwrap();
        assert_eq!(json, "\"MEDIUM\"");
        let tier: DifficultyTier = serde_json::from_str("\"HARD\"").unwrap();
        assert_eq!(tier, DifficultyTier::Hard);
    }

    #[test]
    fn test_trends() {
        assert_eq!(analyze_trends(&[]).trend, PlayerTrend::Stable);
        assert_eq!(analyze_trends(&[]).confidence, 0.0);

        let strong = vec![snap(600.0, 500.0, 0.0); 3];
        assert_eq!(analyze_trends(&strong).trend, PlayerTrend::Improving);

        let weak = vec![snap(100.0, 900.0, 2.0); 3];
        assert_eq!(analyze_trends(&weak).trend, PlayerTrend::Struggling);

        let middling = vec![snap(300.0, 1000.0, 1.0); 3];
        assert_eq!(analyze_trends(&middling).trend, PlayerTrend::Stable);
    }

    #[test]
    fn test_trends_only_look_at_recent_window() {
        let mut history = vec![snap(0.0, 3000.0, 5.0); 10];
        history.extend(vec![snap(900.0, 300.0, 0.0); TREND_WINDOW]);
        assert_eq!(analyze_trends(&history).trend, PlayerTrend::Improving);
    }

    proptest! {
        #[test]
        fn prop_rule_is_pure(
            score in 0.0f64..5000.0,
            reaction in 0.0f64..5000.0,
            mistakes in 0.0f64..20.0,
        ) {
            let s = snap(score, reaction, mistakes);
            prop_assert_eq!(calculate_difficulty(&s), calculate_difficulty(&s));
        }

        #[test]
        fn prop_performance_in_unit_interval(
            score in 0.0f64..1e6,
            reaction in 0.0f64..1e6,
            mistakes in 0.0f64..1e3,
        ) {
            let perf = performance_score(&snap(score, reaction, mistakes));
            prop_assert!((0.0..=1.0).contains(&perf));
        }

        #[test]
        fn prop_more_score_never_lowers_tier(
            score in 0.0f64..1000.0,
            extra in 0.0f64..1000.0,
            reaction in 0.0f64..3000.0,
            mistakes in 0.0f64..10.0,
        ) {
            let low = calculate_difficulty(&snap(score, reaction, mistakes));
            let high = calculate_difficulty(&snap(score + extra, reaction, mistakes));
            prop_assert!(high as u8 >= low as u8);
        }
    }
}
