use serde::{Deserialize, Serialize};
use std::fmt;

/// Practice difficulty. Totally ordered: easy < medium < hard.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "difficulty", rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Fallback search order used by the selector when the target level is
    /// exhausted.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn step_up(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium | Difficulty::Hard => Difficulty::Hard,
        }
    }

    pub fn step_down(self) -> Self {
        match self {
            Difficulty::Hard => Difficulty::Medium,
            Difficulty::Medium | Difficulty::Easy => Difficulty::Easy,
        }
    }

    /// Average time a correct answer may take (seconds) before a level-up
    /// is withheld.
    pub fn max_seconds_for_correct(self) -> f64 {
        match self {
            Difficulty::Easy => 30.0,
            Difficulty::Medium => 45.0,
            Difficulty::Hard => 60.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_easy_medium_hard() {
        assert!(Difficulty::Easy < Difficulty::Medium);
        assert!(Difficulty::Medium < Difficulty::Hard);
    }

    #[test]
    fn steps_move_one_level_and_clamp() {
        assert_eq!(Difficulty::Easy.step_up(), Difficulty::Medium);
        assert_eq!(Difficulty::Medium.step_up(), Difficulty::Hard);
        assert_eq!(Difficulty::Hard.step_up(), Difficulty::Hard);
        assert_eq!(Difficulty::Hard.step_down(), Difficulty::Medium);
        assert_eq!(Difficulty::Easy.step_down(), Difficulty::Easy);
    }
}
