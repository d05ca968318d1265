use crate::models::difficulty::Difficulty;
use sqlx::FromRow;

/// Window size the controller looks at, newest first.
pub const WINDOW_SIZE: i64 = 10;
/// Below this many attempts in the window the level is held.
pub const MIN_WINDOW: usize = 5;
pub const LEVEL_UP_ACCURACY: f64 = 75.0;
pub const LEVEL_DOWN_ACCURACY: f64 = 50.0;

/// One attempt as seen by the controller.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct WindowAttempt {
    pub is_correct: bool,
    pub elapsed_seconds: i32,
}

pub struct AdaptiveService;

impl AdaptiveService {
    /// Decide whether the level moves. Returns `Some(new_level)` on a
    /// change, `None` to hold. A change is always exactly one step.
    ///
    /// The window filters noise better than consecutive-hit heuristics, and
    /// gating a level-up on the average time of correct answers keeps
    /// lucky-but-slow runs from escalating.
    pub fn decide(window: &[WindowAttempt], current: Difficulty) -> Option<Difficulty> {
        if window.len() < MIN_WINDOW {
            return None;
        }

        let accuracy = Self::accuracy(window);
        if accuracy >= LEVEL_UP_ACCURACY && current < Difficulty::Hard {
            if let Some(avg) = Self::avg_time_correct(window) {
                if avg <= current.max_seconds_for_correct() {
                    return Some(current.step_up());
                }
            }
        }
        if accuracy < LEVEL_DOWN_ACCURACY && current > Difficulty::Easy {
            return Some(current.step_down());
        }
        None
    }

    pub fn accuracy(window: &[WindowAttempt]) -> f64 {
        if window.is_empty() {
            return 0.0;
        }
        let corrects = window.iter().filter(|a| a.is_correct).count();
        corrects as f64 / window.len() as f64 * 100.0
    }

    /// Mean elapsed seconds over correct attempts; `None` when the window
    /// holds no correct attempt (treated as unbounded by the caller).
    pub fn avg_time_correct(window: &[WindowAttempt]) -> Option<f64> {
        let times: Vec<i32> = window
            .iter()
            .filter(|a| a.is_correct)
            .map(|a| a.elapsed_seconds)
            .collect();
        if times.is_empty() {
            return None;
        }
        Some(times.iter().map(|&t| f64::from(t)).sum::<f64>() / times.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(outcomes: &[(bool, i32)]) -> Vec<WindowAttempt> {
        outcomes
            .iter()
            .map(|&(is_correct, elapsed_seconds)| WindowAttempt {
                is_correct,
                elapsed_seconds,
            })
            .collect()
    }

    #[test]
    fn holds_under_five_attempts() {
        let w = window(&[(true, 10), (true, 10), (true, 10), (true, 10)]);
        assert_eq!(AdaptiveService::decide(&w, Difficulty::Easy), None);
    }

    #[test]
    fn levels_up_on_accurate_fast_window() {
        let w = window(&[(true, 20), (true, 18), (true, 25), (true, 22), (true, 15)]);
        assert_eq!(
            AdaptiveService::decide(&w, Difficulty::Easy),
            Some(Difficulty::Medium)
        );
    }

    #[test]
    fn full_correct_window_moves_exactly_one_step() {
        let w = window(&[(true, 20); 10]);
        assert_eq!(
            AdaptiveService::decide(&w, Difficulty::Easy),
            Some(Difficulty::Medium)
        );
        assert_eq!(
            AdaptiveService::decide(&w, Difficulty::Medium),
            Some(Difficulty::Hard)
        );
        // clamped at hard
        assert_eq!(AdaptiveService::decide(&w, Difficulty::Hard), None);
    }

    #[test]
    fn slow_correct_answers_withhold_level_up() {
        // 100% accuracy but average correct time beyond the easy 30s cap.
        let w = window(&[(true, 40), (true, 35), (true, 45), (true, 31), (true, 50)]);
        assert_eq!(AdaptiveService::decide(&w, Difficulty::Easy), None);
        // the same pace is acceptable at medium (45s cap)
        let w = window(&[(true, 40), (true, 35), (true, 45), (true, 31), (true, 44)]);
        assert_eq!(
            AdaptiveService::decide(&w, Difficulty::Medium),
            Some(Difficulty::Hard)
        );
    }

    #[test]
    fn levels_down_below_fifty_percent() {
        let w = window(&[(false, 30); 5]);
        assert_eq!(
            AdaptiveService::decide(&w, Difficulty::Medium),
            Some(Difficulty::Easy)
        );
        assert_eq!(
            AdaptiveService::decide(&w, Difficulty::Hard),
            Some(Difficulty::Medium)
        );
        // clamped at easy
        assert_eq!(AdaptiveService::decide(&w, Difficulty::Easy), None);
    }

    #[test]
    fn exact_boundaries() {
        // exactly 50% accuracy holds (level-down needs strictly less)
        let w = window(&[(true, 10), (false, 10), (true, 10), (false, 10), (true, 10), (false, 10)]);
        assert_eq!(AdaptiveService::decide(&w, Difficulty::Medium), None);

        // exactly 75% accuracy with average exactly at the cap levels up
        let w = window(&[(true, 30), (true, 30), (true, 30), (false, 99)]);
        assert_eq!(AdaptiveService::decide(&w, Difficulty::Easy), None); // only 4 attempts
        let w = window(&[
            (true, 30),
            (true, 30),
            (true, 30),
            (true, 30),
            (false, 99),
            (false, 99),
            (true, 30),
            (true, 30),
        ]);
        assert_eq!(
            AdaptiveService::decide(&w, Difficulty::Easy),
            Some(Difficulty::Medium)
        );
    }

    #[test]
    fn all_wrong_window_has_no_correct_time() {
        let w = window(&[(false, 10); 10]);
        assert_eq!(AdaptiveService::avg_time_correct(&w), None);
        // accuracy 0 at easy: no level below easy, hold
        assert_eq!(AdaptiveService::decide(&w, Difficulty::Easy), None);
    }
}
