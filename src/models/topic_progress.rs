use crate::models::difficulty::Difficulty;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per (user, topic) ledger. Created on first attempt, mutated only by the
/// progress service after each evaluated practice attempt, never deleted.
///
/// `streak` is the lifetime run of consecutive correct answers within the
/// topic; it is unrelated to the analytics daily streak.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TopicProgress {
    pub user_id: Uuid,
    pub topic: String,
    pub category: String,
    pub current_difficulty: Difficulty,
    pub attempts: i32,
    pub corrects: i32,
    pub streak: i32,
    pub consecutive_correct: i32,
    pub consecutive_incorrect: i32,
    pub easy_total: i32,
    pub easy_correct: i32,
    pub medium_total: i32,
    pub medium_correct: i32,
    pub hard_total: i32,
    pub hard_correct: i32,
    pub total_time_seconds: i64,
    pub average_time_per_question: f64,
    pub last_practiced: Option<DateTime<Utc>>,
    pub last_difficulty_change: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TopicProgress {
    /// Fold one evaluated attempt into the counters. The attempt is booked
    /// under the question's own difficulty, not the topic's current one.
    pub fn record_outcome(
        &mut self,
        difficulty: Difficulty,
        is_correct: bool,
        elapsed_seconds: i32,
        now: DateTime<Utc>,
    ) {
        self.attempts += 1;
        if is_correct {
            self.corrects += 1;
            self.consecutive_correct += 1;
            self.consecutive_incorrect = 0;
            self.streak += 1;
        } else {
            self.consecutive_correct = 0;
            self.consecutive_incorrect += 1;
            self.streak = 0;
        }

        let (total, correct) = match difficulty {
            Difficulty::Easy => (&mut self.easy_total, &mut self.easy_correct),
            Difficulty::Medium => (&mut self.medium_total, &mut self.medium_correct),
            Difficulty::Hard => (&mut self.hard_total, &mut self.hard_correct),
        };
        *total += 1;
        if is_correct {
            *correct += 1;
        }

        self.total_time_seconds += i64::from(elapsed_seconds.max(0));
        self.average_time_per_question = self.total_time_seconds as f64 / self.attempts as f64;
        self.last_practiced = Some(now);
        self.updated_at = now;
    }

    /// Move to a new level and wipe the consecutive counters so the next
    /// adaptive window builds on fresh evidence.
    pub fn apply_difficulty_change(&mut self, new_difficulty: Difficulty, now: DateTime<Utc>) {
        self.current_difficulty = new_difficulty;
        self.last_difficulty_change = Some(now);
        self.consecutive_correct = 0;
        self.consecutive_incorrect = 0;
        self.updated_at = now;
    }

    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            f64::from(self.corrects) / f64::from(self.attempts) * 100.0
        }
    }

    /// Ledger invariants checked before the submit transaction commits.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.corrects > self.attempts {
            return Err(format!(
                "corrects {} exceeds attempts {} for topic '{}'",
                self.corrects, self.attempts, self.topic
            ));
        }
        for (name, correct, total) in [
            ("easy", self.easy_correct, self.easy_total),
            ("medium", self.medium_correct, self.medium_total),
            ("hard", self.hard_correct, self.hard_total),
        ] {
            if correct > total {
                return Err(format!(
                    "{}_correct {} exceeds {}_total {} for topic '{}'",
                    name, correct, name, total, self.topic
                ));
            }
        }
        if self.total_time_seconds < 0 {
            return Err(format!(
                "negative total_time_seconds for topic '{}'",
                self.topic
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> TopicProgress {
        let now = Utc::now();
        TopicProgress {
            user_id: Uuid::new_v4(),
            topic: "Percentages".into(),
            category: "Quantitative Ability".into(),
            current_difficulty: Difficulty::Easy,
            attempts: 0,
            corrects: 0,
            streak: 0,
            consecutive_correct: 0,
            consecutive_incorrect: 0,
            easy_total: 0,
            easy_correct: 0,
            medium_total: 0,
            medium_correct: 0,
            hard_total: 0,
            hard_correct: 0,
            total_time_seconds: 0,
            average_time_per_question: 0.0,
            last_practiced: None,
            last_difficulty_change: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn correct_attempt_updates_counters() {
        let mut p = fresh();
        let now = Utc::now();
        p.record_outcome(Difficulty::Easy, true, 20, now);
        assert_eq!(p.attempts, 1);
        assert_eq!(p.corrects, 1);
        assert_eq!(p.streak, 1);
        assert_eq!(p.consecutive_correct, 1);
        assert_eq!(p.consecutive_incorrect, 0);
        assert_eq!(p.easy_total, 1);
        assert_eq!(p.easy_correct, 1);
        assert_eq!(p.total_time_seconds, 20);
        assert_eq!(p.last_practiced, Some(now));
        p.check_invariants().unwrap();
    }

    #[test]
    fn incorrect_attempt_resets_streak_and_consecutive_correct() {
        let mut p = fresh();
        let now = Utc::now();
        p.record_outcome(Difficulty::Easy, true, 10, now);
        p.record_outcome(Difficulty::Easy, true, 10, now);
        p.record_outcome(Difficulty::Medium, false, 40, now);
        assert_eq!(p.attempts, 3);
        assert_eq!(p.corrects, 2);
        assert_eq!(p.streak, 0);
        assert_eq!(p.consecutive_correct, 0);
        assert_eq!(p.consecutive_incorrect, 1);
        assert_eq!(p.medium_total, 1);
        assert_eq!(p.medium_correct, 0);
        p.check_invariants().unwrap();
    }

    #[test]
    fn average_time_tracks_total_over_attempts() {
        let mut p = fresh();
        let now = Utc::now();
        p.record_outcome(Difficulty::Easy, true, 10, now);
        p.record_outcome(Difficulty::Easy, false, 30, now);
        assert_eq!(p.total_time_seconds, 40);
        assert!((p.average_time_per_question - 20.0).abs() < f64::EPSILON);
        assert!(
            (p.average_time_per_question * p.attempts as f64 - p.total_time_seconds as f64).abs()
                < 1e-9
        );
    }

    #[test]
    fn difficulty_change_resets_consecutive_counters_only() {
        let mut p = fresh();
        let now = Utc::now();
        for _ in 0..5 {
            p.record_outcome(Difficulty::Easy, true, 15, now);
        }
        assert_eq!(p.consecutive_correct, 5);
        p.apply_difficulty_change(Difficulty::Medium, now);
        assert_eq!(p.current_difficulty, Difficulty::Medium);
        assert_eq!(p.consecutive_correct, 0);
        assert_eq!(p.consecutive_incorrect, 0);
        // the lifetime streak survives a level change
        assert_eq!(p.streak, 5);
        assert_eq!(p.last_difficulty_change, Some(now));
    }

    #[test]
    fn invariant_check_catches_corruption() {
        let mut p = fresh();
        p.corrects = 3;
        p.attempts = 2;
        assert!(p.check_invariants().is_err());
    }
}
