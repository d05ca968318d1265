use crate::error::{Error, Result};
use crate::models::difficulty::Difficulty;
use crate::models::question::PracticeQuestion;
use crate::services::analytics_service::round1;
use crate::services::progress_service::ProgressService;
use crate::services::question_service::QuestionService;
use crate::services::shuffle_service::{ShuffleService, ShuffledDelivery};
use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Candidate pool cap per difficulty level.
pub const CANDIDATE_CAP: i64 = 50;
/// How many recent questions feed the concept-diversity score.
pub const RECENT_HISTORY: i64 = 3;

/// Ephemeral permutations of delivered questions, keyed by
/// (user, question). An entry lives until the matching submit consumes it;
/// an abandoned turn leaves no persistent state behind.
#[derive(Clone, Default)]
pub struct DeliveryStore {
    inner: Arc<Mutex<HashMap<(Uuid, Uuid), ShuffledDelivery>>>,
}

impl DeliveryStore {
    pub fn put(&self, user_id: Uuid, question_id: Uuid, delivery: ShuffledDelivery) {
        let mut guard = self.inner.lock().expect("delivery store mutex poisoned");
        guard.insert((user_id, question_id), delivery);
    }

    pub fn get(&self, user_id: Uuid, question_id: Uuid) -> Option<ShuffledDelivery> {
        let guard = self.inner.lock().expect("delivery store mutex poisoned");
        guard.get(&(user_id, question_id)).cloned()
    }

    pub fn remove(&self, user_id: Uuid, question_id: Uuid) {
        let mut guard = self.inner.lock().expect("delivery store mutex poisoned");
        guard.remove(&(user_id, question_id));
    }
}

/// A question ready for delivery: options already shuffled, the correct
/// display index held back in the DeliveryStore.
#[derive(Debug, Clone)]
pub struct NextQuestion {
    pub question_id: Uuid,
    pub question: String,
    pub options: Vec<String>,
    pub category: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub image_ref: Option<String>,
}

/// Evaluation result plus the adaptive addendum for the UI.
#[derive(Debug, Clone)]
pub struct SubmitFeedback {
    pub is_correct: bool,
    pub chosen_display_index: usize,
    pub correct_display_index: usize,
    pub explanation: String,
    pub options_displayed: Vec<String>,
    pub old_difficulty: Difficulty,
    pub new_difficulty: Difficulty,
    pub consecutive_correct: i32,
    pub consecutive_incorrect: i32,
    pub overall_accuracy: f64,
    pub attempts: i32,
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct PracticeService {
    questions: QuestionService,
    progress: ProgressService,
    deliveries: DeliveryStore,
}

impl PracticeService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            questions: QuestionService::new(pool.clone()),
            progress: ProgressService::new(pool),
            deliveries: DeliveryStore::default(),
        }
    }

    /// Pick one unseen question for the user at their current level,
    /// preferring concept diversity against the last few turns. `None`
    /// means the topic (or the whole category) is exhausted.
    pub async fn next_question(
        &self,
        user_id: Uuid,
        category: &str,
        topic: Option<&str>,
    ) -> Result<Option<NextQuestion>> {
        let topic = match topic {
            Some(t) => t.to_string(),
            None => {
                let mut open_topics = self.questions.topics_with_unseen(user_id, category).await?;
                if open_topics.is_empty() {
                    return Ok(None);
                }
                let mut rng = rand::thread_rng();
                open_topics.shuffle(&mut rng);
                open_topics.remove(0)
            }
        };

        let target = self
            .progress
            .get_progress(user_id, &topic)
            .await?
            .map(|p| p.current_difficulty)
            .unwrap_or(Difficulty::Easy);

        let mut candidates = self
            .questions
            .unseen_candidates(user_id, category, &topic, target, CANDIDATE_CAP)
            .await?;
        if candidates.is_empty() {
            for fallback in Difficulty::ALL {
                if fallback == target {
                    continue;
                }
                candidates = self
                    .questions
                    .unseen_candidates(user_id, category, &topic, fallback, CANDIDATE_CAP)
                    .await?;
                if !candidates.is_empty() {
                    break;
                }
            }
        }
        if candidates.is_empty() {
            return Ok(None);
        }

        let recent_concepts = self
            .questions
            .recent_practice_concepts(user_id, category, &topic, RECENT_HISTORY)
            .await?;

        let mut rng = rand::thread_rng();
        let chosen = select_question(candidates, &recent_concepts, &mut rng);

        let options = chosen.options_vec();
        if options.len() < 2 || chosen.correct_index < 0 {
            return Err(Error::Internal(format!(
                "corrupt question {}: bad option set",
                chosen.id
            )));
        }
        let delivery = ShuffleService::shuffle(&options, chosen.correct_index as usize, &mut rng);
        let shuffled = delivery.shuffled_options.clone();
        self.deliveries.put(user_id, chosen.id, delivery);

        Ok(Some(NextQuestion {
            question_id: chosen.id,
            question: chosen.question,
            options: shuffled,
            category: chosen.category,
            topic: chosen.topic,
            difficulty: chosen.difficulty,
            image_ref: chosen.image_ref,
        }))
    }

    /// Evaluate a submitted answer, append it to the attempt log, and fold
    /// it into the ledger. The permutation resolves in order of preference:
    /// the retained delivery, a client-echoed shuffled list, canonical
    /// order.
    pub async fn submit_answer(
        &self,
        user_id: Uuid,
        question_id: Uuid,
        chosen_index: i32,
        elapsed_seconds: i32,
        shuffled_options: Option<Vec<String>>,
    ) -> Result<SubmitFeedback> {
        let question = self.questions.get_question(question_id).await?;
        let options = question.options_vec();
        let correct_index = question.correct_index as usize;
        let correct_text = options.get(correct_index).cloned().ok_or_else(|| {
            Error::Internal(format!(
                "corrupt question {}: correct_index out of bounds",
                question.id
            ))
        })?;

        let delivery = self.deliveries.get(user_id, question_id);
        let displayed: Vec<String> = match (&delivery, &shuffled_options) {
            (Some(d), _) => d.shuffled_options.clone(),
            (None, Some(echoed)) => echoed.clone(),
            (None, None) => options.clone(),
        };

        if chosen_index < 0 || chosen_index as usize >= displayed.len() {
            return Err(Error::BadRequest(format!(
                "chosen_index {} out of range for {} options",
                chosen_index,
                displayed.len()
            )));
        }
        let chosen_display_index = chosen_index as usize;

        let (is_correct, correct_display_index, canonical_chosen) = match &delivery {
            Some(d) => {
                let canonical = ShuffleService::to_canonical(&d.permutation, chosen_display_index)
                    .ok_or_else(|| {
                        Error::BadRequest(format!(
                            "chosen_index {} out of range for {} options",
                            chosen_index,
                            d.permutation.len()
                        ))
                    })?;
                (canonical == correct_index, d.correct_display_index, canonical)
            }
            None if shuffled_options.is_some() => {
                let (ok, correct_display) = ShuffleService::evaluate_against_options(
                    &displayed,
                    chosen_display_index,
                    &correct_text,
                );
                let canonical = options
                    .iter()
                    .position(|o| Some(o) == displayed.get(chosen_display_index))
                    .unwrap_or(chosen_display_index);
                (ok, correct_display, canonical)
            }
            None => (
                chosen_display_index == correct_index,
                correct_index,
                chosen_display_index,
            ),
        };

        let update = self
            .progress
            .apply_practice_attempt(
                user_id,
                &question,
                canonical_chosen as i32,
                is_correct,
                elapsed_seconds,
            )
            .await?;

        // Only a landed submit consumes the delivery.
        self.deliveries.remove(user_id, question_id);

        let message = if update.difficulty_changed() {
            if update.new_difficulty > update.old_difficulty {
                Some(format!(
                    "Difficulty increased to {}. Keep it up!",
                    update.new_difficulty
                ))
            } else {
                Some(format!(
                    "Difficulty lowered to {} to rebuild the basics.",
                    update.new_difficulty
                ))
            }
        } else {
            None
        };

        let progress = update.progress;
        Ok(SubmitFeedback {
            is_correct,
            chosen_display_index,
            correct_display_index,
            explanation: question.explanation,
            options_displayed: displayed,
            old_difficulty: update.old_difficulty,
            new_difficulty: update.new_difficulty,
            consecutive_correct: progress.consecutive_correct,
            consecutive_incorrect: progress.consecutive_incorrect,
            overall_accuracy: round1(progress.accuracy()),
            attempts: progress.attempts,
            message,
        })
    }
}

/// Score candidates by concept overlap with the recent history and take
/// the least-covered one; uniform pick when there is no history. The noise
/// term only breaks ties between equal scores.
pub(crate) fn select_question(
    mut candidates: Vec<PracticeQuestion>,
    recent_concepts: &[Vec<String>],
    rng: &mut impl Rng,
) -> PracticeQuestion {
    if candidates.len() == 1 {
        return candidates.remove(0);
    }
    if recent_concepts.iter().all(|c| c.is_empty()) {
        let idx = rng.gen_range(0..candidates.len());
        return candidates.swap_remove(idx);
    }

    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for concepts in recent_concepts {
        for concept in concepts {
            *frequency.entry(concept.as_str()).or_insert(0) += 1;
        }
    }

    let mut best: Option<(usize, f64)> = None;
    for (idx, candidate) in candidates.iter().enumerate() {
        let overlap: usize = candidate
            .concepts_vec()
            .iter()
            .map(|c| frequency.get(c.as_str()).copied().unwrap_or(0))
            .sum();
        let score = overlap as f64 + rng.gen_range(0.0..0.5);
        match best {
            Some((_, best_score)) if score >= best_score => {}
            _ => best = Some((idx, score)),
        }
    }

    let (idx, _) = best.unwrap_or((0, 0.0));
    candidates.swap_remove(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn question(id_byte: u8, concepts: &[&str]) -> PracticeQuestion {
        PracticeQuestion {
            id: Uuid::from_bytes([id_byte; 16]),
            category: "Quantitative Ability".into(),
            topic: "Percentages".into(),
            difficulty: Difficulty::Easy,
            question: "q".into(),
            options: serde_json::json!(["a", "b", "c", "d"]),
            correct_index: 0,
            explanation: String::new(),
            concepts: serde_json::json!(concepts),
            image_ref: None,
            created_at: time::now(),
        }
    }

    #[test]
    fn prefers_disjoint_concepts_over_overlapping() {
        let recent: Vec<Vec<String>> = vec![
            vec!["ratio".into(), "fractions".into()],
            vec!["ratio".into()],
            vec!["fractions".into()],
        ];
        let mut rng = StdRng::seed_from_u64(99);
        let mut disjoint_wins = 0;
        for _ in 0..200 {
            let candidates = vec![
                question(1, &["ratio", "fractions"]),
                question(2, &["interest", "profit"]),
            ];
            let picked = select_question(candidates, &recent, &mut rng);
            if picked.id == Uuid::from_bytes([2; 16]) {
                disjoint_wins += 1;
            }
        }
        // noise is capped at 0.5 while the overlap gap is >= 1, so the
        // disjoint candidate must win every time
        assert_eq!(disjoint_wins, 200);
    }

    #[test]
    fn uniform_pick_without_history_covers_all_candidates() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let candidates = vec![question(1, &[]), question(2, &[]), question(3, &[])];
            let picked = select_question(candidates, &[], &mut rng);
            seen.insert(picked.id);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn single_candidate_short_circuits() {
        let mut rng = StdRng::seed_from_u64(5);
        let picked = select_question(vec![question(7, &["x"])], &[vec!["x".into()]], &mut rng);
        assert_eq!(picked.id, Uuid::from_bytes([7; 16]));
    }
}
