use rand::seq::SliceRandom;
use rand::Rng;

/// A per-delivery permutation of a question's options.
///
/// `permutation[display_index] == canonical_index`; the correct display
/// index is retained server-side and never sent with the question.
#[derive(Debug, Clone)]
pub struct ShuffledDelivery {
    pub shuffled_options: Vec<String>,
    pub permutation: Vec<usize>,
    pub correct_display_index: usize,
}

pub struct ShuffleService;

impl ShuffleService {
    /// Draw a uniformly random permutation of the options.
    pub fn shuffle(
        options: &[String],
        correct_index: usize,
        rng: &mut impl Rng,
    ) -> ShuffledDelivery {
        let mut permutation: Vec<usize> = (0..options.len()).collect();
        permutation.shuffle(rng);

        let shuffled_options: Vec<String> = permutation
            .iter()
            .map(|&canonical| options[canonical].clone())
            .collect();
        let correct_display_index = permutation
            .iter()
            .position(|&canonical| canonical == correct_index)
            .unwrap_or(0);

        ShuffledDelivery {
            shuffled_options,
            permutation,
            correct_display_index,
        }
    }

    /// Translate a display index back to the canonical option index.
    pub fn to_canonical(permutation: &[usize], display_index: usize) -> Option<usize> {
        permutation.get(display_index).copied()
    }

    /// Evaluate a choice against a client-echoed shuffled list by comparing
    /// option text with the canonical correct text. Returns
    /// `(is_correct, correct_display_index)`.
    pub fn evaluate_against_options(
        displayed: &[String],
        chosen_index: usize,
        correct_text: &str,
    ) -> (bool, usize) {
        let is_correct = displayed
            .get(chosen_index)
            .map(|text| text == correct_text)
            .unwrap_or(false);
        let correct_display_index = displayed
            .iter()
            .position(|text| text == correct_text)
            .unwrap_or(0);
        (is_correct, correct_display_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn opts(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn shuffle_preserves_options_and_tracks_correct() {
        let options = opts(&["a", "b", "c", "d"]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let delivery = ShuffleService::shuffle(&options, 2, &mut rng);
            let mut sorted = delivery.shuffled_options.clone();
            sorted.sort();
            assert_eq!(sorted, opts(&["a", "b", "c", "d"]));
            assert_eq!(delivery.shuffled_options[delivery.correct_display_index], "c");
        }
    }

    #[test]
    fn permutation_round_trips_every_display_index() {
        let options = opts(&["a", "b", "c", "d"]);
        let mut rng = StdRng::seed_from_u64(11);
        let delivery = ShuffleService::shuffle(&options, 1, &mut rng);
        for (display, &canonical) in delivery.permutation.iter().enumerate() {
            assert_eq!(
                ShuffleService::to_canonical(&delivery.permutation, display),
                Some(canonical)
            );
            assert_eq!(delivery.shuffled_options[display], options[canonical]);
        }
        assert_eq!(
            ShuffleService::to_canonical(&delivery.permutation, options.len()),
            None
        );
    }

    #[test]
    fn evaluate_against_options_matches_by_text() {
        let displayed = opts(&["c", "a", "d", "b"]);
        let (correct, correct_display) =
            ShuffleService::evaluate_against_options(&displayed, 0, "c");
        assert!(correct);
        assert_eq!(correct_display, 0);

        let (wrong, correct_display) =
            ShuffleService::evaluate_against_options(&displayed, 3, "c");
        assert!(!wrong);
        assert_eq!(correct_display, 0);
    }
}
