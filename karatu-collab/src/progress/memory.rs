use crate::MemoryStrength;

/// One word's result from a finished lesson attempt
#[derive(Debug, Clone)]
pub struct WordOutcome {
    pub word: String,
    pub translation: String,
    pub example_phrase: Option<String>,
    pub correct: bool,
}

/// The strength a brand new word starts out with
pub fn initial_strength(correct: bool) -> MemoryStrength {
    if correct {
        MemoryStrength::Known
    } else {
        MemoryStrength::Fuzzy
    }
}

/// Recomputes memory strength from the new cumulative counters. First
/// matching rule wins, so a single wrong answer demotes a word to Fuzzy no
/// matter how often it was answered correctly before. Once the incorrect
/// counter reaches three the word stays Forgotten.
pub fn advance_strength(
    previous: MemoryStrength,
    correct_count: i32,
    incorrect_count: i32,
) -> MemoryStrength {
    if incorrect_count >= 3 {
        MemoryStrength::Forgotten
    } else if incorrect_count >= 1 {
        MemoryStrength::Fuzzy
    } else if correct_count >= 3 {
        MemoryStrength::Known
    } else {
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_words_start_known_or_fuzzy() {
        assert_eq!(initial_strength(true), MemoryStrength::Known);
        assert_eq!(initial_strength(false), MemoryStrength::Fuzzy);
    }

    #[test]
    fn one_mistake_demotes_a_well_known_word() {
        // correct_count = 5 but a single incorrect answer wins
        let next = advance_strength(MemoryStrength::Known, 5, 1);
        assert_eq!(next, MemoryStrength::Fuzzy);
    }

    #[test]
    fn three_correct_answers_promote_to_known() {
        assert_eq!(
            advance_strength(MemoryStrength::Fuzzy, 2, 0),
            MemoryStrength::Fuzzy
        );
        assert_eq!(
            advance_strength(MemoryStrength::Fuzzy, 3, 0),
            MemoryStrength::Known
        );
    }

    #[test]
    fn forgotten_is_a_floor() {
        assert_eq!(
            advance_strength(MemoryStrength::Fuzzy, 0, 3),
            MemoryStrength::Forgotten
        );

        // No amount of later correct answers recovers a forgotten word
        assert_eq!(
            advance_strength(MemoryStrength::Forgotten, 10, 3),
            MemoryStrength::Forgotten
        );
        assert_eq!(
            advance_strength(MemoryStrength::Forgotten, 50, 4),
            MemoryStrength::Forgotten
        );
    }

    #[test]
    fn two_correct_answers_keep_the_prior_strength() {
        assert_eq!(
            advance_strength(MemoryStrength::Fuzzy, 2, 0),
            MemoryStrength::Fuzzy
        );
    }
}
