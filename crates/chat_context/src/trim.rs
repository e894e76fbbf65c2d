use crate::prompt::build_prompt;
use crate::Turn;

/// Prompt assembled from the turns that survived trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedContext<'a> {
    pub prompt: String,
    /// Retained tail of the input history.
    pub turns: &'a [Turn],
    /// Number of leading turns dropped to fit the budget.
    pub dropped: usize,
}

impl TrimmedContext<'_> {
    /// True when the prompt still exceeds the budget because a single turn is left.
    #[must_use]
    pub fn over_budget(&self, max_chars: usize) -> bool {
        prompt_len(&self.prompt) > max_chars
    }
}

/// Prompt length in characters, the unit of the context budget.
#[must_use]
pub fn prompt_len(prompt: &str) -> usize {
    prompt.chars().count()
}

/// Drop the oldest turns until the assembled prompt fits `max_chars`.
///
/// Turns are dropped from the front two at a time to keep user/assistant pairs
/// together, and one at a time once only one would remain otherwise. Trimming
/// stops when a single turn is left, which is sent unmodified even when still
/// over budget. An even history that never fits is emptied.
#[must_use]
pub fn trim_to_budget<'a>(
    system_instruction: &str,
    turns: &'a [Turn],
    max_chars: usize,
) -> TrimmedContext<'a> {
    let mut start = 0;
    let mut prompt = build_prompt(system_instruction, turns);

    while prompt_len(&prompt) > max_chars && turns.len() - start > 1 {
        let remaining = turns.len() - start;
        start += remaining.min(2);
        prompt = build_prompt(system_instruction, &turns[start..]);
    }

    TrimmedContext {
        prompt,
        turns: &turns[start..],
        dropped: start,
    }
}

#[cfg(test)]
mod tests {
    use super::{prompt_len, trim_to_budget};
    use crate::{build_prompt, Turn};

    fn history(count: usize) -> Vec<Turn> {
        (0..count)
            .map(|index| {
                let content = format!("message number {index} {}", "x".repeat(40));
                if index % 2 == 0 {
                    Turn::user(content)
                } else {
                    Turn::assistant(content)
                }
            })
            .collect()
    }

    #[test]
    fn history_within_budget_is_untouched() {
        let turns = history(4);
        let trimmed = trim_to_budget("sys", &turns, 10_000);

        assert_eq!(trimmed.dropped, 0);
        assert_eq!(trimmed.turns, turns.as_slice());
        assert_eq!(trimmed.prompt, build_prompt("sys", &turns));
    }

    #[test]
    fn zero_turns_trivially_fit() {
        let trimmed = trim_to_budget("sys", &[], 1);
        assert!(trimmed.turns.is_empty());
        assert_eq!(trimmed.dropped, 0);
    }

    #[test]
    fn drops_oldest_pairs_until_prompt_fits() {
        let turns = history(6);
        let budget = prompt_len(&build_prompt("sys", &turns[2..])) + 1;
        let trimmed = trim_to_budget("sys", &turns, budget);

        assert_eq!(trimmed.dropped, 2);
        assert_eq!(trimmed.turns, &turns[2..]);
        assert!(prompt_len(&trimmed.prompt) <= budget);
    }

    #[test]
    fn drops_in_pairs_even_when_one_would_suffice() {
        let turns = history(5);
        let budget = prompt_len(&build_prompt("sys", &turns[1..]));
        let trimmed = trim_to_budget("sys", &turns, budget);

        assert_eq!(trimmed.dropped, 2);
        assert_eq!(trimmed.turns[0], turns[2]);
    }

    #[test]
    fn odd_history_falls_to_single_turn_floor() {
        let turns = history(3);
        let trimmed = trim_to_budget("sys", &turns, 10);

        assert_eq!(trimmed.turns.len(), 1);
        assert_eq!(trimmed.turns[0], turns[2]);
        assert!(trimmed.over_budget(10));
    }

    #[test]
    fn even_history_is_dropped_in_pairs_to_empty() {
        let turns = history(4);
        let trimmed = trim_to_budget("sys", &turns, 10);

        assert_eq!(trimmed.dropped, 4);
        assert!(trimmed.turns.is_empty());
        assert_eq!(trimmed.prompt, build_prompt("sys", &[]));
    }

    #[test]
    fn two_oversized_turns_are_dropped_together() {
        let turns = vec![Turn::user("a".repeat(3_000)), Turn::user("b".repeat(3_000))];
        let trimmed = trim_to_budget("sys", &turns, 2_000);

        assert_eq!(trimmed.dropped, 2);
        assert!(trimmed.turns.is_empty());
        assert_eq!(prompt_len(&trimmed.prompt), 55);
    }

    #[test]
    fn single_oversized_turn_is_sent_unmodified() {
        let huge = "y".repeat(5_000);
        let turns = vec![Turn::user(huge.clone())];
        let trimmed = trim_to_budget("sys", &turns, 2_000);

        assert_eq!(trimmed.turns.len(), 1);
        assert_eq!(trimmed.turns[0].content, huge);
        assert!(trimmed.prompt.contains(&huge));
    }

    #[test]
    fn result_respects_budget_unless_floor_reached() {
        for count in 0..12 {
            let turns = history(count);
            for budget in [50, 200, 400, 800, 2_000] {
                let trimmed = trim_to_budget("sys", &turns, budget);
                assert!(
                    prompt_len(&trimmed.prompt) <= budget || trimmed.turns.len() <= 1,
                    "count={count} budget={budget}"
                );
                if trimmed.turns.is_empty() {
                    assert_eq!(count % 2, 0, "count={count} budget={budget}");
                }
            }
        }
    }

    #[test]
    fn trimming_is_idempotent() {
        let turns = history(9);
        for budget in [100, 300, 600, 5_000] {
            let first = trim_to_budget("sys", &turns, budget);
            let second = trim_to_budget("sys", first.turns, budget);

            assert_eq!(second.dropped, 0, "budget={budget}");
            assert_eq!(second.prompt, first.prompt);
        }
    }

    #[test]
    fn budget_counts_characters_not_bytes() {
        let turns = vec![Turn::user("é".repeat(100))];
        let prompt = build_prompt("sys", &turns);
        let chars = prompt_len(&prompt);
        assert!(prompt.len() > chars);

        let trimmed = trim_to_budget("sys", &turns, chars);
        assert!(!trimmed.over_budget(chars));
    }
}
