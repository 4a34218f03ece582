//! Attempt and per-rem record model.
//!
//! # Responsibility
//! - Define one recorded correct/incorrect judgment.
//! - Compute rounded accuracy percentages over attempt slices.
//!
//! # Invariants
//! - `Attempt` is immutable once created.
//! - `compute_accuracy` returns 0 for empty input and never divides by zero.

use serde::{Deserialize, Serialize};

/// One recorded judgment for a rem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub correct: bool,
    /// Unix epoch milliseconds. Serialized as `ts` to match the persisted shape.
    #[serde(rename = "ts")]
    pub timestamp: i64,
}

impl Attempt {
    pub fn new(correct: bool, timestamp: i64) -> Self {
        Self { correct, timestamp }
    }
}

/// Attempt history for a single rem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemRecord {
    pub attempts: Vec<Attempt>,
}

impl RemRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from an existing history, keeping the given order.
    pub fn from_attempts(attempts: Vec<Attempt>) -> Self {
        Self { attempts }
    }

    /// Appends one attempt at the end of the history.
    pub fn push_attempt(&mut self, attempt: Attempt) {
        self.attempts.push(attempt);
    }

    pub fn correct_count(&self) -> usize {
        self.attempts.iter().filter(|attempt| attempt.correct).count()
    }

    pub fn accuracy(&self) -> u32 {
        compute_accuracy(&self.attempts)
    }

    /// Returns the newest attempt, if any.
    pub fn last_attempt(&self) -> Option<&Attempt> {
        self.attempts.last()
    }
}

/// Computes `round(100 * correct / total)` for an attempt sequence.
///
/// Returns 0 for an empty sequence. Order of attempts does not matter.
pub fn compute_accuracy(attempts: &[Attempt]) -> u32 {
    accuracy_from_counts(
        attempts.iter().filter(|attempt| attempt.correct).count(),
        attempts.len(),
    )
}

/// Rounded percentage from pre-aggregated counts.
///
/// Rounds half away from zero, so 1 of 8 (12.5%) reports 13.
pub fn accuracy_from_counts(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let ratio = correct as f64 * 100.0 / total as f64;
    ratio.round() as u32
}

#[cfg(test)]
mod tests {
    use super::{accuracy_from_counts, compute_accuracy, Attempt, RemRecord};

    fn attempts(pattern: &[bool]) -> Vec<Attempt> {
        pattern
            .iter()
            .enumerate()
            .map(|(idx, correct)| Attempt::new(*correct, 1_700_000_000_000 + idx as i64))
            .collect()
    }

    #[test]
    fn empty_sequence_has_zero_accuracy() {
        assert_eq!(compute_accuracy(&[]), 0);
    }

    #[test]
    fn three_of_four_is_seventy_five() {
        assert_eq!(compute_accuracy(&attempts(&[true, true, true, false])), 75);
    }

    #[test]
    fn rounding_goes_half_away_from_zero() {
        assert_eq!(accuracy_from_counts(1, 8), 13);
        assert_eq!(accuracy_from_counts(1, 3), 33);
        assert_eq!(accuracy_from_counts(2, 3), 67);
    }

    #[test]
    fn order_does_not_change_result() {
        let forward = attempts(&[true, false, false, true, true]);
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_eq!(compute_accuracy(&forward), compute_accuracy(&reversed));
    }

    #[test]
    fn record_push_keeps_insertion_order() {
        let mut record = RemRecord::new();
        record.push_attempt(Attempt::new(true, 10));
        record.push_attempt(Attempt::new(false, 5));

        assert_eq!(record.attempts[0].timestamp, 10);
        assert_eq!(record.last_attempt().map(|a| a.timestamp), Some(5));
        assert_eq!(record.correct_count(), 1);
        assert_eq!(record.accuracy(), 50);
    }

    #[test]
    fn attempt_serializes_timestamp_as_ts() {
        let value = serde_json::to_value(Attempt::new(true, 42)).expect("serialize attempt");
        assert_eq!(value, serde_json::json!({ "correct": true, "ts": 42 }));
    }
}
