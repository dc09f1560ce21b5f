//! Fluency score derived from running totals.
//!
//! The score is a pure function of [`Aggregates`]; it is recomputed in full on
//! every update so it can always be reproduced from the stored totals.

use crate::progress::types::Aggregates;

/// Score of an untested learner.
pub const NEUTRAL_SCORE: u8 = 100;

/// Weight of the grammar-mistake rate.
const MISTAKE_WEIGHT: f64 = 50.0;
/// Average latency (ms) tolerated without penalty.
const LATENCY_GRACE_MS: f64 = 3000.0;
/// Latency span (ms) over which the penalty ramps to its maximum.
const LATENCY_RAMP_MS: f64 = 5000.0;
/// Maximum latency penalty.
const LATENCY_MAX_PENALTY: f64 = 20.0;
/// Bonus points per complex word per message.
const COMPLEX_WORD_WEIGHT: f64 = 10.0;
/// Maximum complex-word bonus.
const COMPLEX_WORD_MAX_BONUS: f64 = 15.0;

/// Compute the 0-100 fluency score.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fluency_score(totals: &Aggregates) -> u8 {
    if totals.total_messages == 0 {
        return NEUTRAL_SCORE;
    }

    let messages = totals.total_messages as f64;
    let mistake_rate = totals.grammar_mistakes as f64 / messages;
    let avg_response_ms = totals.total_response_time_ms as f64 / messages;
    let complex_word_rate = totals.total_complex_words as f64 / messages;

    let mut score = 100.0 - mistake_rate * MISTAKE_WEIGHT;

    if avg_response_ms > LATENCY_GRACE_MS {
        let penalty = ((avg_response_ms - LATENCY_GRACE_MS) / LATENCY_RAMP_MS * LATENCY_MAX_PENALTY)
            .min(LATENCY_MAX_PENALTY);
        score -= penalty;
    }

    score += (complex_word_rate * COMPLEX_WORD_WEIGHT).min(COMPLEX_WORD_MAX_BONUS);

    score.floor().clamp(0.0, 100.0) as u8
}
