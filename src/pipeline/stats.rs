//! Per-turn speaking statistics.

use chrono::{DateTime, Utc};

use crate::progress::types::TurnStats;

/// Latency ceiling in milliseconds.
pub const MAX_RESPONSE_LATENCY_MS: i64 = 30_000;

/// Letters a word needs beyond this count to be complex.
const COMPLEX_WORD_MIN_LETTERS: usize = 6;

/// Number of whitespace-separated words.
#[must_use]
pub fn word_count(transcript: &str) -> u64 {
    transcript.split_whitespace().count() as u64
}

/// Words with more than six ASCII letters once other characters are removed.
#[must_use]
pub fn complex_word_count(transcript: &str) -> u64 {
    transcript
        .split_whitespace()
        .filter(|word| {
            word.chars().filter(char::is_ascii_alphabetic).count() > COMPLEX_WORD_MIN_LETTERS
        })
        .count() as u64
}

/// Time from the end of the previous reply's playback to the start of this
/// recording, clamped to `0..=30000` ms. Zero when there was no playback.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn response_latency_ms(
    last_playback_finished: Option<DateTime<Utc>>,
    recording_started: DateTime<Utc>,
) -> u64 {
    last_playback_finished.map_or(0, |finished| {
        (recording_started - finished)
            .num_milliseconds()
            .clamp(0, MAX_RESPONSE_LATENCY_MS) as u64
    })
}

/// Statistics for a transcript.
#[must_use]
pub fn turn_stats(transcript: &str, has_correction: bool, response_time_ms: u64) -> TurnStats {
    TurnStats {
        has_correction,
        response_time_ms,
        word_count: word_count(transcript),
        complex_word_count: complex_word_count(transcript),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_word_count() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("   "), 0);
        assert_eq!(word_count("I  went\thome"), 3);
    }

    #[test]
    fn test_complex_words_ignore_punctuation() {
        assert_eq!(complex_word_count("Absolutely, wonderful!"), 2);
        // six letters is not enough
        assert_eq!(complex_word_count("summer"), 0);
        // digits and apostrophes are stripped before counting
        assert_eq!(complex_word_count("it's 1234567 don't"), 0);
        assert_eq!(complex_word_count("restaurant's"), 1);
    }

    #[test]
    fn test_latency_clamped() {
        let finished = Utc::now();
        assert_eq!(response_latency_ms(None, finished), 0);
        assert_eq!(
            response_latency_ms(Some(finished), finished + Duration::milliseconds(1500)),
            1500
        );
        assert_eq!(
            response_latency_ms(Some(finished), finished + Duration::seconds(90)),
            30_000
        );
        assert_eq!(
            response_latency_ms(Some(finished), finished - Duration::seconds(2)),
            0
        );
    }

    #[test]
    fn test_turn_stats() {
        let stats = turn_stats("Yesterday I visited the museum", true, 800);
        assert!(stats.has_correction);
        assert_eq!(stats.word_count, 5);
        assert_eq!(stats.complex_word_count, 2);
        assert_eq!(stats.response_time_ms, 800);
    }
}
