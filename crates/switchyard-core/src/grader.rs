//! Confidence and cost grading for completed executions.
//!
//! Neither function fails; out-of-range inputs are clamped.

use std::time::Duration;

use crate::catalog::BackendProfile;

/// Response time at which the latency penalty is maxed out.
const SLOW_RESPONSE: Duration = Duration::from_secs(5);

/// Confidence lost per failed attempt before the successful one.
const FALLBACK_PENALTY: f64 = 0.1;

pub struct Grader;

impl Grader {
    /// Confidence in [0, 1] for content produced by `profile`.
    ///
    /// `attempt_elapsed` is the duration of the successful invocation and
    /// `failed_attempts` the number of invocations that failed before it.
    pub fn confidence(profile: &BackendProfile, attempt_elapsed: Duration, failed_attempts: u32) -> f64 {
        let base = (profile.quality / 10.0).clamp(0.0, 1.0);
        let slowness = (attempt_elapsed.as_secs_f64() / SLOW_RESPONSE.as_secs_f64()).min(1.0);
        let time_factor = 1.0 - slowness * 0.2;
        let reliability = profile.reliability.clamp(0.0, 1.0);
        let penalty = failed_attempts as f64 * FALLBACK_PENALTY;

        let confidence = base * 0.4 + time_factor * 0.2 + reliability * 0.3 - penalty;
        if confidence.is_nan() {
            return 0.0;
        }
        confidence.clamp(0.0, 1.0)
    }

    /// Estimated USD cost of one exchange.
    pub fn cost(prompt: &str, content: &str, cost_per_k_tokens: f64) -> f64 {
        let tokens = approx_token_count(prompt) + approx_token_count(content);
        (tokens as f64 / 1000.0 * cost_per_k_tokens).max(0.0)
    }
}

/// Whitespace-delimited word count. Coarse on purpose; not billing-accurate.
pub fn approx_token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::profile;
    use proptest::prelude::*;

    #[test]
    fn test_fast_first_try_confidence() {
        let p = profile("a", 9.0, 0.9, &[]);
        // 0.9*0.4 + 1.0*0.2 + 0.9*0.3
        let c = Grader::confidence(&p, Duration::ZERO, 0);
        assert!((c - 0.83).abs() < 1e-9);
    }

    #[test]
    fn test_slow_and_fallback_penalties() {
        let p = profile("a", 9.0, 0.9, &[]);
        // 0.36 + 0.8*0.2 + 0.27 - 0.1
        let c = Grader::confidence(&p, Duration::from_secs(30), 1);
        assert!((c - 0.69).abs() < 1e-9);

        assert_eq!(Grader::confidence(&p, Duration::ZERO, 10), 0.0);
    }

    #[test]
    fn test_cost_uses_word_counts() {
        let cost = Grader::cost("one two three", "four five", 0.5);
        assert!((cost - 5.0 / 1000.0 * 0.5).abs() < 1e-12);
        assert_eq!(approx_token_count("  spaced\tout\nwords  "), 3);
        assert_eq!(Grader::cost("", "", 1.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_confidence_in_unit_interval(
            quality in -5.0f64..20.0,
            reliability in -1.0f64..2.0,
            elapsed_ms in 0u64..10_000_000,
            failed in 0u32..50,
        ) {
            let p = profile("x", quality, reliability, &[]);
            let c = Grader::confidence(&p, Duration::from_millis(elapsed_ms), failed);
            prop_assert!((0.0..=1.0).contains(&c));
        }
    }
}
