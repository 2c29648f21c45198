//! Environment-driven configuration for the serving wrapper.

/// Model used for section generation (higher quality, higher latency).
pub fn generator_model() -> String {
    std::env::var("GENERATOR_MODEL").unwrap_or_else(|_| "google/gemini-2.5-flash".to_string())
}

/// Model used for section scoring (cheaper, faster).
pub fn evaluator_model() -> String {
    std::env::var("EVALUATOR_MODEL").unwrap_or_else(|_| "google/gemini-2.5-flash-lite".to_string())
}

pub fn port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(3000)
}

pub const GENERATOR_PREAMBLE: &str =
    "You are an expert academic writer producing plain-text research paper sections.";

pub const EVALUATOR_PREAMBLE: &str =
    "You are an expert academic reviewer scoring research paper sections.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_when_unset_or_invalid() {
        // Relies on PORT not being set in the test environment.
        assert_eq!(port(), 3000);
    }
}
