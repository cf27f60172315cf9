use std::fmt;

/// Message fragments that mark a layer failure as fatal for confidence.
const CRITICAL_PATTERNS: &[&str] = &[
    "database connection",
    "authentication failed",
    "permission denied",
    "unauthorized",
    "forbidden",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Critical,
    Recoverable,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Critical => f.write_str("critical"),
            ErrorClass::Recoverable => f.write_str("recoverable"),
        }
    }
}

/// Classify a layer failure by its full message chain.
pub fn classify_error(err: &anyhow::Error) -> ErrorClass {
    classify_message(&format!("{:#}", err))
}

pub fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if CRITICAL_PATTERNS.iter().any(|p| lower.contains(p)) {
        ErrorClass::Critical
    } else {
        ErrorClass::Recoverable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn test_critical_patterns() {
        assert_eq!(
            classify_message("dial tcp: Database Connection refused"),
            ErrorClass::Critical
        );
        assert_eq!(classify_message("403 Forbidden"), ErrorClass::Critical);
        assert_eq!(classify_message("request timed out"), ErrorClass::Recoverable);
    }

    #[test]
    fn test_context_chain_is_inspected() {
        let err = Err::<(), _>(anyhow!("permission denied"))
            .context("failed to scan handlers")
            .unwrap_err();
        assert_eq!(classify_error(&err), ErrorClass::Critical);
    }
}
