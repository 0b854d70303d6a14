//! Request validation.
//!
//! Every domain record is checked before it is persisted. Checks collect
//! into a flat list of `{field, message}` failures instead of stopping at
//! the first problem, so clients can show all of them at once.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

fn person_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-zÀ-ÖØ-öø-ÿ\s'-]+$").expect("person name pattern"))
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
            .expect("email pattern")
    })
}

/// Letters (Latin-1 accents included), spaces, apostrophes and hyphens.
pub fn is_valid_person_name(name: &str) -> bool {
    person_name_re().is_match(name)
}

pub fn is_valid_email(email: &str) -> bool {
    email_re().is_match(email)
}

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub field: String,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// All failures found for one record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed with {} problem(s)", .0.len())]
pub struct ValidationErrors(pub Vec<ValidationFailure>);

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![ValidationFailure::new(field, message)])
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.0
    }

    /// Whether any failure concerns `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|f| f.field == field)
    }
}

/// Records that can check their own invariants.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Accumulates failures for a single record.
#[derive(Debug, Default)]
pub struct Validator {
    failures: Vec<ValidationFailure>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.failures.push(ValidationFailure::new(field, message));
        }
        self
    }

    pub fn non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(
            !value.trim().is_empty(),
            field,
            format!("{} must not be empty", field),
        )
    }

    /// Character length (not byte length) within `min..=max`.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.chars().count();
        self.check(
            (min..=max).contains(&len),
            field,
            format!("{} must be between {} and {} characters", field, min, max),
        )
    }

    /// Finite number within `min..=max`.
    pub fn range(&mut self, field: &str, value: f64, min: f64, max: f64) -> &mut Self {
        self.check(
            value.is_finite() && value >= min && value <= max,
            field,
            format!("{} must be between {} and {}", field, min, max),
        )
    }

    /// Finite number not below `min`.
    pub fn at_least(&mut self, field: &str, value: f64, min: f64) -> &mut Self {
        self.check(
            value.is_finite() && value >= min,
            field,
            format!("{} must be at least {}", field, min),
        )
    }

    /// Merge the failures of a nested record, prefixing their field names.
    pub fn nested(&mut self, prefix: &str, result: Result<(), ValidationErrors>) -> &mut Self {
        if let Err(errors) = result {
            for failure in errors.0 {
                self.failures.push(ValidationFailure::new(
                    format!("{}.{}", prefix, failure.field),
                    failure.message,
                ));
            }
        }
        self
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(self.failures))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_validator_passes() {
        assert!(Validator::new().finish().is_ok());
    }

    #[test]
    fn test_collects_all_failures() {
        let mut v = Validator::new();
        v.non_empty("name", "  ")
            .range("height", 5.0, 0.5, 3.0)
            .check(true, "ok", "never");
        let errors = v.finish().unwrap_err();
        assert_eq!(errors.failures().len(), 2);
        assert!(errors.has_field("name"));
        assert!(errors.has_field("height"));
        assert!(!errors.has_field("ok"));
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let mut v = Validator::new();
        v.length("name", "Zé", 2, 100);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_range_rejects_nan() {
        let mut v = Validator::new();
        v.range("price", f64::NAN, 0.0, 10.0);
        assert!(v.finish().is_err());
    }

    #[test]
    fn test_at_least() {
        let mut v = Validator::new();
        v.at_least("price", -0.01, 0.0).at_least("weight", 0.0, 0.0);
        let errors = v.finish().unwrap_err();
        assert_eq!(errors.failures().len(), 1);
        assert_eq!(errors.failures()[0].field, "price");
    }

    #[test]
    fn test_nested_prefixes_fields() {
        let inner = Err(ValidationErrors::single("quantity", "must be at least 1"));
        let mut v = Validator::new();
        v.nested("items[2]", inner);
        let errors = v.finish().unwrap_err();
        assert_eq!(
            errors.failures(),
            &[ValidationFailure::new("items[2].quantity", "must be at least 1")]
        );
    }

    #[test]
    fn test_person_name_pattern() {
        assert!(is_valid_person_name("Ana Moser"));
        assert!(is_valid_person_name("O'Neil-Prado"));
        assert!(is_valid_person_name("Fabiana Claudino"));
        assert!(!is_valid_person_name("Player 1"));
        assert!(!is_valid_person_name("a_b"));
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("coach@club.com.br"));
        assert!(is_valid_email("first.last+shop@example.org"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("user@host"));
        assert!(!is_valid_email("user@@example.com"));
    }

    #[test]
    fn test_error_display() {
        let errors = ValidationErrors::single("name", "bad");
        assert_eq!(errors.to_string(), "validation failed with 1 problem(s)");
    }
}
