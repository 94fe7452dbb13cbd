//! Reusable attribute validators
//!
//! Each validator only inspects values of the type it understands and
//! ignores anything else; null and unknown values never reach it because
//! [`crate::schema::Schema::validate_config`] filters them first.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{AttributePath, Diagnostic};

fn invalid(path: &AttributePath, summary: impl Into<String>, detail: impl Into<String>) -> ValidatorResponse {
    ValidatorResponse {
        diagnostics: vec![Diagnostic::error(summary, detail).with_attribute(path.clone())],
    }
}

fn ok() -> ValidatorResponse {
    ValidatorResponse {
        diagnostics: Vec::new(),
    }
}

fn whole_number(n: f64) -> Option<i64> {
    (n.fract() == 0.0).then_some(n as i64)
}

/// String length within `[min, max]`, counted in characters
pub struct StringLengthBetween {
    min: usize,
    max: usize,
}

impl StringLengthBetween {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

impl Validator for StringLengthBetween {
    fn description(&self) -> String {
        format!("string length must be between {} and {}", self.min, self.max)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(s) = request.config_value.value.as_str() else {
            return ok();
        };
        let len = s.chars().count();
        if len < self.min || len > self.max {
            return invalid(
                &request.path,
                format!("{} has an invalid length", request.path),
                format!("{}, got {}", self.description(), len),
            );
        }
        ok()
    }
}

/// Non-empty after trimming whitespace
pub struct StringNotEmpty;

impl Validator for StringNotEmpty {
    fn description(&self) -> String {
        "string must not be empty".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        match request.config_value.value.as_str() {
            Some(s) if s.trim().is_empty() => invalid(
                &request.path,
                format!("{} must not be empty", request.path),
                "Expected a non-empty string",
            ),
            _ => ok(),
        }
    }
}

/// Regex match with a human-readable explanation of the expected format
pub struct StringMatches {
    pattern: Result<regex::Regex, regex::Error>,
    message: String,
}

impl StringMatches {
    pub fn new(pattern: &str, message: impl Into<String>) -> Self {
        Self {
            pattern: regex::Regex::new(pattern),
            message: message.into(),
        }
    }
}

impl Validator for StringMatches {
    fn description(&self) -> String {
        self.message.clone()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(s) = request.config_value.value.as_str() else {
            return ok();
        };
        match &self.pattern {
            Ok(re) if re.is_match(s) => ok(),
            Ok(_) => invalid(
                &request.path,
                format!("{} is invalid", request.path),
                format!("{:?}: {}", s, self.message),
            ),
            Err(e) => invalid(
                &request.path,
                "Invalid validator pattern",
                e.to_string(),
            ),
        }
    }
}

/// Value must be one of a fixed set of strings
pub struct StringInSlice {
    allowed: Vec<String>,
    ignore_case: bool,
}

impl StringInSlice {
    pub fn new(allowed: &[&str]) -> Self {
        Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
            ignore_case: false,
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

impl Validator for StringInSlice {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(s) = request.config_value.value.as_str() else {
            return ok();
        };
        let found = self.allowed.iter().any(|a| {
            if self.ignore_case {
                a.eq_ignore_ascii_case(s)
            } else {
                a == s
            }
        });
        if found {
            ok()
        } else {
            invalid(
                &request.path,
                format!("Invalid value for {}", request.path),
                format!("{}, got {:?}", self.description(), s),
            )
        }
    }
}

/// Whole number within `[min, max]`
pub struct IntBetween {
    min: i64,
    max: i64,
}

impl IntBetween {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }
}

impl Validator for IntBetween {
    fn description(&self) -> String {
        format!("value must be between {} and {}", self.min, self.max)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(n) = request.config_value.value.as_number() else {
            return ok();
        };
        match whole_number(n) {
            Some(i) if i >= self.min && i <= self.max => ok(),
            _ => invalid(
                &request.path,
                format!("{} is out of range", request.path),
                format!("{}, got {}", self.description(), n),
            ),
        }
    }
}

/// Whole number from a fixed set
pub struct IntInSlice {
    allowed: Vec<i64>,
}

impl IntInSlice {
    pub fn new(allowed: &[i64]) -> Self {
        Self {
            allowed: allowed.to_vec(),
        }
    }
}

impl Validator for IntInSlice {
    fn description(&self) -> String {
        let allowed: Vec<String> = self.allowed.iter().map(i64::to_string).collect();
        format!("value must be one of: {}", allowed.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(n) = request.config_value.value.as_number() else {
            return ok();
        };
        match whole_number(n) {
            Some(i) if self.allowed.contains(&i) => ok(),
            _ => invalid(
                &request.path,
                format!("Invalid value for {}", request.path),
                format!("{}, got {}", self.description(), n),
            ),
        }
    }
}

/// Whole number that is a multiple of `divisor`
pub struct IntDivisibleBy {
    divisor: i64,
}

impl IntDivisibleBy {
    pub fn new(divisor: i64) -> Self {
        Self { divisor }
    }
}

impl Validator for IntDivisibleBy {
    fn description(&self) -> String {
        format!("value must be a multiple of {}", self.divisor)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(n) = request.config_value.value.as_number() else {
            return ok();
        };
        match whole_number(n) {
            Some(i) if self.divisor != 0 && i % self.divisor == 0 => ok(),
            _ => invalid(
                &request.path,
                format!("Invalid value for {}", request.path),
                format!("{}, got {}", self.description(), n),
            ),
        }
    }
}

/// UUID string
pub struct IsUuid;

impl Validator for IsUuid {
    fn description(&self) -> String {
        "value must be a UUID".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(s) = request.config_value.value.as_str() else {
            return ok();
        };
        match uuid::Uuid::try_parse(s) {
            Ok(_) => ok(),
            Err(e) => invalid(
                &request.path,
                format!("{} is not a valid UUID", request.path),
                format!("{:?}: {}", s, e),
            ),
        }
    }
}

/// Adapts a plain string check into a validator. The check returns the
/// error detail on failure.
pub struct StringFunc<F>
where
    F: Fn(&str) -> Result<(), String> + Send + Sync,
{
    description: String,
    check: F,
}

impl<F> StringFunc<F>
where
    F: Fn(&str) -> Result<(), String> + Send + Sync,
{
    pub fn new(description: impl Into<String>, check: F) -> Self {
        Self {
            description: description.into(),
            check,
        }
    }
}

impl<F> Validator for StringFunc<F>
where
    F: Fn(&str) -> Result<(), String> + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(s) = request.config_value.value.as_str() else {
            return ok();
        };
        match (self.check)(s) {
            Ok(()) => ok(),
            Err(detail) => invalid(
                &request.path,
                format!("Invalid value for {}", request.path),
                detail,
            ),
        }
    }
}
