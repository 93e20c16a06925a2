//! Field validation for entity drafts.
//!
//! Each field carries an ordered list of rules. A field stops at its first
//! failing rule; fields never look at each other, so every field of a draft
//! is checked before submission is blocked.

use crate::model::Draft;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

pub const USERNAME_PATTERN: &str = r"^[a-zA-Z_-]+$";
pub const PHONE_PATTERN: &str = r"^[1-9][0-9]{9}$";
pub const PINCODE_PATTERN: &str = r"^[0-9]{1,10}$";
/// Dot-atom local part; domain labels of 1-63 alphanumerics or inner hyphens,
/// at least two of them.
pub const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$";
pub const PLACE_PATTERN: &str = r"^[a-zA-Z ]+$";

static EMAIL: Lazy<Regex> = Lazy::new(|| compile(EMAIL_PATTERN));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in validation pattern must compile")
}

/// A single constraint on a field value.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Fails on an empty or whitespace-only value.
    Required(&'static str),
    Matches {
        pattern: Regex,
        message: &'static str,
    },
    Email(&'static str),
}

impl Rule {
    pub fn matches(pattern: &str, message: &'static str) -> Self {
        Rule::Matches {
            pattern: compile(pattern),
            message,
        }
    }

    pub fn check(&self, value: &str) -> Result<(), &'static str> {
        let ok = match self {
            Rule::Required(_) => !value.trim().is_empty(),
            Rule::Matches { pattern, .. } => pattern.is_match(value),
            Rule::Email(_) => EMAIL.is_match(value),
        };
        if ok {
            Ok(())
        } else {
            Err(self.message())
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Rule::Required(m) | Rule::Email(m) => m,
            Rule::Matches { message, .. } => message,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldRules {
    pub field: &'static str,
    pub rules: Vec<Rule>,
}

/// Field name to error message, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn extend(&mut self, other: FieldErrors) {
        self.0.extend(other.0)
    }
}

impl FromIterator<(String, String)> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    fields: Vec<FieldRules>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: &'static str, rules: Vec<Rule>) -> Self {
        self.fields.push(FieldRules { field, rules });
        self
    }

    /// Checks one field. Unknown fields have no rules and always pass.
    pub fn validate_field(&self, field: &str, value: &str) -> Result<(), &'static str> {
        match self.fields.iter().find(|f| f.field == field) {
            Some(f) => f.rules.iter().try_for_each(|rule| rule.check(value)),
            None => Ok(()),
        }
    }

    pub fn validate<D: Draft>(&self, draft: &D) -> Result<(), FieldErrors> {
        let errors: FieldErrors = self
            .fields
            .iter()
            .filter_map(|f| {
                let value = draft.value(f.field).unwrap_or_default();
                self.validate_field(f.field, value)
                    .err()
                    .map(|m| (f.field.to_string(), m.to_string()))
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

pub static USER_RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new()
        .field(
            "username",
            vec![
                Rule::Required("Username is required"),
                Rule::matches(
                    USERNAME_PATTERN,
                    "Username can only contain letters, underscores (_), or hyphens (-)",
                ),
            ],
        )
        .field(
            "phone",
            vec![
                Rule::Required("Phone number is required"),
                Rule::matches(
                    PHONE_PATTERN,
                    "Phone number must be 10 digits, not start with 0, and contain only numbers",
                ),
            ],
        )
});

pub static PROFILE_RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new()
        .field(
            "email",
            vec![
                Rule::Required("Email is required"),
                Rule::Email("Invalid email address, e.g. username@host.com"),
            ],
        )
        .field("gender", vec![Rule::Required("Gender is required")])
        .field("address", vec![Rule::Required("Address is required")])
        .field(
            "pincode",
            vec![
                Rule::Required("Pincode is required"),
                Rule::matches(PINCODE_PATTERN, "Pincode must be a maximum of 10 digits"),
            ],
        )
        .field("city", vec![Rule::Required("City is required")])
        .field(
            "state",
            vec![
                Rule::Required("State is required"),
                Rule::matches(PLACE_PATTERN, "State can only contain letters"),
            ],
        )
        .field(
            "country",
            vec![
                Rule::Required("Country is required"),
                Rule::matches(PLACE_PATTERN, "Country can only contain letters"),
            ],
        )
});
