//! Field-shape rules for login submissions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::messages::Locale;

/// Number of digits in an employee ID.
pub const IDENTITY_DIGITS: usize = 6;

/// Minimum password length, counted in characters.
pub const SECRET_MIN_CHARS: usize = 6;

/// A login form field that can carry validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Identity,
    Secret,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Identity => "identity",
            Field::Secret => "secret",
        }
    }
}

/// Validation messages grouped by field, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, Vec<String>>);

impl FieldErrors {
    /// Builds an error set holding a single message.
    pub fn single(field: Field, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message.into());
        errors
    }

    pub fn push(&mut self, field: Field, message: String) {
        self.0.entry(field).or_default().push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&[String]> {
        self.0.get(&field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {message}", field.as_str())?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Raw login submission as received from the client.
#[derive(Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("identity", &self.identity)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A well-formed identity/secret pair, ready for the rate check and the directory.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identity: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl LoginForm {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
            secret: Some(secret.into()),
        }
    }

    /// Checks field shape and returns the trimmed credentials.
    ///
    /// All failing fields are reported together.
    pub fn validate(&self, locale: Locale) -> Result<Credentials, FieldErrors> {
        let mut errors = FieldErrors::default();

        let identity = self.identity.as_deref().map(str::trim).unwrap_or_default();
        if identity.is_empty() {
            errors.push(Field::Identity, locale.identity_required().to_string());
        } else if !is_employee_id(identity) {
            errors.push(Field::Identity, locale.identity_digits().to_string());
        }

        let secret = self.secret.as_deref().unwrap_or_default();
        if secret.is_empty() {
            errors.push(Field::Secret, locale.secret_required().to_string());
        } else if secret.chars().count() < SECRET_MIN_CHARS {
            errors.push(Field::Secret, locale.secret_min(SECRET_MIN_CHARS));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Credentials {
            identity: identity.to_string(),
            secret: secret.to_string(),
        })
    }
}

/// Returns `true` if `s` is exactly six ASCII digits.
pub fn is_employee_id(s: &str) -> bool {
    s.len() == IDENTITY_DIGITS && s.bytes().all(|b| b.is_ascii_digit())
}
