//! Field validators and query-string helpers shared by the request types.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{de, Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

lazy_static! {
    static ref USERNAME_RE: Regex =
        Regex::new(r"^[A-Za-z0-9_.-]+$").expect("username pattern is a valid regex");
}

/// Usernames may contain ASCII letters, digits, `_`, `.` and `-`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        let mut err = ValidationError::new("username_charset");
        err.message = Some("may only contain letters, digits, '_', '.' and '-'".into());
        Err(err)
    }
}

/// Rejects values that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Deserialize an optional query value, treating `?key=` as absent.
pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => FromStr::from_str(s).map_err(de::Error::custom).map(Some),
    }
}

/// Flatten validator errors into `field: message; field: message`.
pub fn describe(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .errors()
        .iter()
        .flat_map(|(field, kind)| match kind {
            ValidationErrorsKind::Field(errs) => errs
                .iter()
                .map(|e| {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    format!("{field}: {msg}")
                })
                .collect::<Vec<_>>(),
            _ => vec![format!("{field}: invalid")],
        })
        .collect();
    parts.sort();
    parts.join("; ")
}
