//! Value objects for the storefront domain

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Customer phone number in the storefront's permissive format.
///
/// Accepts digits plus `+`, `-`, spaces and parentheses; requires at least
/// one digit. Stored trimmed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn new(value: impl Into<String>) -> Result<Self, PhoneNumberError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(PhoneNumberError::Empty);
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
        {
            return Err(PhoneNumberError::InvalidCharacter);
        }
        if !value.chars().any(|c| c.is_ascii_digit()) {
            return Err(PhoneNumberError::NoDigits);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, Error)]
pub enum PhoneNumberError {
    #[error("phone number is empty")]
    Empty,
    #[error("phone number contains an invalid character")]
    InvalidCharacter,
    #[error("phone number has no digits")]
    NoDigits,
}

/// Delivery location class used for charge lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Inside,
    Outside,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inside => "inside",
            Self::Outside => "outside",
        }
    }

    pub fn parse(value: &str) -> Result<Self, LocationTypeError> {
        match value {
            "inside" => Ok(Self::Inside),
            "outside" => Ok(Self::Outside),
            other => Err(LocationTypeError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}

#[derive(Debug, Clone, Error)]
pub enum LocationTypeError {
    #[error("unknown location type: {0}")]
    Unknown(String),
}
