//! Call-initiation request and its validation

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Loose international phone-number shape: leading `+` or digit, then at least
/// six digits, dashes, spaces or parentheses.
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+0-9][0-9\- ()]{6,}$").expect("phone pattern is valid")
});

/// Company name length bounds, in characters
pub const COMPANY_NAME_MIN: usize = 2;
pub const COMPANY_NAME_MAX: usize = 200;

/// Body of `POST /api/call`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateCallRequest {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// A request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCallRequest {
    pub company_name: String,
    pub phone_number: String,
}

impl InitiateCallRequest {
    pub fn new(company_name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            company_name: Some(company_name.into()),
            phone_number: Some(phone_number.into()),
        }
    }

    /// Validate fields in declaration order; the first offending field wins
    pub fn validate(self) -> Result<ValidCallRequest> {
        let company_name = self
            .company_name
            .ok_or_else(|| Error::validation("companyName", "is required"))?;
        let len = company_name.chars().count();
        if len < COMPANY_NAME_MIN {
            return Err(Error::validation(
                "companyName",
                format!("length must be at least {} characters long", COMPANY_NAME_MIN),
            ));
        }
        if len > COMPANY_NAME_MAX {
            return Err(Error::validation(
                "companyName",
                format!(
                    "length must be less than or equal to {} characters long",
                    COMPANY_NAME_MAX
                ),
            ));
        }

        let phone_number = self
            .phone_number
            .ok_or_else(|| Error::validation("phoneNumber", "is required"))?;
        if !PHONE_PATTERN.is_match(&phone_number) {
            return Err(Error::validation(
                "phoneNumber",
                format!("\"{}\" does not look like a phone number", phone_number),
            ));
        }

        Ok(ValidCallRequest {
            company_name,
            phone_number,
        })
    }
}
