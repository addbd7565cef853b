//! Phone number bookkeeping

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhoneNumberStatus {
    Active,
    Inactive,
}

impl PhoneNumberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhoneNumberStatus::Active => "ACTIVE",
            PhoneNumberStatus::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for PhoneNumberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhoneNumberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(PhoneNumberStatus::Active),
            "INACTIVE" => Ok(PhoneNumberStatus::Inactive),
            other => Err(format!("unknown phone number status: {other}")),
        }
    }
}

/// A phone number this system has called or been called by.
///
/// Upserted on every call touch; `call_count` increments atomically in the
/// store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub id: Uuid,
    /// E.164, unique
    pub number: String,
    pub status: PhoneNumberStatus,
    pub last_called: Option<DateTime<Utc>>,
    pub call_count: i64,
    pub created_at: DateTime<Utc>,
}

impl PhoneNumber {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: number.into(),
            status: PhoneNumberStatus::Active,
            last_called: None,
            call_count: 0,
            created_at: Utc::now(),
        }
    }
}
