//! Call entity and carrier-reported lifecycle

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Call direction as reported by the carrier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallDirection::Inbound => "INBOUND",
            CallDirection::Outbound => "OUTBOUND",
        }
    }

    /// Map the carrier's direction vocabulary.
    ///
    /// Carriers distinguish API-originated and dialed outbound legs
    /// ("outbound-api", "outbound-dial"); this system does not.
    pub fn from_carrier(s: &str) -> Self {
        if s.to_ascii_lowercase().starts_with("outbound") {
            CallDirection::Outbound
        } else {
            CallDirection::Inbound
        }
    }
}

impl fmt::Display for CallDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INBOUND" => Ok(CallDirection::Inbound),
            "OUTBOUND" => Ok(CallDirection::Outbound),
            other => Err(format!("unknown call direction: {other}")),
        }
    }
}

/// Call status, mirroring the carrier vocabulary uppercased
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallStatus {
    Initiated,
    Ringing,
    Answered,
    Completed,
    Failed,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Initiated => "INITIATED",
            CallStatus::Ringing => "RINGING",
            CallStatus::Answered => "ANSWERED",
            CallStatus::Completed => "COMPLETED",
            CallStatus::Failed => "FAILED",
        }
    }

    /// Collapse the carrier's wider status vocabulary onto ours.
    pub fn from_carrier(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "queued" | "initiated" => CallStatus::Initiated,
            "ringing" => CallStatus::Ringing,
            "in-progress" | "answered" => CallStatus::Answered,
            "completed" => CallStatus::Completed,
            // busy / no-answer / canceled / failed
            _ => CallStatus::Failed,
        }
    }

    /// Terminal statuses receive no further carrier callbacks.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallStatus::Completed | CallStatus::Failed)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INITIATED" => Ok(CallStatus::Initiated),
            "RINGING" => Ok(CallStatus::Ringing),
            "ANSWERED" => Ok(CallStatus::Answered),
            "COMPLETED" => Ok(CallStatus::Completed),
            "FAILED" => Ok(CallStatus::Failed),
            other => Err(format!("unknown call status: {other}")),
        }
    }
}

/// A telephone call tracked through the pipeline.
///
/// The primary identifier is the carrier-assigned call SID, which makes
/// duplicate webhook delivery idempotent at the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    /// Carrier-assigned call identifier (primary key)
    pub call_sid: String,
    /// The remote party's number (E.164)
    pub phone_number: String,
    pub direction: CallDirection,
    pub status: CallStatus,
    pub start_time: DateTime<Utc>,
    /// Set once the call reaches a terminal status
    pub end_time: Option<DateTime<Utc>>,
    /// Duration in seconds, reported by the carrier on completion
    pub duration_secs: Option<i32>,
}

impl Call {
    pub fn new(call_sid: impl Into<String>, phone_number: impl Into<String>, direction: CallDirection) -> Self {
        Self {
            call_sid: call_sid.into(),
            phone_number: phone_number.into(),
            direction,
            status: CallStatus::Initiated,
            start_time: Utc::now(),
            end_time: None,
            duration_secs: None,
        }
    }
}
