//! Carrier webhook events, decoupled from the HTTP layer

use callscribe_core::{CallDirection, CallStatus};

/// A call has started (or its first callback arrived)
#[derive(Debug, Clone)]
pub struct CallEvent {
    pub call_sid: String,
    pub from: String,
    pub to: String,
    pub direction: CallDirection,
    pub status: CallStatus,
}

impl CallEvent {
    /// The remote party's number: who we called, or who called us.
    pub fn remote_number(&self) -> &str {
        match self.direction {
            CallDirection::Outbound => &self.to,
            CallDirection::Inbound => &self.from,
        }
    }
}

/// A call changed status
#[derive(Debug, Clone)]
pub struct CallStatusEvent {
    pub call_sid: String,
    pub status: CallStatus,
    /// Reported by the carrier once the call ends
    pub duration_secs: Option<i32>,
}

/// A recording finished and its media is ready for download
#[derive(Debug, Clone)]
pub struct RecordingEvent {
    pub call_sid: String,
    pub recording_sid: String,
    /// Carrier media URL (without a format extension)
    pub recording_url: String,
    pub duration_secs: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_number_follows_direction() {
        let mut event = CallEvent {
            call_sid: "CA1".to_string(),
            from: "+15550000001".to_string(),
            to: "+15550000002".to_string(),
            direction: CallDirection::Outbound,
            status: CallStatus::Initiated,
        };
        assert_eq!(event.remote_number(), "+15550000002");

        event.direction = CallDirection::Inbound;
        assert_eq!(event.remote_number(), "+15550000001");
    }
}
