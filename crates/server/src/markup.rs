//! Carrier voice-response markup
//!
//! Inbound calls are answered with a `<Dial>` that bridges the caller to the
//! configured redirect number while recording both legs.

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Dial the redirect number, recording from answer, presenting `caller_id`.
pub fn dial(redirect_number: &str, caller_id: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response>\
         <Dial callerId=\"{}\" record=\"record-from-answer-dual\">{}</Dial>\
         </Response>",
        escape(caller_id),
        escape(redirect_number),
    )
}

/// Reject the call; used when no redirect number is configured.
pub fn reject() -> String {
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Reject/></Response>".to_string()
}
