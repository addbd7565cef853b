//! Core domain types for the callscribe backend
//!
//! This crate provides the entities shared across all other crates:
//! - Calls and their carrier-reported lifecycle
//! - Recordings and transcriptions
//! - Analysis questions and answers
//! - Phone number bookkeeping

pub mod call;
pub mod phone_number;
pub mod question;
pub mod recording;

pub use call::{Call, CallDirection, CallStatus};
pub use phone_number::{PhoneNumber, PhoneNumberStatus};
pub use question::{Answer, MoveDirection, Question};
pub use recording::{Recording, Transcription, TranscriptionStatus};
