//! Feedback state machine module
//!
//! Three kinds of feedback, chosen every time a wait runs out:
//! - Lift: beep-gap cadence, faster and higher as climb increases
//! - Sink: continuous looping tone, lower as sink increases
//! - Deadzone: silence
//!
//! plus Idle while disabled, without a signal, or without a clip.

mod driver;
mod machine;
mod profile;

pub use driver::FeedbackLoop;
pub use machine::{FeedbackMachine, Mode};
