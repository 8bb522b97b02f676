//! Audio output module
//!
//! The sink contract the feedback loop drives, the command set it speaks,
//! the outputs that implement it, and the linear fade used to keep
//! transitions free of pops.

#[cfg(feature = "device-audio")]
mod device;
mod fade;
mod output;
mod sink;

pub use fade::Fade;
pub use output::OutputSink;
pub use sink::{AudioCommand, AudioSink};

#[cfg(test)]
pub use sink::HeadlessSink;
