//! Signal module for the vertical rate input
//!
//! The feedback loop only sees [`SignalSource`]. The daemon feeds it from a
//! stdin listener thread, either with ready-made rates or with the wind and
//! position vectors they are projected from.

mod listener;
mod reading;

use tokio::sync::watch;

pub use listener::SignalListener;

/// Supplies the current vertical rate, `None` while unavailable
pub trait SignalSource {
    fn vertical_rate(&self) -> Option<f32>;
}

/// Latest-value signal source backed by a watch channel
#[derive(Debug, Clone)]
pub struct SignalFeed {
    rx: watch::Receiver<Option<f32>>,
}

impl SignalFeed {
    pub fn new(rx: watch::Receiver<Option<f32>>) -> Self {
        Self { rx }
    }
}

impl SignalSource for SignalFeed {
    fn vertical_rate(&self) -> Option<f32> {
        *self.rx.borrow()
    }
}
