//! Domain models for the fulfillment engine.

mod camp;
mod fulfillment;
mod patient;
mod progress;

pub use camp::*;
pub use fulfillment::*;
pub use patient::*;
pub use progress::*;
