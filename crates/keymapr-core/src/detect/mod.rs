// Keymapr Detection
// Trigger compilation and real-time event classification

mod compile;
mod encoded;
mod engine;

pub use engine::{Effect, TriggerDetector};
