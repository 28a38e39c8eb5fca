//! Simulated telemetry for grid connections.
//!
//! Each generation pass produces one sample of every metric type for every
//! connected endpoint, with values modulated by a fixed diurnal load curve
//! ([`load::load_factor`]). The randomness source is injected so tests can
//! drive the generator with a seeded [`rand::rngs::StdRng`].

pub mod generator;
pub mod load;

pub use generator::{generate_round, GenerationOutcome, TelemetryGenerator};
