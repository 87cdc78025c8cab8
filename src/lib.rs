pub mod constants;
pub mod engine;
pub mod error;
pub mod level;
pub mod player;
pub mod profile_store;
pub mod rng;
pub mod stats;
pub mod types;
