// Gym Directory - best-gyms page generation
//
// Builds and serves cached "Best Gyms in <place>" pages from the gym directory.
// Candidates come from directory reviews, order from an LLM ranking service
// (with a local rating fallback), and generation runs as queued jobs.

pub mod cli;
pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
