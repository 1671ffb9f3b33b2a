// HTTP routes
pub mod best_gyms;
pub mod health;

pub use best_gyms::*;
pub use health::*;
