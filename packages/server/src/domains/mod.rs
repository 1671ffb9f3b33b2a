pub mod best_gyms;
pub mod directory;
