pub mod best_gyms_page;

pub use best_gyms_page::*;
