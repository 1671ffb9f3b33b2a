pub mod address;
pub mod gym;
pub mod location;

pub use address::*;
pub use gym::*;
pub use location::*;
