//! Typed ID definitions for all domain entities.
//!
//! ```rust
//! use gymdir_core::common::{AddressId, GymId};
//!
//! let gym_id = GymId::new(1);
//! let address_id = AddressId::new(1);
//!
//! // This would be a compile error:
//! // let wrong: AddressId = gym_id;
//! ```

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Gym entities.
pub struct Gym;

/// Marker type for Address entities (a gym's physical locations).
pub struct Address;

/// Marker type for Review entities.
pub struct Review;

/// Marker type for gym media attachments (logo, gallery, featured image).
pub struct Media;

/// Marker type for generated Best Gyms pages.
pub struct BestGymsPage;

// ============================================================================
// Type aliases
// ============================================================================

pub type GymId = Id<Gym>;
pub type AddressId = Id<Address>;
pub type ReviewId = Id<Review>;
pub type MediaId = Id<Media>;
pub type BestGymsPageId = Id<BestGymsPage>;
