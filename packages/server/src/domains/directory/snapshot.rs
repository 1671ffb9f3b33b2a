//! Immutable gym profile snapshots embedded into generated pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candidates::RatingSummary;
use super::models::{Address, GymMedia, GymRecord, MediaKind};
use crate::common::{AddressId, GymId, MediaId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSnapshot {
    pub id: MediaId,
    pub kind: MediaKind,
    pub path: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&GymMedia> for MediaSnapshot {
    fn from(media: &GymMedia) -> Self {
        Self {
            id: media.id,
            kind: media.kind,
            path: media.path.clone(),
            title: media.title.clone(),
            created_at: media.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub id: AddressId,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub full_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_primary: bool,
}

impl From<&Address> for AddressSnapshot {
    fn from(address: &Address) -> Self {
        Self {
            id: address.id,
            street: address.street.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            country: address.country.clone(),
            postal_code: address.postal_code.clone(),
            full_address: address.full_address.clone(),
            latitude: address.latitude,
            longitude: address.longitude,
            is_primary: address.is_primary,
        }
    }
}

/// One entry of a page's `gyms_data` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GymSnapshot {
    pub id: GymId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub trending: bool,
    pub rating: f64,
    pub review_count: usize,
    pub logo: Option<MediaSnapshot>,
    pub gallery: Vec<MediaSnapshot>,
    pub featured_image: Option<MediaSnapshot>,
    pub address: Option<AddressSnapshot>,
}

impl GymSnapshot {
    /// Build a snapshot from a gym, its rating inside the location and the
    /// location's addresses belonging to it.
    pub fn build(record: &GymRecord, rating: RatingSummary, addresses: &[&Address]) -> Self {
        let primary = addresses
            .iter()
            .find(|a| a.is_primary)
            .or_else(|| addresses.first())
            .map(|a| AddressSnapshot::from(*a));

        Self {
            id: record.gym.id,
            slug: record.gym.slug.clone(),
            name: record.gym.name.clone(),
            description: record.gym.description.clone(),
            city: record.gym.city.clone(),
            state: record.gym.state.clone(),
            trending: record.gym.trending,
            rating: rating.rating,
            review_count: rating.review_count,
            logo: record.logo.as_ref().map(MediaSnapshot::from),
            gallery: record.gallery.iter().map(MediaSnapshot::from).collect(),
            featured_image: record.display_image().map(MediaSnapshot::from),
            address: primary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::directory::models::Gym;
    use chrono::TimeZone;

    fn address(id: i64, is_primary: bool) -> Address {
        Address {
            id: AddressId::new(id),
            gym_id: GymId::new(1),
            street: Some(format!("{} Main St", id)),
            city: Some("Austin".to_string()),
            state: Some("Texas".to_string()),
            country: Some("United States".to_string()),
            postal_code: None,
            full_address: None,
            latitude: None,
            longitude: None,
            is_primary,
        }
    }

    fn record() -> GymRecord {
        let mut record = GymRecord::new(Gym {
            id: GymId::new(1),
            name: "Iron Temple".to_string(),
            slug: "iron-temple".to_string(),
            description: Some("Strength gym".to_string()),
            city: Some("Austin".to_string()),
            state: Some("Texas".to_string()),
            trending: true,
        });
        record.gallery.push(GymMedia {
            id: MediaId::new(5),
            gym_id: GymId::new(1),
            kind: MediaKind::Gallery,
            path: "/g/5.jpg".to_string(),
            title: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        });
        record
    }

    #[test]
    fn test_primary_address_preferred() {
        let (a, b) = (address(1, false), address(2, true));
        let snapshot = GymSnapshot::build(&record(), RatingSummary::default(), &[&a, &b]);
        assert_eq!(snapshot.address.map(|a| a.id), Some(AddressId::new(2)));
    }

    #[test]
    fn test_first_address_when_none_primary() {
        let (a, b) = (address(1, false), address(2, false));
        let snapshot = GymSnapshot::build(&record(), RatingSummary::default(), &[&a, &b]);
        assert_eq!(snapshot.address.map(|a| a.id), Some(AddressId::new(1)));
    }

    #[test]
    fn test_featured_image_falls_back_to_gallery() {
        let snapshot = GymSnapshot::build(&record(), RatingSummary::default(), &[]);
        assert_eq!(snapshot.featured_image.map(|m| m.id), Some(MediaId::new(5)));
        assert!(snapshot.address.is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let summary = RatingSummary {
            rating: 4.5,
            review_count: 20,
        };
        let json = serde_json::to_value(GymSnapshot::build(&record(), summary, &[])).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["review_count"], 20);
        assert_eq!(json["rating"], 4.5);
        assert_eq!(json["gallery"][0]["kind"], "gallery");
    }
}
