use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{AddressId, GymId};

/// A physical location of a gym.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub gym_id: GymId,
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

/// An address joined with its owning gym's name and its review rates.
///
/// `gym_name` is `None` when the owning gym is missing or soft-deleted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AddressRecord {
    #[sqlx(flatten)]
    pub address: Address,
    pub gym_name: Option<String>,
    pub rates: Vec<i32>,
}

/// Filter for address lookups. Empty filters match every address.
#[derive(Debug, Clone, Default)]
pub struct AddressQuery {
    pub state: Option<String>,
    pub city: Option<String>,
    pub gym_ids: Option<Vec<GymId>>,
}

impl AddressQuery {
    pub fn for_location(state: &str, city: &str) -> Self {
        Self {
            state: Some(state.to_string()).filter(|s| !s.is_empty()),
            city: Some(city.to_string()).filter(|c| !c.is_empty()),
            gym_ids: None,
        }
    }

    pub fn with_gym_ids(mut self, ids: Vec<GymId>) -> Self {
        self.gym_ids = Some(ids);
        self
    }

    /// Whether an address falls inside this filter.
    pub fn matches(&self, address: &Address) -> bool {
        let field_matches = |filter: &Option<String>, value: &Option<String>| match filter {
            Some(wanted) => value.as_deref() == Some(wanted.as_str()),
            None => true,
        };

        field_matches(&self.state, &address.state)
            && field_matches(&self.city, &address.city)
            && self
                .gym_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&address.gym_id))
    }
}

impl AddressRecord {
    /// Non-deleted addresses inside the filter, with their gym's name and the
    /// rates of their non-deleted reviews. Ordered by address id.
    pub async fn find(query: &AddressQuery, pool: &PgPool) -> Result<Vec<Self>> {
        let gym_ids: Option<Vec<i64>> = query
            .gym_ids
            .as_ref()
            .map(|ids| ids.iter().map(|id| id.into_inner()).collect());

        let records = sqlx::query_as::<_, Self>(
            r#"
            SELECT a.id, a.gym_id, a.street, a.city, a.state, a.country, a.postal_code,
                   a.full_address, a.latitude, a.longitude, a.is_primary,
                   g.name AS gym_name,
                   COALESCE(
                       ARRAY_AGG(r.rate ORDER BY r.id) FILTER (WHERE r.id IS NOT NULL),
                       '{}'
                   ) AS rates
            FROM addresses a
            LEFT JOIN gyms g ON g.id = a.gym_id AND g.deleted_at IS NULL
            LEFT JOIN reviews r ON r.address_id = a.id AND r.deleted_at IS NULL
            WHERE a.deleted_at IS NULL
              AND ($1::TEXT IS NULL OR a.state = $1)
              AND ($2::TEXT IS NULL OR a.city = $2)
              AND ($3::BIGINT[] IS NULL OR a.gym_id = ANY($3))
            GROUP BY a.id, g.name
            ORDER BY a.id
            "#,
        )
        .bind(query.state.as_deref())
        .bind(query.city.as_deref())
        .bind(gym_ids)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(gym_id: i64, state: &str, city: &str) -> Address {
        Address {
            id: AddressId::new(1),
            gym_id: GymId::new(gym_id),
            street: None,
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            country: None,
            postal_code: None,
            full_address: None,
            latitude: None,
            longitude: None,
            is_primary: false,
        }
    }

    #[test]
    fn test_state_query_matches_every_city_in_state() {
        let query = AddressQuery::for_location("Texas", "");
        assert!(query.matches(&address(1, "Texas", "Austin")));
        assert!(query.matches(&address(1, "Texas", "Dallas")));
        assert!(!query.matches(&address(1, "Ohio", "Austin")));
    }

    #[test]
    fn test_city_query_requires_both_fields() {
        let query = AddressQuery::for_location("Texas", "Austin");
        assert!(query.matches(&address(1, "Texas", "Austin")));
        assert!(!query.matches(&address(1, "Minnesota", "Austin")));
    }

    #[test]
    fn test_gym_id_restriction() {
        let query = AddressQuery::for_location("Texas", "").with_gym_ids(vec![GymId::new(2)]);
        assert!(!query.matches(&address(1, "Texas", "Austin")));
        assert!(query.matches(&address(2, "Texas", "Austin")));
    }
}
