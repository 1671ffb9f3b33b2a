// TestDependencies - in-memory implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{BaseDirectory, BasePageStore, BaseRankingProvider, RankingError, ServerDeps};
use crate::common::{slugify, AddressId, BestGymsPageId, GymId, MediaId};
use crate::domains::best_gyms::models::{BestGymsPage, PageFilter, PagePayload, UpsertOutcome};
use crate::domains::best_gyms::{RankingClient, RankingTimeouts};
use crate::domains::directory::models::{
    Address, AddressQuery, AddressRecord, Gym, GymMedia, GymRecord, Location, MediaKind,
};
use crate::domains::directory::QualityGate;

// =============================================================================
// In-memory Directory
// =============================================================================

struct StoredAddress {
    address: Address,
    rates: Vec<i32>,
}

/// Directory backed by vectors. Deleted gyms keep their addresses but are
/// invisible to joins, like soft-deleted rows in Postgres.
pub struct InMemoryDirectory {
    gyms: Arc<Mutex<Vec<Gym>>>,
    deleted_gyms: Arc<Mutex<HashSet<GymId>>>,
    addresses: Arc<Mutex<Vec<StoredAddress>>>,
    media: Arc<Mutex<Vec<GymMedia>>>,
    address_queries: Arc<Mutex<Vec<AddressQuery>>>,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            gyms: Arc::new(Mutex::new(Vec::new())),
            deleted_gyms: Arc::new(Mutex::new(HashSet::new())),
            addresses: Arc::new(Mutex::new(Vec::new())),
            media: Arc::new(Mutex::new(Vec::new())),
            address_queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a gym with a slug derived from its name.
    pub fn with_gym(self, id: i64, name: &str) -> Self {
        self.gyms.lock().unwrap().push(Gym {
            id: GymId::new(id),
            name: name.to_string(),
            slug: slugify(name),
            description: Some(format!("{} is a gym.", name)),
            city: None,
            state: None,
            trending: false,
        });
        self
    }

    /// Soft-delete a gym; its addresses stay behind.
    pub fn with_deleted_gym(self, id: i64) -> Self {
        self.deleted_gyms.lock().unwrap().insert(GymId::new(id));
        self
    }

    /// Add an address with the given review rates.
    pub fn with_address(self, gym_id: i64, state: &str, city: &str, rates: &[i32]) -> Self {
        self.push_address(gym_id, state, city, None, false, rates);
        self
    }

    pub fn with_primary_address(self, gym_id: i64, state: &str, city: &str, rates: &[i32]) -> Self {
        self.push_address(gym_id, state, city, None, true, rates);
        self
    }

    pub fn with_address_in_country(self, gym_id: i64, country: &str, state: &str, city: &str) -> Self {
        self.push_address(gym_id, state, city, Some(country), false, &[]);
        self
    }

    /// Gym plus one address in `city, state` carrying `reviews` copies of `rate`.
    pub fn with_rated_gym(self, id: i64, name: &str, state: &str, city: &str, rate: i32, reviews: usize) -> Self {
        self.with_gym(id, name).with_address(id, state, city, &vec![rate; reviews])
    }

    pub fn with_media(self, gym_id: i64, kind: MediaKind, path: &str, created_at: DateTime<Utc>) -> Self {
        {
            let mut media = self.media.lock().unwrap();
            let id = MediaId::new(media.len() as i64 + 1);
            media.push(GymMedia {
                id,
                gym_id: GymId::new(gym_id),
                kind,
                path: path.to_string(),
                title: None,
                created_at,
            });
        }
        self
    }

    /// Every address query the pipeline issued, in order.
    pub fn address_queries(&self) -> Vec<AddressQuery> {
        self.address_queries.lock().unwrap().clone()
    }

    fn push_address(&self, gym_id: i64, state: &str, city: &str, country: Option<&str>, is_primary: bool, rates: &[i32]) {
        let mut addresses = self.addresses.lock().unwrap();
        let id = AddressId::new(addresses.len() as i64 + 1);
        addresses.push(StoredAddress {
            address: Address {
                id,
                gym_id: GymId::new(gym_id),
                street: Some(format!("{} Main St", id)),
                city: Some(city.to_string()),
                state: Some(state.to_string()),
                country: country.map(str::to_string),
                postal_code: None,
                full_address: Some(format!("{} Main St, {}, {}", id, city, state)),
                latitude: None,
                longitude: None,
                is_primary,
            },
            rates: rates.to_vec(),
        });
    }

    fn live_gym_name(&self, id: GymId) -> Option<String> {
        if self.deleted_gyms.lock().unwrap().contains(&id) {
            return None;
        }
        self.gyms
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.name.clone())
    }

    fn grouped_locations<F>(&self, key: F) -> Vec<Location>
    where
        F: Fn(&Address) -> Option<(String, String)>,
    {
        let addresses = self.addresses.lock().unwrap();
        let mut groups: BTreeMap<(String, String), Option<String>> = BTreeMap::new();
        for stored in addresses.iter() {
            let Some(group) = key(&stored.address) else {
                continue;
            };
            let country = stored
                .address
                .country
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            let entry = groups.entry(group).or_default();
            if country > *entry {
                *entry = country;
            }
        }

        groups
            .into_iter()
            .map(|((state, city), country)| Location::new(country, state, city))
            .collect()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[async_trait]
impl BaseDirectory for InMemoryDirectory {
    async fn find_city_state_pairs(&self, state: Option<&str>, city: Option<&str>) -> Result<Vec<Location>> {
        Ok(self.grouped_locations(|address| {
            let address_state = non_empty(&address.state)?;
            let address_city = non_empty(&address.city)?;
            if state.map_or(false, |s| s != address_state) || city.map_or(false, |c| c != address_city) {
                return None;
            }
            Some((address_state.to_string(), address_city.to_string()))
        }))
    }

    async fn find_states(&self, state: Option<&str>) -> Result<Vec<Location>> {
        Ok(self.grouped_locations(|address| {
            let address_state = non_empty(&address.state)?;
            if state.map_or(false, |s| s != address_state) {
                return None;
            }
            Some((address_state.to_string(), String::new()))
        }))
    }

    async fn find_addresses(&self, query: &AddressQuery) -> Result<Vec<AddressRecord>> {
        self.address_queries.lock().unwrap().push(query.clone());

        let matching: Vec<(Address, Vec<i32>)> = self
            .addresses
            .lock()
            .unwrap()
            .iter()
            .filter(|stored| query.matches(&stored.address))
            .map(|stored| (stored.address.clone(), stored.rates.clone()))
            .collect();

        Ok(matching
            .into_iter()
            .map(|(address, rates)| AddressRecord {
                gym_name: self.live_gym_name(address.gym_id),
                address,
                rates,
            })
            .collect())
    }

    async fn find_gyms(&self, ids: &[GymId]) -> Result<Vec<GymRecord>> {
        let deleted = self.deleted_gyms.lock().unwrap().clone();
        let gyms: Vec<Gym> = self
            .gyms
            .lock()
            .unwrap()
            .iter()
            .filter(|g| ids.contains(&g.id) && !deleted.contains(&g.id))
            .cloned()
            .collect();

        let mut media: Vec<GymMedia> = self
            .media
            .lock()
            .unwrap()
            .iter()
            .filter(|m| ids.contains(&m.gym_id))
            .cloned()
            .collect();
        media.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(GymRecord::assemble(gyms, media))
    }
}

// =============================================================================
// In-memory Page Store
// =============================================================================

pub struct InMemoryPageStore {
    pages: Arc<Mutex<Vec<BestGymsPage>>>,
    writes: Arc<Mutex<Vec<PagePayload>>>,
}

impl Default for InMemoryPageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPageStore {
    pub fn new() -> Self {
        Self {
            pages: Arc::new(Mutex::new(Vec::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Seed an already-generated page.
    pub fn with_page(self, payload: PagePayload) -> Self {
        {
            let mut pages = self.pages.lock().unwrap();
            let id = BestGymsPageId::new(pages.len() as i64 + 1);
            pages.push(BestGymsPage::from_payload(id, payload, Utc::now()));
        }
        self
    }

    /// Stored pages, ordered by slug.
    pub fn pages(&self) -> Vec<BestGymsPage> {
        let mut pages = self.pages.lock().unwrap().clone();
        pages.sort_by(|a, b| a.slug.cmp(&b.slug));
        pages
    }

    pub fn page(&self, slug: &str) -> Option<BestGymsPage> {
        self.pages.lock().unwrap().iter().find(|p| p.slug == slug).cloned()
    }

    /// Every upsert payload, in call order.
    pub fn writes(&self) -> Vec<PagePayload> {
        self.writes.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

#[async_trait]
impl BasePageStore for InMemoryPageStore {
    async fn exists(&self, slug: &str) -> Result<bool> {
        Ok(self.pages.lock().unwrap().iter().any(|p| p.slug == slug))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<BestGymsPage>> {
        Ok(self.page(slug))
    }

    async fn upsert(&self, payload: PagePayload) -> Result<UpsertOutcome> {
        self.writes.lock().unwrap().push(payload.clone());

        let now = Utc::now();
        let mut pages = self.pages.lock().unwrap();
        if let Some(existing) = pages.iter_mut().find(|p| p.slug == payload.slug) {
            let created_at = existing.created_at;
            *existing = BestGymsPage::from_payload(existing.id, payload, now);
            existing.created_at = created_at;
            return Ok(UpsertOutcome::Updated(existing.id));
        }

        let id = BestGymsPageId::new(pages.len() as i64 + 1);
        pages.push(BestGymsPage::from_payload(id, payload, now));
        Ok(UpsertOutcome::Created(id))
    }

    async fn list(&self, filter: &PageFilter, limit: i64, offset: i64) -> Result<Vec<BestGymsPage>> {
        Ok(self
            .pages()
            .into_iter()
            .filter(|p| filter.matches(p))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self, filter: &PageFilter) -> Result<i64> {
        Ok(self.pages.lock().unwrap().iter().filter(|p| filter.matches(p)).count() as i64)
    }
}

// =============================================================================
// Mock Ranking Provider
// =============================================================================

enum MockReply {
    Text(String),
    Status(u16),
}

/// Arguments captured from a generate call
#[derive(Debug, Clone)]
pub struct GenerateCall {
    pub prompt: String,
    pub timeout: Duration,
}

/// Replays queued replies in order; once the queue is drained every call
/// fails with an empty response.
pub struct MockRankingProvider {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    calls: Arc<Mutex<Vec<GenerateCall>>>,
}

impl Default for MockRankingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRankingProvider {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(MockReply::Text(text.to_string()));
        self
    }

    /// Queue a non-success HTTP status.
    pub fn with_status(self, status: u16) -> Self {
        self.replies.lock().unwrap().push_back(MockReply::Status(status));
        self
    }

    pub fn calls(&self) -> Vec<GenerateCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BaseRankingProvider for MockRankingProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, RankingError> {
        self.calls.lock().unwrap().push(GenerateCall {
            prompt: prompt.to_string(),
            timeout,
        });

        match self.replies.lock().unwrap().pop_front() {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Status(status)) => Err(RankingError::Api {
                status,
                body: "mock failure".to_string(),
            }),
            None => Err(RankingError::EmptyResponse),
        }
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

pub struct TestDependencies {
    pub directory: Arc<InMemoryDirectory>,
    pub pages: Arc<InMemoryPageStore>,
    /// `None` leaves ranking disabled, as with a missing credential.
    pub ranking: Option<Arc<MockRankingProvider>>,
    pub quality_gate: QualityGate,
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            directory: Arc::new(InMemoryDirectory::new()),
            pages: Arc::new(InMemoryPageStore::new()),
            ranking: None,
            quality_gate: QualityGate::standard(),
        }
    }

    pub fn mock_directory(mut self, directory: InMemoryDirectory) -> Self {
        self.directory = Arc::new(directory);
        self
    }

    pub fn mock_pages(mut self, pages: InMemoryPageStore) -> Self {
        self.pages = Arc::new(pages);
        self
    }

    pub fn mock_ranking(mut self, provider: MockRankingProvider) -> Self {
        self.ranking = Some(Arc::new(provider));
        self
    }

    pub fn quality_gate(mut self, gate: QualityGate) -> Self {
        self.quality_gate = gate;
        self
    }

    /// Convert into ServerDeps; the mocks stay reachable through `self`'s clones.
    pub fn server_deps(&self) -> Arc<ServerDeps> {
        let ranking = match &self.ranking {
            Some(provider) => RankingClient::new(provider.clone(), RankingTimeouts::default()),
            None => RankingClient::disabled(),
        };

        Arc::new(ServerDeps::new(
            self.directory.clone(),
            self.pages.clone(),
            Arc::new(ranking),
            self.quality_gate,
        ))
    }

    pub fn into_server_deps(self) -> Arc<ServerDeps> {
        self.server_deps()
    }
}
