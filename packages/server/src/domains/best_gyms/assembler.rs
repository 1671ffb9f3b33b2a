//! Builds the page payload from a ranking and the ranked gyms' profiles.

use std::collections::HashMap;

use crate::common::{slugify, GymId};
use crate::domains::directory::{GymSnapshot, Location, LocationKind};

use super::models::{IntroSection, PagePayload};
use super::ranking::MAX_RANKED_GYMS;

const FALLBACK_GYM_NAMES: &str = "top-rated local gyms";

pub fn build_title(location: &Location) -> String {
    match (location.city.is_empty(), location.state.is_empty()) {
        (false, false) => format!("Best Gyms in {}, {}", location.city, location.state),
        (false, true) => format!("Best Gyms in {}", location.city),
        (true, false) => format!("Best Gyms in {}", location.state),
        (true, true) => "Best Gyms".to_string(),
    }
}

/// `best-<city>-gyms`, else `best-<state>-gyms`, else `best-gyms`.
pub fn build_slug(location: &Location) -> String {
    slugify(&format!("best-{}-gyms", location.name()))
}

pub fn build_intro(location: &Location, gym_names: &[&str]) -> IntroSection {
    let place = location.name();
    let names: Vec<&str> = gym_names
        .iter()
        .copied()
        .filter(|n| !n.trim().is_empty())
        .take(MAX_RANKED_GYMS)
        .collect();
    let gyms = if names.is_empty() {
        FALLBACK_GYM_NAMES.to_string()
    } else {
        names.join(", ")
    };

    let sub_heading = match location.kind() {
        LocationKind::State => format!(
            "The best gyms in {place}, based on ratings and reviews from Google, Yelp, and ClassPass, include {gyms}. \
The fitness culture across {place} is shaped by 24/7 convenience, a strong strength training culture, and boutique studio variety, \
with popular training styles such as strength training, HIIT, Pilates, boxing, and CrossFit.\
\n\nIn addition to large gym chains, {place} has a wide range of Pilates, yoga, boxing, and HIIT studios and specialized facilities, \
making it easier to find a great fit for fat loss or muscle gain. Many members look for gyms near major metropolitan hubs and suburban centers \
because it aligns with work-life balance and local commuting patterns.\
\n\nSince {place} spans a mix of urban and residential landscapes, training habits often shift with local climate and seasonal shifts. \
Whether you're a beginner, a busy professional, or a powerlifter, the best gyms in {place} offer options from full-service health clubs \
to strength-focused gyms, with amenities like group classes, personal training, and saunas."
        ),
        LocationKind::City => format!(
            "The best gyms in {place}, based on ratings and reviews from Google, Yelp, and ClassPass, include {gyms}. \
The fitness scene in {place} is known for 24/7 convenience, a deep-rooted strength training culture, and boutique studio variety, \
with popular training styles like strength training, HIIT, Pilates, boxing, and CrossFit.\
\n\nBeyond traditional gyms, {place} also has a strong mix of Pilates, yoga, boxing, and HIIT studios and specialized facilities, \
which is great if you're focused on fat loss or muscle gain. Many people choose gyms near major transit hubs and central landmarks \
because it's convenient for commuting and balancing a busy daily schedule.\
\n\nWith its vibrant urban layout and local seasonal shifts, workout routines in {place} often adapt throughout the year. \
Whether you're a beginner, a busy professional, or a powerlifter, the best gyms in {place} offer everything from full-service health clubs \
to strength-focused gyms, plus amenities like group classes, personal training, and saunas."
        ),
    };

    IntroSection {
        main_heading: format!("Best Gyms in {}", place),
        sub_heading,
    }
}

/// Profiles in ranked order. Ids without a profile are dropped.
pub fn assemble_gyms_data(ranked: &[GymId], profiles: &HashMap<GymId, GymSnapshot>) -> Vec<GymSnapshot> {
    ranked
        .iter()
        .take(MAX_RANKED_GYMS)
        .filter_map(|id| profiles.get(id).cloned())
        .collect()
}

pub fn build_payload(location: &Location, gyms_data: Vec<GymSnapshot>) -> PagePayload {
    let names: Vec<&str> = gyms_data.iter().map(|g| g.name.as_str()).collect();
    let intro = build_intro(location, &names);

    PagePayload {
        title: build_title(location),
        slug: build_slug(location),
        country: location.country.clone(),
        state: Some(location.state.clone()).filter(|s| !s.is_empty()),
        city: Some(location.city.clone()).filter(|c| !c.is_empty()),
        intro_section: Some(intro),
        faq_section: None,
        featured_image: None,
        gyms_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: i64, name: &str) -> GymSnapshot {
        GymSnapshot {
            id: GymId::new(id),
            slug: slugify(name),
            name: name.to_string(),
            description: None,
            city: None,
            state: None,
            trending: false,
            rating: 4.5,
            review_count: 30,
            logo: None,
            gallery: vec![],
            featured_image: None,
            address: None,
        }
    }

    #[test]
    fn test_slugs() {
        assert_eq!(build_slug(&Location::city("Texas", "Austin")), "best-austin-gyms");
        assert_eq!(build_slug(&Location::state_wide("Texas")), "best-texas-gyms");
        assert_eq!(build_slug(&Location::new(None, "", "")), "best-gyms");
        assert_eq!(build_slug(&Location::city("New York", "New York City")), "best-new-york-city-gyms");
    }

    #[test]
    fn test_titles() {
        assert_eq!(build_title(&Location::city("Texas", "Austin")), "Best Gyms in Austin, Texas");
        assert_eq!(build_title(&Location::city("", "Austin")), "Best Gyms in Austin");
        assert_eq!(build_title(&Location::state_wide("Texas")), "Best Gyms in Texas");
        assert_eq!(build_title(&Location::new(None, "", "")), "Best Gyms");
    }

    #[test]
    fn test_intro_uses_city_template() {
        let intro = build_intro(&Location::city("Texas", "Austin"), &["Iron Temple", "Pulse"]);
        assert_eq!(intro.main_heading, "Best Gyms in Austin");
        assert!(intro.sub_heading.contains("include Iron Temple, Pulse."));
        assert!(intro.sub_heading.contains("The fitness scene in Austin"));
    }

    #[test]
    fn test_intro_uses_state_template() {
        let intro = build_intro(&Location::state_wide("Texas"), &["Iron Temple"]);
        assert_eq!(intro.main_heading, "Best Gyms in Texas");
        assert!(intro.sub_heading.contains("The fitness culture across Texas"));
    }

    #[test]
    fn test_intro_without_names() {
        let intro = build_intro(&Location::state_wide("Texas"), &[]);
        assert!(intro.sub_heading.contains("include top-rated local gyms."));
    }

    #[test]
    fn test_gyms_data_follows_ranking_and_drops_unknown_ids() {
        let profiles: HashMap<GymId, GymSnapshot> = [snapshot(1, "A"), snapshot(2, "B"), snapshot(3, "C")]
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        let ranked = [GymId::new(3), GymId::new(8), GymId::new(1)];

        let gyms = assemble_gyms_data(&ranked, &profiles);

        let order: Vec<i64> = gyms.iter().map(|g| g.id.into_inner()).collect();
        assert_eq!(order, vec![3, 1]);
    }

    #[test]
    fn test_payload_fields() {
        let location = Location::city("Texas", "Austin").with_country(Some("United States".to_string()));
        let payload = build_payload(&location, vec![snapshot(1, "Iron Temple")]);

        assert_eq!(payload.slug, "best-austin-gyms");
        assert_eq!(payload.country.as_deref(), Some("United States"));
        assert_eq!(payload.city.as_deref(), Some("Austin"));
        assert!(payload.faq_section.is_none());
        assert!(payload.featured_image.is_none());
        assert_eq!(payload.gyms_data.len(), 1);
    }

    #[test]
    fn test_state_payload_has_no_city() {
        let payload = build_payload(&Location::state_wide("Texas"), vec![]);
        assert_eq!(payload.city, None);
        assert_eq!(payload.state.as_deref(), Some("Texas"));
    }
}
