//! Multi-location generation sharing one ranking call.

mod common;

use gymdir_core::domains::best_gyms::{generate_batch, GenerationOutcome, RankingSource};
use gymdir_core::domains::directory::Location;
use gymdir_core::kernel::{InMemoryPageStore, MockRankingProvider, TestDependencies};

use crate::common::{existing_page, texas_directory};

fn texas_locations() -> Vec<Location> {
    vec![
        Location::state_wide("Texas"),
        Location::city("Texas", "Austin"),
        Location::city("Texas", "Dallas"),
    ]
}

fn stored_ids(test: &TestDependencies, slug: &str) -> Vec<i64> {
    test.pages
        .page(slug)
        .unwrap()
        .gyms_data
        .0
        .iter()
        .map(|g| g.id.into_inner())
        .collect()
}

fn source_of(outcome: &GenerationOutcome) -> Option<RankingSource> {
    match outcome {
        GenerationOutcome::Saved { source, .. } => Some(*source),
        _ => None,
    }
}

#[tokio::test]
async fn one_call_ranks_every_location() {
    let answer = r#"[
        {"location": "Texas", "type": "state", "gym_ids": [5, 2]},
        {"location": "Austin, Texas", "type": "city", "gym_ids": ["3", 1.0, 2]},
        {"location": "Dallas, Texas", "type": "city", "gym_ids": [5]}
    ]"#;
    let test = TestDependencies::new()
        .mock_directory(texas_directory())
        .mock_ranking(MockRankingProvider::new().with_response(answer));
    let deps = test.server_deps();

    let outcomes = generate_batch(&texas_locations(), false, &deps).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| source_of(o) == Some(RankingSource::Service)));
    assert_eq!(test.ranking.as_ref().unwrap().call_count(), 1);

    assert_eq!(stored_ids(&test, "best-texas-gyms"), vec![5, 2]);
    assert_eq!(stored_ids(&test, "best-austin-gyms"), vec![3, 1, 2]);
    assert_eq!(stored_ids(&test, "best-dallas-gyms"), vec![5]);
}

#[tokio::test]
async fn batch_prompt_uses_labels_and_batch_timeout() {
    let test = TestDependencies::new()
        .mock_directory(texas_directory())
        .mock_ranking(MockRankingProvider::new().with_response("[]"));
    let deps = test.server_deps();

    generate_batch(&texas_locations(), false, &deps).await.unwrap();

    let calls = test.ranking.as_ref().unwrap().calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].prompt.contains("Location \"Dallas, Texas\" (city in Texas)"));
    assert!(calls[0].prompt.contains("Location \"Texas\" (state)"));
    assert!(!calls[0].prompt.contains("Tiny Studio"));
    assert_eq!(calls[0].timeout, deps.ranking.timeouts().batch);
}

#[tokio::test]
async fn omitted_location_falls_back_alone() {
    let answer = r#"[{"location": "Austin, Texas", "type": "city", "gym_ids": [1, 3]}]"#;
    let test = TestDependencies::new()
        .mock_directory(texas_directory())
        .mock_ranking(MockRankingProvider::new().with_response(answer));
    let deps = test.server_deps();

    let locations = vec![Location::city("Texas", "Austin"), Location::city("Texas", "Dallas")];
    let outcomes = generate_batch(&locations, false, &deps).await.unwrap();

    assert_eq!(source_of(&outcomes[0]), Some(RankingSource::Service));
    assert_eq!(source_of(&outcomes[1]), Some(RankingSource::Fallback));
    assert_eq!(stored_ids(&test, "best-austin-gyms"), vec![1, 3]);
    assert_eq!(stored_ids(&test, "best-dallas-gyms"), vec![5]);
}

#[tokio::test]
async fn kind_mismatch_is_not_a_match() {
    let answer = r#"[{"location": "Texas", "type": "city", "gym_ids": [1]}]"#;
    let test = TestDependencies::new()
        .mock_directory(texas_directory())
        .mock_ranking(MockRankingProvider::new().with_response(answer));
    let deps = test.server_deps();

    let outcomes = generate_batch(&[Location::state_wide("Texas")], false, &deps).await.unwrap();

    assert_eq!(source_of(&outcomes[0]), Some(RankingSource::Fallback));
    assert_eq!(stored_ids(&test, "best-texas-gyms"), vec![2, 5, 3, 1]);
}

#[tokio::test]
async fn unparseable_answer_falls_back_everywhere() {
    let test = TestDependencies::new()
        .mock_directory(texas_directory())
        .mock_ranking(MockRankingProvider::new().with_response("I could not find these gyms."));
    let deps = test.server_deps();

    let outcomes = generate_batch(&texas_locations(), false, &deps).await.unwrap();

    assert!(outcomes.iter().all(|o| source_of(o) == Some(RankingSource::Fallback)));
    assert_eq!(test.pages.write_count(), 3);
}

#[tokio::test]
async fn existing_pages_are_left_out_of_the_call() {
    let existing = existing_page(&Location::city("Texas", "Austin"));
    let test = TestDependencies::new()
        .mock_directory(texas_directory())
        .mock_pages(InMemoryPageStore::new().with_page(existing))
        .mock_ranking(MockRankingProvider::new().with_response("[]"));
    let deps = test.server_deps();

    let locations = vec![Location::city("Texas", "Austin"), Location::city("Texas", "Dallas")];
    let outcomes = generate_batch(&locations, false, &deps).await.unwrap();

    assert_eq!(
        outcomes[0],
        GenerationOutcome::SkippedExisting {
            slug: "best-austin-gyms".to_string()
        }
    );
    assert!(outcomes[1].is_saved());

    let calls = test.ranking.as_ref().unwrap().calls();
    assert!(!calls[0].prompt.contains("Austin, Texas\" (city"));
    assert!(calls[0].prompt.contains("Dallas, Texas"));
}

#[tokio::test]
async fn nothing_pending_skips_the_call() {
    let test = TestDependencies::new()
        .mock_directory(texas_directory())
        .mock_ranking(MockRankingProvider::new().with_response("[]"));
    let deps = test.server_deps();

    let outcomes = generate_batch(&[Location::city("Ohio", "Cleveland")], false, &deps)
        .await
        .unwrap();

    assert!(matches!(outcomes[0], GenerationOutcome::NoCandidates { .. }));
    assert_eq!(test.ranking.as_ref().unwrap().call_count(), 0);
    assert_eq!(test.pages.write_count(), 0);
}

#[tokio::test]
async fn forced_batch_regenerates_existing_pages() {
    let test = TestDependencies::new().mock_directory(texas_directory());
    let deps = test.server_deps();

    generate_batch(&texas_locations(), false, &deps).await.unwrap();
    let outcomes = generate_batch(&texas_locations(), true, &deps).await.unwrap();

    assert!(outcomes.iter().all(GenerationOutcome::is_saved));
    assert_eq!(test.pages.write_count(), 6);
    assert_eq!(test.pages.pages().len(), 3);
}
