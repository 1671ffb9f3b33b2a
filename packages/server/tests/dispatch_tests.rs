//! Location resolution, dispatch to queue or inline, and queued execution.

mod common;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use gymdir_core::domains::best_gyms::activities::resolve_request_locations;
use gymdir_core::domains::best_gyms::{
    dispatch_batches, dispatch_per_location, register_best_gyms_jobs, BatchGenerateBestGymsPagesJob, BestGymsPage,
    GenerateBestGymsPageJob, GenerationRequest, PageFilter, PagePayload, RankingClient, UpsertOutcome,
};
use gymdir_core::domains::directory::{Location, LocationFilter, QualityGate};
use gymdir_core::kernel::jobs::{
    ErrorKind, InMemoryJobQueue, InlineDispatcher, Job, JobQueue, JobRegistry, JobRunner, JobRunnerConfig, JobStatus,
    QueueDispatcher,
};
use gymdir_core::kernel::{BasePageStore, ServerDeps, TestDependencies};

use crate::common::{existing_page, texas_directory};

fn registry() -> Arc<JobRegistry> {
    let mut registry = JobRegistry::new();
    register_best_gyms_jobs(&mut registry);
    Arc::new(registry)
}

fn request(state: Option<&str>, city: Option<&str>) -> GenerationRequest {
    GenerationRequest::new(LocationFilter::new(state, city), "pages")
}

fn location_args(job: &Job) -> GenerateBestGymsPageJob {
    serde_json::from_value(job.args.clone()).unwrap()
}

/// Page store whose writes always fail.
struct FailingPageStore;

#[async_trait]
impl BasePageStore for FailingPageStore {
    async fn exists(&self, _slug: &str) -> Result<bool> {
        Ok(false)
    }

    async fn find_by_slug(&self, _slug: &str) -> Result<Option<BestGymsPage>> {
        Ok(None)
    }

    async fn upsert(&self, _payload: PagePayload) -> Result<UpsertOutcome> {
        Err(anyhow!("connection reset by peer"))
    }

    async fn list(&self, _filter: &PageFilter, _limit: i64, _offset: i64) -> Result<Vec<BestGymsPage>> {
        Ok(Vec::new())
    }

    async fn count(&self, _filter: &PageFilter) -> Result<i64> {
        Ok(0)
    }
}

fn failing_deps() -> Arc<ServerDeps> {
    let test = TestDependencies::new().mock_directory(texas_directory());
    Arc::new(ServerDeps::new(
        test.directory.clone(),
        Arc::new(FailingPageStore),
        Arc::new(RankingClient::disabled()),
        QualityGate::standard(),
    ))
}

// =============================================================================
// Location resolution
// =============================================================================

#[tokio::test]
async fn unfiltered_resolution_lists_states_before_their_cities() {
    let test = TestDependencies::new().mock_directory(texas_directory());
    let deps = test.server_deps();

    let locations = resolve_request_locations(&request(None, None), &deps).await.unwrap();

    assert_eq!(
        locations,
        vec![
            Location::state_wide("Ohio"),
            Location::city("Ohio", "Columbus"),
            Location::state_wide("Texas"),
            Location::city("Texas", "Austin"),
            Location::city("Texas", "Dallas"),
        ]
    );
}

#[tokio::test]
async fn city_filter_drops_state_entries() {
    let test = TestDependencies::new().mock_directory(texas_directory());
    let deps = test.server_deps();

    let locations = resolve_request_locations(&request(None, Some(" Austin ")), &deps)
        .await
        .unwrap();

    assert_eq!(locations, vec![Location::city("Texas", "Austin")]);
}

#[tokio::test]
async fn location_limit_truncates_after_sorting() {
    let test = TestDependencies::new().mock_directory(texas_directory());
    let deps = test.server_deps();

    let limited = request(Some("Texas"), None).with_location_limit(Some(2));
    let locations = resolve_request_locations(&limited, &deps).await.unwrap();

    assert_eq!(
        locations,
        vec![Location::state_wide("Texas"), Location::city("Texas", "Austin")]
    );
}

#[tokio::test]
async fn zero_location_limit_keeps_one_location() {
    let test = TestDependencies::new().mock_directory(texas_directory());
    let deps = test.server_deps();

    let limited = request(Some("Texas"), None).with_location_limit(Some(0));
    let locations = resolve_request_locations(&limited, &deps).await.unwrap();

    assert_eq!(locations, vec![Location::state_wide("Texas")]);
}

#[tokio::test]
async fn unknown_filter_dispatches_nothing() {
    let test = TestDependencies::new().mock_directory(texas_directory());
    let deps = test.server_deps();
    let queue = Arc::new(InMemoryJobQueue::new());
    let dispatcher = QueueDispatcher::new(queue.clone());

    let summary = dispatch_per_location(&request(Some("Nevada"), None), &deps, &dispatcher)
        .await
        .unwrap();

    assert_eq!(summary.locations, 0);
    assert_eq!(summary.units, 0);
    assert!(queue.jobs().is_empty());
}

// =============================================================================
// Queue dispatch
// =============================================================================

#[tokio::test]
async fn per_location_dispatch_enqueues_one_job_each() {
    let test = TestDependencies::new().mock_directory(texas_directory());
    let deps = test.server_deps();
    let queue = Arc::new(InMemoryJobQueue::new());
    let dispatcher = QueueDispatcher::new(queue.clone());

    let summary = dispatch_per_location(&request(Some("Texas"), None).with_force(true), &deps, &dispatcher)
        .await
        .unwrap();

    assert_eq!(summary.locations, 3);
    assert_eq!(summary.units, 3);

    let jobs = queue.jobs();
    assert!(jobs.iter().all(|j| j.queue == "pages"));
    assert!(jobs.iter().all(|j| j.job_type == GenerateBestGymsPageJob::JOB_TYPE));
    assert_eq!(
        jobs[1].idempotency_key.as_deref(),
        Some("best_gyms_page:Austin, Texas|city:force")
    );
    assert_eq!(
        location_args(&jobs[0]),
        GenerateBestGymsPageJob::new(Location::state_wide("Texas"), true)
    );
    assert_eq!(test.pages.write_count(), 0);
}

#[tokio::test]
async fn repeated_dispatch_is_deduplicated_while_pending() {
    let test = TestDependencies::new().mock_directory(texas_directory());
    let deps = test.server_deps();
    let queue = Arc::new(InMemoryJobQueue::new());
    let dispatcher = QueueDispatcher::new(queue.clone());

    dispatch_per_location(&request(Some("Texas"), None), &deps, &dispatcher)
        .await
        .unwrap();
    let again = dispatch_per_location(&request(Some("Texas"), None), &deps, &dispatcher)
        .await
        .unwrap();

    assert_eq!(again.units, 3);
    assert_eq!(again.failed, 0);
    assert_eq!(queue.jobs().len(), 3);
}

#[tokio::test]
async fn batches_are_chunked_in_resolution_order() {
    let test = TestDependencies::new().mock_directory(texas_directory());
    let deps = test.server_deps();
    let queue = Arc::new(InMemoryJobQueue::new());
    let dispatcher = QueueDispatcher::new(queue.clone());

    let summary = dispatch_batches(&request(None, None).with_batch_size(2), &deps, &dispatcher)
        .await
        .unwrap();

    assert_eq!(summary.locations, 5);
    assert_eq!(summary.units, 3);

    let batches: Vec<BatchGenerateBestGymsPagesJob> = queue
        .jobs()
        .iter()
        .map(|j| serde_json::from_value(j.args.clone()).unwrap())
        .collect();
    let sizes: Vec<usize> = batches.iter().map(|b| b.locations.len()).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(batches[2].locations, vec![Location::city("Texas", "Dallas")]);
}

#[tokio::test]
async fn zero_batch_size_counts_as_one() {
    let test = TestDependencies::new().mock_directory(texas_directory());
    let deps = test.server_deps();
    let queue = Arc::new(InMemoryJobQueue::new());
    let dispatcher = QueueDispatcher::new(queue.clone());

    let summary = dispatch_batches(&request(Some("Texas"), None).with_batch_size(0), &deps, &dispatcher)
        .await
        .unwrap();

    assert_eq!(summary.units, 3);
}

// =============================================================================
// Inline dispatch
// =============================================================================

#[tokio::test]
async fn inline_dispatch_generates_pages_immediately() {
    let test = TestDependencies::new().mock_directory(texas_directory());
    let deps = test.server_deps();
    let dispatcher = InlineDispatcher::new(registry(), deps.clone());

    let summary = dispatch_per_location(&request(None, None), &deps, &dispatcher)
        .await
        .unwrap();

    assert_eq!(summary.units, 5);
    assert_eq!(summary.failed, 0);
    let slugs: Vec<String> = test.pages.pages().into_iter().map(|p| p.slug).collect();
    assert_eq!(
        slugs,
        vec![
            "best-austin-gyms",
            "best-columbus-gyms",
            "best-dallas-gyms",
            "best-ohio-gyms",
            "best-texas-gyms",
        ]
    );
}

#[tokio::test]
async fn inline_batches_skip_existing_pages() {
    let test = TestDependencies::new().mock_directory(texas_directory());
    test.pages
        .upsert(existing_page(&Location::city("Texas", "Dallas")))
        .await
        .unwrap();
    let deps = test.server_deps();
    let dispatcher = InlineDispatcher::new(registry(), deps.clone());

    let summary = dispatch_batches(&request(Some("Texas"), None), &deps, &dispatcher)
        .await
        .unwrap();

    assert_eq!(summary.units, 1);
    assert_eq!(test.pages.write_count(), 3);
    assert!(test.pages.page("best-dallas-gyms").unwrap().gyms_data.0.is_empty());
}

#[tokio::test]
async fn inline_failure_is_counted_and_remaining_units_run() {
    let deps = failing_deps();
    let dispatcher = InlineDispatcher::new(registry(), deps.clone());

    let summary = dispatch_per_location(&request(Some("Texas"), None), &deps, &dispatcher)
        .await
        .unwrap();

    assert_eq!(summary.units, 3);
    assert_eq!(summary.failed, 3);
}

// =============================================================================
// Job runner
// =============================================================================

fn runner(queue: Arc<InMemoryJobQueue>, deps: Arc<ServerDeps>) -> JobRunner {
    let config = JobRunnerConfig::with_worker_id("test-worker").with_queues(vec!["pages".to_string()]);
    JobRunner::with_config(queue, registry(), deps, config)
}

#[tokio::test]
async fn runner_executes_queued_pages() {
    let test = TestDependencies::new().mock_directory(texas_directory());
    let deps = test.server_deps();
    let queue = Arc::new(InMemoryJobQueue::new());

    dispatch_batches(&request(Some("Texas"), None), &deps, &QueueDispatcher::new(queue.clone()))
        .await
        .unwrap();

    let processed = runner(queue.clone(), deps).run_once().await.unwrap();

    assert_eq!(processed, 1);
    assert_eq!(queue.jobs_with_status(JobStatus::Succeeded).len(), 1);
    assert_eq!(test.pages.pages().len(), 3);
}

#[tokio::test]
async fn runner_ignores_other_queues() {
    let test = TestDependencies::new().mock_directory(texas_directory());
    let deps = test.server_deps();
    let queue = Arc::new(InMemoryJobQueue::new());
    let other = GenerationRequest::new(LocationFilter::new(Some("Texas"), None), "elsewhere");

    dispatch_per_location(&other, &deps, &QueueDispatcher::new(queue.clone()))
        .await
        .unwrap();

    let processed = runner(queue.clone(), deps).run_once().await.unwrap();

    assert_eq!(processed, 0);
    assert_eq!(queue.jobs_with_status(JobStatus::Pending).len(), 3);
}

#[tokio::test]
async fn failing_job_retries_then_dead_letters() {
    let deps = failing_deps();
    let queue = Arc::new(InMemoryJobQueue::new());

    dispatch_per_location(&request(None, Some("Austin")), &deps, &QueueDispatcher::new(queue.clone()))
        .await
        .unwrap();
    let runner = runner(queue.clone(), deps);

    for _ in 0..3 {
        queue.release_delayed();
        assert_eq!(runner.run_once().await.unwrap(), 1);
    }

    let dead = queue.jobs_with_status(JobStatus::DeadLetter);
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].attempt, 3);
    assert_eq!(dead[0].error_kind, Some(ErrorKind::Retryable));
    assert!(dead[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("connection reset by peer"));

    queue.release_delayed();
    assert_eq!(runner.run_once().await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_job_type_is_dead_lettered_at_once() {
    let test = TestDependencies::new();
    let queue = Arc::new(InMemoryJobQueue::new());
    let job = Job::builder()
        .job_type("reindex_everything")
        .queue("pages")
        .args(serde_json::json!({}))
        .build();
    queue.enqueue(job).await.unwrap();

    runner(queue.clone(), test.server_deps()).run_once().await.unwrap();

    let dead = queue.jobs_with_status(JobStatus::DeadLetter);
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].error_kind, Some(ErrorKind::NonRetryable));
}
