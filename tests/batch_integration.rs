//! Integration tests for the batch orchestrator: mock server in, SQLite out.

use std::time::{Duration, Instant};

use formscan_core::{BatchState, FailureStage, IndustryVertical, PLACEHOLDER_TEXT};
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;
use support::{file_store, quiet_orchestrator, text_pdf};

const PDF_CONTENT_TYPE: &str = "application/pdf";

#[tokio::test]
async fn test_batch_stores_successes_and_records_failures() -> Result<(), Box<dyn std::error::Error>>
{
    let Some(server) = start_mock_server_or_skip().await else {
        return Ok(());
    };
    Mock::given(method("GET"))
        .and(path("/bank.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            text_pdf(&[
                "First National Bank",
                "Account Opening",
                "Signature ________",
            ])?,
            PDF_CONTENT_TYPE,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clinic.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            text_pdf(&["Patient Intake Questionnaire", "HIPAA"])?,
            PDF_CONTENT_TYPE,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let db_dir = TempDir::new()?;
    let work_dir = TempDir::new()?;
    let store = file_store(db_dir.path()).await?;
    let orchestrator = quiet_orchestrator(store.clone(), work_dir.path(), 2)?;

    let urls = vec![
        format!("{}/bank.pdf", server.uri()),
        format!("{}/gone.pdf", server.uri()),
        format!("{}/clinic.pdf", server.uri()),
    ];
    let status = orchestrator.submit_batch(urls).wait().await;

    assert_eq!(status.state, BatchState::Completed);
    assert_eq!(status.total, 3);
    assert_eq!(status.stored, 2);
    assert_eq!(status.degraded, 0);
    assert_eq!(status.failures.len(), 1);
    assert_eq!(status.failures[0].stage, FailureStage::Fetch);
    assert!(status.failures[0].url.ends_with("/gone.pdf"));
    assert_eq!(status.attempted(), 3);

    let stored = store.list(10, 0).await?;
    assert_eq!(stored.len(), 2);
    let mut sources: Vec<_> = stored
        .iter()
        .filter_map(|r| r.profile.source_url.clone())
        .collect();
    sources.sort();
    assert!(sources[0].ends_with("/bank.pdf"));
    assert!(sources[1].ends_with("/clinic.pdf"));
    Ok(())
}

#[tokio::test]
async fn test_unextractable_document_is_stored_degraded() -> Result<(), Box<dyn std::error::Error>>
{
    let Some(server) = start_mock_server_or_skip().await else {
        return Ok(());
    };
    Mock::given(method("GET"))
        .and(path("/broken.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7 truncated".to_vec()))
        .mount(&server)
        .await;

    let db_dir = TempDir::new()?;
    let work_dir = TempDir::new()?;
    let store = file_store(db_dir.path()).await?;
    let orchestrator = quiet_orchestrator(store.clone(), work_dir.path(), 1)?;

    let status = orchestrator
        .submit_batch(vec![format!("{}/broken.pdf", server.uri())])
        .wait()
        .await;

    assert_eq!(status.stored, 1);
    assert_eq!(status.degraded, 1);
    assert!(status.failures.is_empty());

    let stored = store.list(1, 0).await?;
    assert_eq!(stored[0].profile.title, PLACEHOLDER_TEXT);
    Ok(())
}

#[tokio::test]
async fn test_html_page_is_not_scored_as_form() -> Result<(), Box<dyn std::error::Error>> {
    let Some(server) = start_mock_server_or_skip().await else {
        return Ok(());
    };
    Mock::given(method("GET"))
        .and(path("/login.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><body>Bank login. Signature required. Session expired</body></html>",
            "text/html",
        ))
        .mount(&server)
        .await;

    let db_dir = TempDir::new()?;
    let work_dir = TempDir::new()?;
    let store = file_store(db_dir.path()).await?;
    let orchestrator = quiet_orchestrator(store.clone(), work_dir.path(), 1)?;

    let status = orchestrator
        .submit_batch(vec![format!("{}/login.pdf", server.uri())])
        .wait()
        .await;

    assert_eq!(status.stored, 1);
    assert_eq!(status.degraded, 1);

    let stored = store.list(1, 0).await?;
    assert_eq!(stored[0].profile.title, PLACEHOLDER_TEXT);
    assert_eq!(stored[0].profile.industry_vertical, IndustryVertical::Unknown);
    Ok(())
}

#[tokio::test]
async fn test_store_failure_is_recorded_per_url() -> Result<(), Box<dyn std::error::Error>> {
    let Some(server) = start_mock_server_or_skip().await else {
        return Ok(());
    };
    Mock::given(method("GET"))
        .and(path("/form.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            text_pdf(&["Loan application form"])?,
            PDF_CONTENT_TYPE,
        ))
        .mount(&server)
        .await;

    let db_dir = TempDir::new()?;
    let work_dir = TempDir::new()?;
    let store = file_store(db_dir.path()).await?;
    sqlx::query("DROP TABLE form_analyses")
        .execute(store.database().pool())
        .await?;
    let orchestrator = quiet_orchestrator(store, work_dir.path(), 1)?;

    let url = format!("{}/form.pdf", server.uri());
    let status = orchestrator.submit_batch(vec![url.clone()]).wait().await;

    assert_eq!(status.state, BatchState::Completed);
    assert_eq!(status.stored, 0);
    assert_eq!(status.failures.len(), 1);
    assert_eq!(status.failures[0].stage, FailureStage::Store);
    assert_eq!(status.failures[0].url, url);
    assert!(status.failures[0].message.contains("form_analyses"));
    assert_eq!(std::fs::read_dir(work_dir.path())?.count(), 0);
    Ok(())
}

/// Runs `count` URLs that each respond after `delay`; `None` when sockets are unavailable.
async fn timed_batch(concurrency: usize, delay: Duration, count: usize) -> Option<Duration> {
    let server = start_mock_server_or_skip().await?;
    Mock::given(method("GET"))
        .and(path_regex(r"^/slow/\d+\.pdf$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.7 truncated".to_vec())
                .set_delay(delay),
        )
        .mount(&server)
        .await;

    let db_dir = TempDir::new().unwrap();
    let work_dir = TempDir::new().unwrap();
    let store = file_store(db_dir.path()).await.unwrap();
    let orchestrator = quiet_orchestrator(store, work_dir.path(), concurrency).unwrap();

    let urls = (0..count)
        .map(|i| format!("{}/slow/{i}.pdf", server.uri()))
        .collect();
    let started = Instant::now();
    let status = orchestrator.submit_batch(urls).wait().await;
    let elapsed = started.elapsed();

    assert_eq!(status.stored, count);
    Some(elapsed)
}

#[tokio::test]
async fn test_single_worker_processes_urls_one_at_a_time() {
    let delay = Duration::from_millis(200);
    let Some(elapsed) = timed_batch(1, delay, 4).await else {
        return;
    };
    assert!(
        elapsed >= delay * 4,
        "4 delayed URLs on one worker finished in {elapsed:?}"
    );
}

#[tokio::test]
async fn test_workers_process_urls_in_parallel() {
    let delay = Duration::from_millis(200);
    let Some(elapsed) = timed_batch(4, delay, 4).await else {
        return;
    };
    assert!(
        elapsed < delay * 4,
        "4 delayed URLs on four workers took {elapsed:?}"
    );
}

#[tokio::test]
async fn test_work_dir_is_emptied_after_batch() -> Result<(), Box<dyn std::error::Error>> {
    let Some(server) = start_mock_server_or_skip().await else {
        return Ok(());
    };
    Mock::given(method("GET"))
        .and(path("/form.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Loan application form"))
        .mount(&server)
        .await;

    let db_dir = TempDir::new()?;
    let work_dir = TempDir::new()?;
    let store = file_store(db_dir.path()).await?;
    let orchestrator = quiet_orchestrator(store, work_dir.path(), 4)?;

    // Same URL twice: each item writes into its own directory.
    let url = format!("{}/form.pdf", server.uri());
    let status = orchestrator.submit_batch(vec![url.clone(), url]).wait().await;

    assert_eq!(status.stored, 2);
    assert_eq!(status.degraded, 2);
    assert_eq!(std::fs::read_dir(work_dir.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_status_and_listing_reflect_batches() -> Result<(), Box<dyn std::error::Error>> {
    let db_dir = TempDir::new()?;
    let work_dir = TempDir::new()?;
    let store = file_store(db_dir.path()).await?;
    let orchestrator = quiet_orchestrator(store.clone(), work_dir.path(), 2)?;

    let first = orchestrator.submit_batch(vec!["not a url".to_string()]);
    let first_id = first.id();
    let first_status = first.wait().await;
    let second_status = orchestrator.submit_batch(Vec::new()).wait().await;

    assert_eq!(first_status.failures.len(), 1);
    assert_eq!(first_status.failures[0].stage, FailureStage::Fetch);

    let snapshot = orchestrator.status(first_id).ok_or("batch missing")?;
    assert!(snapshot.is_completed());
    assert!(snapshot.finished_at.is_some());

    let batches = orchestrator.list_batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].id, first_id);
    assert_eq!(batches[1].id, second_status.id);
    assert_eq!(batches[1].total, 0);

    assert_eq!(store.count().await?, 0);
    Ok(())
}
