//! Shared helpers for integration tests.

pub mod socket_guard;

use std::path::Path;
use std::time::Duration;

use formscan_core::{
    AnalysisStore, BatchOptions, BatchOrchestrator, ContentExtractor, CourtesyDelay, Database,
    DocumentFetcher, FetcherOptions,
};

/// Fetcher with the courtesy delay turned off.
#[allow(dead_code)]
#[must_use]
pub fn quiet_fetcher() -> DocumentFetcher {
    DocumentFetcher::with_options(FetcherOptions {
        courtesy: CourtesyDelay::disabled(),
        ..FetcherOptions::default()
    })
}

/// Orchestrator over `store` with no courtesy delay and a short fetch timeout.
///
/// # Errors
///
/// Returns error if the orchestrator rejects the options.
#[allow(dead_code)]
pub fn quiet_orchestrator(
    store: AnalysisStore,
    work_dir: &Path,
    concurrency: usize,
) -> Result<BatchOrchestrator, formscan_core::BatchError> {
    BatchOrchestrator::new(
        store,
        quiet_fetcher(),
        ContentExtractor::new(),
        BatchOptions {
            concurrency,
            work_dir: work_dir.to_path_buf(),
            fetch_timeout: Duration::from_secs(5),
            ..BatchOptions::default()
        },
    )
}

/// File-backed store inside `dir`, so several pooled connections share it.
///
/// # Errors
///
/// Returns error if database creation fails.
#[allow(dead_code)]
pub async fn file_store(dir: &Path) -> Result<AnalysisStore, formscan_core::DbError> {
    let db = Database::new(&dir.join("analyses.db")).await?;
    Ok(AnalysisStore::new(db))
}

/// Single-page PDF with one text line per entry in `lines`.
///
/// # Errors
///
/// Returns error if the content stream or document cannot be encoded.
#[allow(dead_code)]
pub fn text_pdf(lines: &[&str]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("TL", vec![14.into()]),
        Operation::new("Td", vec![72.into(), 720.into()]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
