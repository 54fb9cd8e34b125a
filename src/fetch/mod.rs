//! Document retrieval.
//!
//! Fetches one remote document per call into a caller-owned directory.
//! Every failure (invalid URL, network error, timeout, non-2xx status, disk
//! write) is returned as a [`FetchError`] value so a batch can skip the item
//! and continue.

pub mod constants;
mod courtesy;
mod error;
mod fetcher;
mod filename;

pub use courtesy::CourtesyDelay;
pub use error::FetchError;
pub use fetcher::{DocumentFetcher, FetcherOptions};
