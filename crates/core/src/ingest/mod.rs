//! Metadata ingestion.
//!
//! Once a file is confirmed on the archive tier, the [`IngestionNotifier`]
//! posts a job to the ingestion service. The service mounts the archive under
//! a different prefix, so the relative path is re-rooted before submission.

mod http;
mod notifier;
mod types;

pub use http::HttpIngestApi;
pub use notifier::IngestionNotifier;
pub use types::*;
