//! Tier-relative paths and storage endpoints.
//!
//! Every tier (instrument cache, facility storage, archive) stores a file under
//! the same relative path. A [`RelativePath`] is derived once from the path the
//! instrument reports and is then joined onto each [`Endpoint`]'s root.

mod endpoint;
mod relative;

pub use endpoint::{Endpoint, Tier};
pub use relative::{join, PathError, RelativePath};
