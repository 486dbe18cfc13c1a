//! Transfers between storage endpoints.
//!
//! A [`TransferClient`] submits work to the external transfer service and
//! reports task status. The [`TransferMonitor`] drives one request to a
//! terminal [`TransferOutcome`], enforcing the request's deadline itself.

mod http;
mod monitor;
mod types;

pub use http::HttpTransferClient;
pub use monitor::TransferMonitor;
pub use types::*;
