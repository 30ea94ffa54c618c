//! Shared plumbing for the remote API clients.
//!
//! - [`error`]: `RemoteError`, categorized transient vs permanent
//! - [`retry`]: exponential backoff for transient failures

mod error;
mod retry;

pub use error::{RemoteError, RemoteErrorKind, RemoteService, retry_after_header};
pub use retry::{Backoff, retry_with_backoff};
