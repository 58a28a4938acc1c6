//! Service alert delivery.
//!
//! Sends a one-off alert email through the platform's notification service:
//! authenticate against the token issuer, resolve the target org and space,
//! then post the notification. Every request is retried with exponential
//! backoff while failures look transient, and the whole send is bounded by a
//! global deadline.

pub mod composer;
pub mod dispatcher;
pub mod http;
pub mod resolver;
pub mod retry;
pub mod token;

pub use dispatcher::{AlertDispatcher, DispatchError, ErrorKind};
pub use retry::{RetryExecutor, RetryPolicy};
