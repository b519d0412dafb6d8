//! Authenticated client for the Keeper document API
//!
//! Wraps every API call with bearer token injection, a pre-flight expiry
//! check and a single 401-triggered refresh-and-retry, on top of the
//! `keeper-auth` token manager.
//!
//! Call flow:
//! 1. `DocumentApi` builds a `RequestDescriptor` for the verb and route
//! 2. `Executor::execute()` refreshes an expired token, then sends it
//! 3. A 401 response triggers one refresh and one more attempt
//! 4. Error payloads and error statuses become `Error::RemoteApi`

pub mod api;
pub mod client;
pub mod error;
pub mod executor;
pub mod request;

#[cfg(test)]
mod test_support;

pub use api::DocumentApi;
pub use client::KeeperClient;
pub use error::{Error, Result};
pub use executor::{Executor, REACTIVE_RETRY_BUDGET};
pub use request::RequestDescriptor;
