//! Remote asset fetching.
//!
//! A single [`AssetFetcher`] streams both asset classes to disk with retry and
//! backoff; [`CoverResolver`] layers header fallbacks on top of it for the
//! less reliable cover origin.

mod client;
mod cover;
mod models;
mod progress;
mod retry_policy;

pub use client::AssetFetcher;
pub use cover::{CoverResolver, HeaderVariant, COVER_HEADER_VARIANTS};
pub use models::{FetchError, FetchErrorKind, FetchOutcome};
pub use progress::{AssetProgress, ProgressBoard};
pub use retry_policy::RetryPolicy;
