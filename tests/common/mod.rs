//! Common test infrastructure
//!
//! End-to-end tests run real batches against a local asset origin. Tests
//! should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestEnv, TestOrigin, TRACK_1_ID};
//!
//! #[tokio::test]
//! async fn test_single_track() {
//!     let origin = TestOrigin::spawn().await;
//!     origin.serve_track(TRACK_1_ID);
//!     let env = TestEnv::new(&origin);
//!     let input = env.write_json_catalog(&[(TRACK_1_ID, "Title")]);
//!     let report = env.run(&input).await.unwrap();
//!     assert_eq!(report.saved(), 1);
//! }
//! ```

mod constants;
mod env;
mod fixtures;
mod origin;

// Public API - this is what tests import
pub use constants::*;
pub use env::TestEnv;
#[allow(unused_imports)]
pub use fixtures::{audio_payload, noisy_png, read_tag};
pub use origin::TestOrigin;
