//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, JAZZ_PROGRESSION_REPLY};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_generate() {
//!     let server = TestServer::spawn(vec![Ok(JAZZ_PROGRESSION_REPLY.into())]).await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.generate_progression("happy", "Jazz", "Piano").await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod fixtures;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::ScriptedProvider;
pub use server::TestServer;
