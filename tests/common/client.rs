//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all chordcraft-server endpoints.
//!
//! When API routes or request formats change, update only this file.

#![allow(dead_code)]

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn post(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Request failed")
    }

    // ========================================================================
    // Generation Endpoints
    // ========================================================================

    pub async fn generate_progression(&self, mood: &str, style: &str, instrument: &str) -> Response {
        self.post(
            "/v1/progression",
            &json!({ "mood": mood, "style": style, "instrument": instrument }),
        )
        .await
    }

    /// `history` is a list of `{role, content}` objects, oldest first.
    pub async fn explain_progression(
        &self,
        progression: &[&str],
        style: &str,
        key: &str,
        history: Value,
    ) -> Response {
        self.post(
            "/v1/explanation",
            &json!({
                "progression": progression,
                "style": style,
                "key": key,
                "history": history,
            }),
        )
        .await
    }

    pub async fn tabulate_progression(
        &self,
        progression: &[&str],
        instrument: Option<&str>,
    ) -> Response {
        let mut body = json!({ "progression": progression });
        if let Some(instrument) = instrument {
            body["instrument"] = json!(instrument);
        }
        self.post("/v1/tablature", &body).await
    }

    /// Sends an arbitrary JSON body, for malformed-request tests.
    pub async fn post_raw(&self, path: &str, body: &str) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("Request failed")
    }

    // ========================================================================
    // Library Endpoints
    // ========================================================================

    pub async fn list_library(&self) -> Response {
        self.get("/v1/library").await
    }

    /// `key` may be a raw signature or its encoded form. It is sent percent-encoded.
    pub async fn get_library_item(&self, key: &str) -> Response {
        let encoded = urlencoding::encode(key);
        self.get(&format!("/v1/library/{}", encoded)).await
    }

    // ========================================================================
    // Misc
    // ========================================================================

    pub async fn home(&self) -> Response {
        self.get("/").await
    }
}
