//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own content database and a
//! scripted completion provider.

use super::constants::*;
use super::fixtures::ScriptedProvider;
use chordcraft_server::content_store::{ContentStore, SqliteContentStore};
use chordcraft_server::generation::{GenerationPipeline, PromptCompiler};
use chordcraft_server::library::LibraryService;
use chordcraft_server::llm::LlmError;
use chordcraft_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated content database
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Content store for direct database access in tests
    pub store: Arc<dyn ContentStore>,

    /// The provider answering completion requests, for prompt inspection
    #[allow(dead_code)]
    pub provider: Arc<ScriptedProvider>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// The provider answers completion requests with `replies`, in order.
    /// Once they run out, every further request fails with a connection error.
    ///
    /// # Panics
    ///
    /// Panics if the database can't be created, the port can't be bound,
    /// or the server doesn't become ready within timeout.
    pub async fn spawn(replies: Vec<Result<String, LlmError>>) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let store: Arc<dyn ContentStore> = Arc::new(
            SqliteContentStore::new(temp_db_dir.path().join("content.db"))
                .expect("Failed to open content store"),
        );

        let provider = Arc::new(ScriptedProvider::new(replies));
        let pipeline = Arc::new(GenerationPipeline::new(
            PromptCompiler::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)),
            provider.clone(),
            store.clone(),
        ));
        let library = Arc::new(LibraryService::new(store.clone()));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            ..Default::default()
        };
        let app = make_app(config, pipeline, library);

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            store,
            provider,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
