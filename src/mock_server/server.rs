//! Mock SonarCloud API server.
//!
//! Provides an axum-based HTTP server that simulates the quality profiles
//! web services.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::fixtures::{DefaultScenario, Fixtures};
use super::handlers::{self, sonar_error};
use super::state::MockState;

/// A mock SonarCloud API server for testing.
///
/// The server runs in the background and can be used to test the client
/// against a stateful implementation of the quality profiles API.
pub struct MockServer {
    /// The URL where the server is listening.
    url: String,
    /// Handle to the server task.
    handle: JoinHandle<()>,
    /// Shared state that can be modified during tests.
    state: Arc<RwLock<MockState>>,
}

impl MockServer {
    /// Start a new mock server with default fixtures.
    ///
    /// The server listens on a random available port and returns immediately.
    /// Use `url()` to get the server's base URL.
    pub async fn start() -> Self {
        Self::with_state(Self::default_state()).await
    }

    /// Start a mock server with empty state.
    ///
    /// Useful when you want to control exactly what data is available.
    pub async fn start_empty() -> Self {
        Self::with_state(MockState::new()).await
    }

    /// Start a mock server with custom state.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn with_state(state: MockState) -> Self {
        let shared_state = state.shared();
        let app = Self::create_router(shared_state.clone());

        // Bind to a random available port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let addr = listener.local_addr().expect("Failed to get local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            url: format!("http://{}", addr),
            handle,
            state: shared_state,
        }
    }

    /// Get the base URL of the mock server.
    ///
    /// Use this URL when creating a `SonarClient` for testing.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get access to the server's shared state.
    ///
    /// This allows modifying the mock data during a test.
    pub fn state(&self) -> Arc<RwLock<MockState>> {
        self.state.clone()
    }

    /// Shutdown the server.
    ///
    /// This aborts the server task. It's safe to call multiple times.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    /// Create the default state with common test fixtures.
    fn default_state() -> MockState {
        Self::state_from_scenario(Fixtures::default_scenario())
    }

    /// Create state from a scenario.
    fn state_from_scenario(scenario: DefaultScenario) -> MockState {
        let org = scenario.organization.as_str();
        let mut state = MockState::new();

        for seeded in scenario.profiles {
            let language = seeded.profile.language.clone();
            let name = seeded.profile.name.clone();
            state = state
                .with_profile(org, seeded.profile, &seeded.rules)
                .with_events(org, &language, &name, seeded.events);
            for project in seeded.projects {
                // The profile was just inserted, so this cannot fail.
                let _ = state.add_project(org, &language, &name, project);
            }
        }

        state
    }

    /// Create the axum router with all routes.
    fn create_router(state: Arc<RwLock<MockState>>) -> Router {
        Router::new()
            .route("/api/qualityprofiles/search", get(handlers::search_profiles))
            .route("/api/qualityprofiles/create", post(handlers::create_profile))
            .route("/api/qualityprofiles/delete", post(handlers::delete_profile))
            .route(
                "/api/qualityprofiles/set_default",
                post(handlers::set_default_profile),
            )
            .route("/api/qualityprofiles/add_project", post(handlers::add_project))
            .route(
                "/api/qualityprofiles/remove_project",
                post(handlers::remove_project),
            )
            .route(
                "/api/qualityprofiles/inheritance",
                get(handlers::show_inheritance),
            )
            .route(
                "/api/qualityprofiles/change_parent",
                post(handlers::change_parent),
            )
            .route("/api/qualityprofiles/changelog", get(handlers::get_changelog))
            .route("/api/qualityprofiles/backup", get(handlers::backup_profile))
            .route("/api/qualityprofiles/restore", post(handlers::restore_profile))
            .route("/api/qualityprofiles/export", get(handlers::export_profile))
            .route("/api/qualityprofiles/exporters", get(handlers::list_exporters))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
            // Health check
            .route("/health", get(health_check))
            .with_state(state)
    }
}

/// Reject requests without the configured bearer token.
async fn require_token(
    State(state): State<Arc<RwLock<MockState>>>,
    request: Request,
    next: Next,
) -> Response {
    let required = state.read().await.required_token.clone();

    if let Some(token) = required {
        let presented = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        if presented != Some(token.as_str()) {
            return sonar_error(StatusCode::UNAUTHORIZED, "Authentication is required");
        }
    }

    next.run(request).await
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}
