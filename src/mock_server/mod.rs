//! Mock SonarCloud API server for E2E testing.
//!
//! This module provides an in-memory mock server that simulates the quality
//! profiles web services for integration and end-to-end testing. Unlike
//! wiremock which mocks at the HTTP level per-test, this server maintains
//! state across requests, enabling realistic workflow testing.
//!
//! # Example
//!
//! ```ignore
//! use sonarapi::mock_server::MockServer;
//! use sonarapi::{show_quality_profile, ProfileSelector, SonarClient};
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let server = MockServer::start().await;
//!     let client = SonarClient::new("test-token", server.url()).unwrap();
//!
//!     // Server comes with default fixtures
//!     let team = ProfileSelector::new("java", "Team way", "acme");
//!     let inheritance = show_quality_profile(&client, &team).await.unwrap();
//!     assert_eq!(inheritance.ancestors.len(), 2);
//!
//!     server.shutdown().await;
//! }
//! ```

mod fixtures;
mod handlers;
mod server;
mod state;

pub use fixtures::{DefaultScenario, Fixtures, ScenarioProfile, ORGANIZATION};
pub use server::MockServer;
pub use state::{MockState, StoredProfile};
