//! MCP Server handler for SonarCloud quality profiles.

use rmcp::{
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, ErrorData as McpError, Implementation,
        ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
        ToolsCapability,
    },
    service::RequestContext,
    RoleServer,
};
use schemars::JsonSchema;
use std::sync::Arc;

use crate::{
    get_history_of_changes_on_quality_profile, search_quality_profiles, show_quality_profile,
    mcp::{ChangelogParams, SearchParams, ShowParams},
    ChangelogQuery, SearchQuery, SonarClient, SonarError,
};

/// Events returned by `changelog` when no limit is given.
const DEFAULT_CHANGELOG_LIMIT: usize = 100;

/// Upper bound on events returned by one `changelog` call.
const MAX_CHANGELOG_LIMIT: usize = 1000;

/// SonarCloud MCP Server.
///
/// Implements the MCP ServerHandler trait, providing read-only tools over
/// the quality profiles API.
///
/// # Tools
///
/// - `search_profiles` - Search the quality profiles of an organization
/// - `show_profile` - Show a profile's ancestors and children
/// - `changelog` - Read the history of changes on a profile
#[derive(Clone)]
pub struct SonarServer {
    client: Arc<SonarClient>,
}

impl SonarServer {
    /// Create a new SonarServer from environment variables.
    ///
    /// Uses `SONAR_TOKEN` for authentication and optionally `SONAR_URL`
    /// for the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `SONAR_TOKEN` is not set.
    pub fn from_env() -> crate::Result<Self> {
        let client = SonarClient::from_env()?;
        Ok(Self::new(client))
    }

    /// Create a new SonarServer with an existing client.
    pub fn new(client: SonarClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Generate JSON Schema for a type.
    fn schema<T: JsonSchema>() -> Arc<serde_json::Map<String, serde_json::Value>> {
        let schema = schemars::schema_for!(T);
        let value = serde_json::to_value(&schema).unwrap_or(serde_json::json!({}));
        match value {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        }
    }

    /// Convert SonarError to McpError.
    fn to_mcp_error(err: SonarError) -> McpError {
        match &err {
            SonarError::NotFound(msg) => McpError::resource_not_found(msg.clone(), None),
            SonarError::ConfigMissing(msg) => McpError::invalid_params(msg.clone(), None),
            SonarError::MissingParameter { .. }
            | SonarError::UnknownParameter { .. }
            | SonarError::ReservedParameter(_) => McpError::invalid_params(err.to_string(), None),
            _ => McpError::internal_error(err.to_string(), None),
        }
    }

    fn to_text<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    /// Handle the `search_profiles` tool.
    pub async fn handle_search(&self, params: SearchParams) -> Result<CallToolResult, McpError> {
        let query = SearchQuery {
            organization: params.organization,
            defaults: params.defaults,
            language: params.language,
            project_key: params.project,
            quality_profile: None,
        };

        let profiles = search_quality_profiles(&self.client, &query)
            .await
            .map_err(Self::to_mcp_error)?;
        Self::to_text(&profiles)
    }

    /// Handle the `show_profile` tool.
    pub async fn handle_show(&self, params: ShowParams) -> Result<CallToolResult, McpError> {
        let inheritance = show_quality_profile(&self.client, &params.profile)
            .await
            .map_err(Self::to_mcp_error)?;
        Self::to_text(&inheritance)
    }

    /// Handle the `changelog` tool.
    ///
    /// Pulls events until `limit` is reached or the changelog is exhausted,
    /// so only the pages needed are requested.
    pub async fn handle_changelog(
        &self,
        params: ChangelogParams,
    ) -> Result<CallToolResult, McpError> {
        let limit = params
            .limit
            .unwrap_or(DEFAULT_CHANGELOG_LIMIT)
            .min(MAX_CHANGELOG_LIMIT);

        let query = ChangelogQuery {
            profile: params.profile,
            since: params.since,
            to: params.to,
        };

        let mut events = get_history_of_changes_on_quality_profile(&self.client, &query)
            .map_err(Self::to_mcp_error)?;

        let mut collected = Vec::new();
        while collected.len() < limit {
            match events.next().await.map_err(Self::to_mcp_error)? {
                Some(event) => collected.push(event),
                None => break,
            }
        }

        Self::to_text(&serde_json::json!({
            "events": collected,
            "total": events.cursor().total,
        }))
    }
}

impl ServerHandler for SonarServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                ..Default::default()
            },
            server_info: Implementation {
                name: "sonarapi".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "SonarCloud MCP Server - Search quality profiles, inspect inheritance, and read changelogs."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: PaginatedRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = vec![
            Tool::new(
                "search_profiles",
                "Search the quality profiles of a SonarCloud organization. \
                 Optionally filter by language, project key, or defaults only.",
                Self::schema::<SearchParams>(),
            ),
            Tool::new(
                "show_profile",
                "Show a quality profile's ancestors and children. \
                 Identify the profile by language, qualityProfile (name) and organization.",
                Self::schema::<ShowParams>(),
            ),
            Tool::new(
                "changelog",
                "Read the history of rule changes on a quality profile, most recent first. \
                 Supports since/to date filters and a limit on returned events.",
                Self::schema::<ChangelogParams>(),
            ),
        ];

        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::json!({}));

        match request.name.as_ref() {
            "search_profiles" => {
                let params: SearchParams = serde_json::from_value(args)
                    .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                self.handle_search(params).await
            }
            "show_profile" => {
                let params: ShowParams = serde_json::from_value(args)
                    .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                self.handle_show(params).await
            }
            "changelog" => {
                let params: ChangelogParams = serde_json::from_value(args)
                    .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                self.handle_changelog(params).await
            }
            other => Err(McpError::invalid_params(
                format!("Unknown tool: {other}"),
                None,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn text_of(result: &CallToolResult) -> &str {
        match &result.content[0].raw {
            rmcp::model::RawContent::Text(t) => &t.text,
            _ => panic!("Expected text content"),
        }
    }

    #[test]
    fn schema_generates_for_all_params() {
        assert!(!SonarServer::schema::<SearchParams>().is_empty());
        assert!(!SonarServer::schema::<ShowParams>().is_empty());
        assert!(!SonarServer::schema::<ChangelogParams>().is_empty());
    }

    #[test]
    fn server_implements_handler() {
        fn assert_server_handler<T: ServerHandler>() {}
        assert_server_handler::<SonarServer>();
    }

    #[test]
    fn get_info_reports_name() {
        let client = SonarClient::new("test-token", "https://sonarcloud.io").unwrap();
        let server = SonarServer::new(client);
        assert_eq!(server.get_info().server_info.name, "sonarapi");
    }

    #[tokio::test]
    async fn handle_search_returns_profiles() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/qualityprofiles/search"))
            .and(query_param("organization", "acme"))
            .and(query_param("language", "java"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "profiles": [
                    {"key": "AU-1", "name": "Sonar way", "language": "java", "isDefault": true}
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = SonarClient::new("test-token", &mock_server.uri()).unwrap();
        let server = SonarServer::new(client);

        let result = server
            .handle_search(SearchParams {
                organization: "acme".to_string(),
                language: Some("java".to_string()),
                project: None,
                defaults: false,
            })
            .await
            .unwrap();

        assert!(!result.is_error.unwrap_or(false));
        let profiles: serde_json::Value = serde_json::from_str(text_of(&result)).unwrap();
        assert_eq!(profiles[0]["name"], "Sonar way");
    }

    #[tokio::test]
    async fn handle_changelog_stops_at_limit() {
        let mock_server = MockServer::start().await;

        // Only the first page should be requested
        Mock::given(method("GET"))
            .and(path("/api/qualityprofiles/changelog"))
            .and(query_param("p", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "p": 1,
                "ps": 2,
                "total": 10,
                "events": [
                    {"action": "ACTIVATED", "ruleKey": "java:S1"},
                    {"action": "UPDATED", "ruleKey": "java:S2"}
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = SonarClient::new("test-token", &mock_server.uri()).unwrap();
        let server = SonarServer::new(client);

        let params: ChangelogParams = serde_json::from_value(serde_json::json!({
            "language": "java",
            "qualityProfile": "Sonar way",
            "organization": "acme",
            "limit": 2
        }))
        .unwrap();

        let result = server.handle_changelog(params).await.unwrap();
        let body: serde_json::Value = serde_json::from_str(text_of(&result)).unwrap();
        assert_eq!(body["events"].as_array().unwrap().len(), 2);
        assert_eq!(body["total"], 10);
    }

    #[tokio::test]
    async fn handle_show_not_found_maps_to_mcp_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/qualityprofiles/inheritance"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "errors": [{"msg": "Quality Profile for language 'java' and name 'Nope' does not exist"}]
            })))
            .mount(&mock_server)
            .await;

        let client = SonarClient::new("test-token", &mock_server.uri()).unwrap();
        let server = SonarServer::new(client);

        let params: ShowParams = serde_json::from_value(serde_json::json!({
            "language": "java",
            "qualityProfile": "Nope",
            "organization": "acme"
        }))
        .unwrap();

        let err = server.handle_show(params).await.unwrap_err();
        assert!(err.message.contains("does not exist"));
    }
}
