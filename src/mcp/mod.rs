//! MCP (Model Context Protocol) server and tool types.
//!
//! This module provides an MCP server implementation for SonarCloud quality
//! profiles, allowing AI assistants to search profiles, inspect their
//! inheritance and read their changelog.
//!
//! # Example
//!
//! ```no_run
//! use sonarapi::mcp::SonarServer;
//!
//! # fn main() -> sonarapi::Result<()> {
//! let server = SonarServer::from_env()?;
//! // Server can now be used with rmcp transport
//! # Ok(())
//! # }
//! ```

mod params;
mod server;

pub use params::*;
pub use server::SonarServer;
