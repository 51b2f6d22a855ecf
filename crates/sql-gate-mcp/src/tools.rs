// crates/sql-gate-mcp/src/tools.rs
// ============================================================================
// Module: Tool Router
// Description: Tool definitions and dispatch onto the gateway.
// Purpose: Decode tool arguments strictly and return JSON results.
// Dependencies: sql-gate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Four tools are exposed:
//! - `query_readonly`: run a query through the full gateway pipeline.
//! - `review_query`: structural validation and best-practices review only.
//! - `list_environments`: the active environment profiles.
//! - `list_rules`: the active best-practice rules with effective severities.
//!
//! Arguments are untrusted; unknown fields are rejected before any gateway
//! stage runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use sql_gate_core::CallerId;
use sql_gate_core::Environment;
use sql_gate_core::EnvironmentProfile;
use sql_gate_core::Finding;
use sql_gate_core::QueryRequest;
use sql_gate_core::sql::Rule;
use thiserror::Error;

use crate::gateway::Gateway;

// ============================================================================
// SECTION: Tool Definitions
// ============================================================================

/// Tool names exposed by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    /// Execute a read-only query.
    QueryReadonly,
    /// Review a query without executing it.
    ReviewQuery,
    /// List environment profiles.
    ListEnvironments,
    /// List active review rules.
    ListRules,
}

impl ToolName {
    /// All tools in listing order.
    pub const ALL: [Self; 4] =
        [Self::QueryReadonly, Self::ReviewQuery, Self::ListEnvironments, Self::ListRules];

    /// Returns the wire name of the tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QueryReadonly => "query_readonly",
            Self::ReviewQuery => "review_query",
            Self::ListEnvironments => "list_environments",
            Self::ListRules => "list_rules",
        }
    }

    /// Parses a wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }
}

/// Tool definition advertised by `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: &'static str,
    /// Tool description.
    pub description: &'static str,
    /// JSON schema of the arguments.
    pub input_schema: Value,
}

/// Tool routing errors.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool name is not registered.
    #[error("unknown tool")]
    UnknownTool,
    /// The arguments did not match the tool schema.
    #[error("invalid params: {0}")]
    InvalidParams(String),
    /// The result could not be serialized.
    #[error("serialization failed")]
    Serialization,
}

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Arguments of `query_readonly`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct QueryReadonlyArgs {
    /// Query text.
    query: String,
    /// Target environment.
    environment: Environment,
    /// Target database.
    #[serde(default)]
    database: Option<String>,
    /// Requested page.
    #[serde(default)]
    page: Option<u32>,
    /// Requested page size.
    #[serde(default)]
    page_size: Option<u32>,
}

/// Arguments of `review_query`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReviewQueryArgs {
    /// Query text.
    query: String,
    /// Environment whose limits apply.
    environment: Environment,
    /// Target database.
    #[serde(default)]
    database: Option<String>,
}

/// Result of `list_environments`.
#[derive(Debug, Serialize)]
struct EnvironmentList<'a> {
    /// Profiles in environment order.
    environments: Vec<&'a EnvironmentProfile>,
}

/// Result of `list_rules`.
#[derive(Debug, Serialize)]
struct RuleList {
    /// Active rules in evaluation order, at their effective severity.
    rules: Vec<Finding>,
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Routes tool calls onto the gateway.
#[derive(Clone)]
pub struct ToolRouter {
    /// Shared gateway.
    gateway: Arc<Gateway>,
}

impl ToolRouter {
    /// Builds a router over a gateway.
    #[must_use]
    pub const fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
        }
    }

    /// Returns the gateway.
    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Lists the available tools.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        ToolName::ALL.into_iter().map(definition).collect()
    }

    /// Handles one tool call for `caller`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] for unknown tools, bad arguments, or
    /// unserializable results. Gateway rejections are results, not errors.
    pub async fn handle_tool_call(
        &self,
        caller: &CallerId,
        name: &str,
        arguments: Value,
    ) -> Result<Value, ToolError> {
        match ToolName::parse(name).ok_or(ToolError::UnknownTool)? {
            ToolName::QueryReadonly => {
                let args: QueryReadonlyArgs = decode(arguments)?;
                let mut request = QueryRequest::new(args.query, args.environment)
                    .with_page(args.page, args.page_size)
                    .with_caller(caller.clone());
                if let Some(database) = args.database {
                    request = request.with_database(database);
                }
                let envelope = self.gateway.handle(&request).await;
                serde_json::to_value(envelope).map_err(|_| ToolError::Serialization)
            }
            ToolName::ReviewQuery => {
                let args: ReviewQueryArgs = decode(arguments)?;
                let review =
                    self.gateway.review(&args.query, args.environment, args.database.as_deref());
                serde_json::to_value(review).map_err(|_| ToolError::Serialization)
            }
            ToolName::ListEnvironments => {
                expect_no_arguments(ToolName::ListEnvironments, &arguments)?;
                let list = EnvironmentList {
                    environments: self.gateway.profiles().iter().collect(),
                };
                serde_json::to_value(list).map_err(|_| ToolError::Serialization)
            }
            ToolName::ListRules => {
                expect_no_arguments(ToolName::ListRules, &arguments)?;
                let rules = self.gateway.analyzer().registry().rules();
                let list = RuleList {
                    rules: rules.iter().map(Rule::finding).collect(),
                };
                serde_json::to_value(list).map_err(|_| ToolError::Serialization)
            }
        }
    }
}

/// Decodes tool arguments.
fn decode<T: for<'de> Deserialize<'de>>(arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|err| ToolError::InvalidParams(err.to_string()))
}

/// Rejects anything but `null` or `{}` for argument-less tools.
fn expect_no_arguments(tool: ToolName, arguments: &Value) -> Result<(), ToolError> {
    let empty = match arguments {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        Ok(())
    } else {
        Err(ToolError::InvalidParams(format!("{} takes no arguments", tool.as_str())))
    }
}

/// Returns the advertised definition of a tool.
fn definition(tool: ToolName) -> ToolDefinition {
    let environment = json!({ "type": "string", "enum": ["Int", "Stg", "Prd"] });
    match tool {
        ToolName::QueryReadonly => ToolDefinition {
            name: tool.as_str(),
            description: "Run a read-only query through validation, cost, throttle, and review \
                          gates; returns a result envelope.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "environment": environment,
                    "database": { "type": "string" },
                    "page": { "type": "integer", "minimum": 1 },
                    "page_size": { "type": "integer", "minimum": 1 }
                },
                "required": ["query", "environment"],
                "additionalProperties": false
            }),
        },
        ToolName::ReviewQuery => ToolDefinition {
            name: tool.as_str(),
            description: "Validate and review a query without executing it.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "environment": environment,
                    "database": { "type": "string" }
                },
                "required": ["query", "environment"],
                "additionalProperties": false
            }),
        },
        ToolName::ListEnvironments => ToolDefinition {
            name: tool.as_str(),
            description: "List the active environment profiles and their limits.",
            input_schema: json!({ "type": "object", "properties": {}, "additionalProperties": false }),
        },
        ToolName::ListRules => ToolDefinition {
            name: tool.as_str(),
            description: "List the active best-practice rules with their severities and \
                          recommendations.",
            input_schema: json!({ "type": "object", "properties": {}, "additionalProperties": false }),
        },
    }
}
