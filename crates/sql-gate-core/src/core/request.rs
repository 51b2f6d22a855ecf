// crates/sql-gate-core/src/core/request.rs
// ============================================================================
// Module: SQL Gate Query Requests
// Description: Immutable query request submitted to the gateway.
// Purpose: Carry query text, target, pagination, and caller identity.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`QueryRequest`] is assembled by the tool front end and handed to the
//! gateway by reference. Builder methods consume the request, so once it is
//! submitted it cannot change.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::environment::Environment;
use crate::core::identifiers::CallerId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Read-only query submitted to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    /// Raw query text.
    query: String,
    /// Target environment.
    environment: Environment,
    /// Optional target database.
    database: Option<String>,
    /// Requested page (1-based).
    page: Option<u32>,
    /// Requested page size.
    page_size: Option<u32>,
    /// Caller identity.
    caller: CallerId,
}

impl QueryRequest {
    /// Creates a request issued by the default caller.
    #[must_use]
    pub fn new(query: impl Into<String>, environment: Environment) -> Self {
        Self {
            query: query.into(),
            environment,
            database: None,
            page: None,
            page_size: None,
            caller: CallerId::default(),
        }
    }

    /// Sets the target database.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the requested page window.
    #[must_use]
    pub const fn with_page(mut self, page: Option<u32>, page_size: Option<u32>) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Sets the caller identity.
    #[must_use]
    pub fn with_caller(mut self, caller: CallerId) -> Self {
        self.caller = caller;
        self
    }

    /// Returns the raw query text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns the target environment.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Returns the target database when supplied.
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Returns the requested page.
    #[must_use]
    pub const fn page(&self) -> Option<u32> {
        self.page
    }

    /// Returns the requested page size.
    #[must_use]
    pub const fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    /// Returns the caller identity.
    #[must_use]
    pub const fn caller(&self) -> &CallerId {
        &self.caller
    }
}
