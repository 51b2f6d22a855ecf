// crates/sql-gate-mcp/src/shaping.rs
// ============================================================================
// Module: Result Shaping
// Description: Row caps, pagination windows, and field/payload truncation.
// Purpose: Bound what a single response can carry without dropping rows.
// Dependencies: sql-gate-core, serde_json
// ============================================================================

//! ## Overview
//! Results are shaped in three steps:
//! 1. [`fetch_capped`] pulls rows from the executor cursor in batches and
//!    stops one row past the environment row cap, so an oversized result is
//!    detected without being materialized.
//! 2. [`paginate`] windows the capped rows.
//! 3. [`shape_page`] truncates oversized text values, then degrades text
//!    values to a marker once the running payload passes its cap. Rows are
//!    never dropped by this step.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use sql_gate_core::ExecutorError;
use sql_gate_core::PageInfo;
use sql_gate_core::Row;
use sql_gate_core::RowCursor;
use sql_gate_core::ViolationCode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Suffix appended to truncated text values; replaces values past the payload cap.
pub const FIELD_TRUNCATION_MARKER: &str = "...(truncated)";

// ============================================================================
// SECTION: Fetching
// ============================================================================

/// Rows fetched under a row cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CappedRows {
    /// Rows up to the cap.
    pub rows: Vec<Row>,
    /// True when the engine had more rows than the cap.
    pub limit_exceeded: bool,
}

/// Fetches at most `cap` rows in batches of `batch_size`.
///
/// # Errors
///
/// Returns [`ExecutorError`] when the cursor fails mid-stream.
pub async fn fetch_capped(
    cursor: &mut dyn RowCursor,
    cap: usize,
    batch_size: usize,
) -> Result<CappedRows, ExecutorError> {
    let wanted = cap.saturating_add(1);
    let batch_size = batch_size.max(1);
    let mut rows = Vec::new();
    while rows.len() < wanted {
        let request = batch_size.min(wanted - rows.len());
        match cursor.next_batch(request).await? {
            Some(batch) if !batch.is_empty() => rows.extend(batch),
            _ => break,
        }
    }
    let limit_exceeded = rows.len() > cap;
    rows.truncate(cap);
    Ok(CappedRows {
        rows,
        limit_exceeded,
    })
}

// ============================================================================
// SECTION: Pagination
// ============================================================================

/// Validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Rows per page.
    pub page_size: u32,
}

/// Resolves page inputs against the environment row cap.
///
/// Missing inputs default to page 1 and a page size equal to the row cap.
///
/// # Errors
///
/// Returns [`ViolationCode::InvalidPagination`] when the page is zero or the
/// page size is outside `1..=max_rows`.
pub fn resolve_page(
    page: Option<u32>,
    page_size: Option<u32>,
    max_rows: usize,
) -> Result<PageRequest, ViolationCode> {
    let page = page.unwrap_or(1);
    let page_size = page_size.unwrap_or_else(|| u32::try_from(max_rows).unwrap_or(u32::MAX));
    let within_cap = usize::try_from(page_size).is_ok_and(|size| size <= max_rows);
    if page == 0 || page_size == 0 || !within_cap {
        return Err(ViolationCode::InvalidPagination);
    }
    Ok(PageRequest {
        page,
        page_size,
    })
}

/// Windows `rows` to the requested page.
#[must_use]
pub fn paginate(mut rows: Vec<Row>, request: PageRequest) -> (Vec<Row>, PageInfo) {
    let total_rows = rows.len();
    let size = usize::try_from(request.page_size).unwrap_or(usize::MAX);
    let offset = usize::try_from(request.page - 1).unwrap_or(usize::MAX).saturating_mul(size);
    let end = offset.saturating_add(size).min(total_rows);
    let window = if offset >= total_rows { Vec::new() } else { rows.drain(offset..end).collect() };
    let info = PageInfo {
        page: request.page,
        page_size: request.page_size,
        offset,
        has_more: end < total_rows,
        total_rows,
    };
    (window, info)
}

// ============================================================================
// SECTION: Truncation
// ============================================================================

/// Byte limits applied to one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeLimits {
    /// Maximum bytes of one text value.
    pub max_field_bytes: usize,
    /// Maximum serialized bytes of the page.
    pub max_payload_bytes: usize,
}

/// Page after truncation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapedPage {
    /// Rows, same count as the input.
    pub rows: Vec<Row>,
    /// Columns with a truncated value, in first-seen order.
    pub truncated_fields: Vec<String>,
    /// True when any value was cut at the field limit.
    pub fields_truncated: bool,
    /// True when the payload cap degraded any value.
    pub payload_limit_exceeded: bool,
}

/// Applies field and payload caps to a page.
#[must_use]
pub fn shape_page(rows: Vec<Row>, limits: ShapeLimits) -> ShapedPage {
    let mut shaped = ShapedPage {
        rows: Vec::with_capacity(rows.len()),
        truncated_fields: Vec::new(),
        fields_truncated: false,
        payload_limit_exceeded: false,
    };
    // Opening and closing brackets of the JSON array.
    let mut payload_bytes = 2usize;
    for mut row in rows {
        for (column, value) in &mut row {
            if let Value::String(text) = value
                && text.len() > limits.max_field_bytes
            {
                cut_text(text, limits.max_field_bytes);
                shaped.fields_truncated = true;
                note_field(&mut shaped.truncated_fields, column);
            }
        }
        let separator = usize::from(!shaped.rows.is_empty());
        let row_bytes = serialized_len(&row) + separator;
        if shaped.payload_limit_exceeded || payload_bytes + row_bytes > limits.max_payload_bytes {
            shaped.payload_limit_exceeded = true;
            for (column, value) in &mut row {
                if let Value::String(text) = value
                    && text.as_str() != FIELD_TRUNCATION_MARKER
                {
                    FIELD_TRUNCATION_MARKER.clone_into(text);
                    note_field(&mut shaped.truncated_fields, column);
                }
            }
            payload_bytes = payload_bytes.saturating_add(serialized_len(&row) + separator);
        } else {
            payload_bytes += row_bytes;
        }
        shaped.rows.push(row);
    }
    shaped
}

/// Cuts `text` to at most `max_bytes` on a char boundary and appends the marker.
fn cut_text(text: &mut String, max_bytes: usize) {
    let mut cut = max_bytes.min(text.len());
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push_str(FIELD_TRUNCATION_MARKER);
}

/// Records a truncated column once.
fn note_field(fields: &mut Vec<String>, column: &str) {
    if !fields.iter().any(|field| field == column) {
        fields.push(column.to_string());
    }
}

/// Returns the serialized size of a row.
fn serialized_len(row: &Row) -> usize {
    serde_json::to_vec(row).map_or(0, |bytes| bytes.len())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
