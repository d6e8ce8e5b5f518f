//! WASM bindings for the exporter.
//!
//! Lets the browser editor export without a server round trip.
//! Build with: `wasm-pack build --target web --features wasm`

use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Export snapshot JSON to a standalone HTML document.
///
/// Returns the HTML string on success, or throws a JS error on failure.
#[wasm_bindgen]
pub fn export_html(snapshot_json: &str) -> Result<String, JsError> {
    crate::export_html_from_json(snapshot_json).map_err(|e| JsError::new(&e.to_string()))
}

#[derive(Serialize)]
struct Report {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    warnings: Vec<String>,
}

/// Validate snapshot JSON without exporting.
///
/// Returns a JSON string with:
/// - `valid`: boolean
/// - `error`: string (only if invalid)
/// - `warnings`: string[] script lint findings (empty if invalid)
#[wasm_bindgen]
pub fn validate(snapshot_json: &str) -> String {
    let report = match crate::load_snapshot(snapshot_json) {
        Ok(snapshot) => Report {
            valid: true,
            error: None,
            warnings: crate::codegen::lint_scripts(&snapshot),
        },
        Err(e) => Report {
            valid: false,
            error: Some(e.to_string()),
            warnings: Vec::new(),
        },
    };
    serde_json::to_string(&report).unwrap_or_else(|_| r#"{"valid":false}"#.to_string())
}
