pub mod ast;
pub mod codegen;
pub mod error;
pub mod game;
pub mod lexer;
pub mod parser;
pub mod project;
pub mod runtime;
pub mod script;
pub mod sprite;
pub mod token;

#[cfg(feature = "wasm")]
pub mod wasm;

use error::{ExportError, SnapshotError};
use project::ProjectSnapshot;

/// Parse and validate a project snapshot from its JSON form.
pub fn load_snapshot(json: &str) -> Result<ProjectSnapshot, ExportError> {
    let snapshot = ProjectSnapshot::from_json(json)?;
    snapshot.validate()?;
    Ok(snapshot)
}

/// Export a project snapshot as a standalone HTML document.
pub fn export_html(snapshot: &ProjectSnapshot) -> Result<String, ExportError> {
    let bundle = codegen::generate(snapshot)?;
    Ok(runtime::wrap_html(&bundle)?)
}

/// Export straight from snapshot JSON, as the editor hands it over.
pub fn export_html_from_json(json: &str) -> Result<String, ExportError> {
    export_html(&load_snapshot(json)?)
}

/// Build a playable game from a snapshot without going through HTML.
pub fn new_game(
    snapshot: &ProjectSnapshot,
    config: game::RuntimeConfig,
) -> Result<game::Game, SnapshotError> {
    let bundle = codegen::generate(snapshot)?;
    game::Game::new(&bundle, config)
}
