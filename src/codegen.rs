//! Snapshot → runtime bundle.
//!
//! Generation is a pure function of the snapshot: the same snapshot always
//! yields the same bundle, and therefore the same document.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ast::Program;
use crate::error::SnapshotError;
use crate::parser::parse_script;
use crate::project::{Grid, Layer, ProjectSnapshot};

// ── Public types ───────────────────────────────────────────────────────

/// A game object ready to run: position in screen pixels, id and layer
/// always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleObject {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub sprite: usize,
    pub layer: Layer,
}

/// Everything a runtime needs to boot, in the shape the document embeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameBundle {
    pub title: String,
    #[serde(flatten)]
    pub grid: Grid,
    pub colors: Vec<String>,
    pub tile_names: Vec<String>,
    pub tiles: Vec<Vec<i32>>,
    pub object_names: Vec<String>,
    pub objects: Vec<Vec<i32>>,
    pub codes: Vec<String>,
    pub background: Vec<usize>,
    pub game_objects: Vec<BundleObject>,
    /// First serial the runtime tries when it has to invent an object id.
    pub next_serial: u64,
}

const DEFAULT_TITLE: &str = "Untitled Game";

// ── Public API ─────────────────────────────────────────────────────────

/// Validate a snapshot and normalise it into a bundle.
pub fn generate(snapshot: &ProjectSnapshot) -> Result<GameBundle, SnapshotError> {
    snapshot.validate()?;

    let pixel = f64::from(snapshot.grid.pixel_pixels);
    let explicit: HashSet<&str> = snapshot
        .game_objects
        .iter()
        .filter_map(|o| o.id.as_deref())
        .collect();

    let mut serial = 1;
    let game_objects = snapshot
        .game_objects
        .iter()
        .map(|object| {
            let id = match &object.id {
                Some(id) => id.clone(),
                None => {
                    let name = &snapshot.object_names[object.sprite];
                    next_object_id(name, &mut serial, |id| explicit.contains(id))
                }
            };
            BundleObject {
                id,
                x: object.x * pixel,
                y: object.y * pixel,
                sprite: object.sprite,
                layer: object.layer.unwrap_or_default(),
            }
        })
        .collect();

    let title = snapshot
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string();

    Ok(GameBundle {
        title,
        grid: snapshot.grid,
        colors: snapshot.colors.clone(),
        tile_names: snapshot.tile_names.clone(),
        tiles: snapshot.tiles.clone(),
        object_names: snapshot.object_names.clone(),
        objects: snapshot.objects.clone(),
        codes: snapshot.codes.clone(),
        background: snapshot.background.clone(),
        game_objects,
        next_serial: serial,
    })
}

/// Allocate `<sprite>-<n>`, advancing `serial` past ids already taken.
pub fn next_object_id(sprite: &str, serial: &mut u64, in_use: impl Fn(&str) -> bool) -> String {
    loop {
        let id = format!("{sprite}-{serial}");
        *serial += 1;
        if !in_use(&id) {
            return id;
        }
    }
}

/// Parse every script with the Rust front end and report problems.
///
/// These are warnings: the browser's engine accepts a superset of what
/// the embedded interpreter understands.
pub fn lint_scripts(snapshot: &ProjectSnapshot) -> Vec<String> {
    let mut warnings = Vec::new();
    for (name, code) in snapshot.object_names.iter().zip(&snapshot.codes) {
        match parse_script(code) {
            Ok(program) => check_lifecycle(name, &program, &mut warnings),
            Err(e) => warnings.push(format!("script for '{name}': {e}")),
        }
    }

    let used: HashSet<usize> = snapshot.game_objects.iter().map(|o| o.sprite).collect();
    for (index, (name, code)) in snapshot.object_names.iter().zip(&snapshot.codes).enumerate() {
        if !used.contains(&index) && !code.trim().is_empty() {
            warnings.push(format!(
                "script for '{name}' only runs for objects created at runtime; none are placed"
            ));
        }
    }
    warnings
}

fn check_lifecycle(name: &str, program: &Program, warnings: &mut Vec<String>) {
    if program.body.is_empty() {
        return;
    }
    let defined: Vec<&str> = program.function_names().collect();
    if !["awake", "start", "update"].iter().any(|f| defined.contains(f)) {
        warnings.push(format!(
            "script for '{name}' defines none of awake, start or update"
        ));
    }
    for misspelt in defined
        .iter()
        .filter(|f| ["Awake", "Start", "Update", "onUpdate", "onStart"].contains(*f))
    {
        warnings.push(format!(
            "script for '{name}' defines '{misspelt}'; lifecycle functions are lowercase awake/start/update"
        ));
    }
}

// ── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::tests::sample;
    use crate::project::PlacedObject;

    #[test]
    fn positions_become_screen_pixels() {
        let mut snapshot = sample();
        snapshot.game_objects[0].x = 2.0;
        snapshot.game_objects[0].y = 1.0;
        let bundle = generate(&snapshot).unwrap();
        assert_eq!((bundle.game_objects[0].x, bundle.game_objects[0].y), (8.0, 4.0));
        assert_eq!(bundle.game_objects[0].layer, Layer::Main);
    }

    #[test]
    fn ids_are_deterministic_and_skip_explicit_ones() {
        let mut snapshot = sample();
        let placed = |id: Option<&str>| PlacedObject {
            id: id.map(str::to_string),
            x: 0.0,
            y: 0.0,
            sprite: 0,
            layer: Some(Layer::Front),
        };
        snapshot.game_objects = vec![placed(None), placed(Some("player-2")), placed(None)];
        let bundle = generate(&snapshot).unwrap();
        let ids: Vec<_> = bundle.game_objects.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["player-1", "player-2", "player-3"]);
        assert_eq!(bundle.next_serial, 4);
        assert_eq!(generate(&snapshot).unwrap(), bundle);
    }

    #[test]
    fn invalid_snapshot_is_rejected() {
        let mut snapshot = sample();
        snapshot.background.clear();
        assert!(matches!(
            generate(&snapshot),
            Err(SnapshotError::BackgroundSize { .. })
        ));
    }

    #[test]
    fn blank_title_gets_default() {
        let mut snapshot = sample();
        snapshot.title = Some("   ".to_string());
        assert_eq!(generate(&snapshot).unwrap().title, DEFAULT_TITLE);
    }

    #[test]
    fn bundle_json_is_camel_case() {
        let json = serde_json::to_string(&generate(&sample()).unwrap()).unwrap();
        assert!(json.contains("\"mapSize\":2"));
        assert!(json.contains("\"gameObjects\":[{\"id\":\"player-1\""));
        assert!(json.contains("\"layer\":\"main\""));
        assert!(json.contains("\"nextSerial\":2"));
    }

    #[test]
    fn lint_reports_parse_errors_and_missing_hooks() {
        let mut snapshot = sample();
        snapshot.object_names.push("coin".to_string());
        snapshot.objects.push(vec![0; 4]);
        snapshot.codes[0] = "function update() { move('up')".to_string();
        snapshot.codes.push("let value = 1".to_string());
        let warnings = lint_scripts(&snapshot);
        assert_eq!(warnings.len(), 3, "{warnings:?}");
        assert!(warnings[0].starts_with("script for 'player': unexpected end of script"));
        assert!(warnings[1].contains("defines none of"));
        assert!(warnings[2].contains("none are placed"));
    }

    #[test]
    fn lint_accepts_clean_scripts() {
        assert!(lint_scripts(&sample()).is_empty());
    }
}
