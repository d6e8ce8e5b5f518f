//! Full-page HTML document: a canvas sized to the map, the game bundle as
//! an inline JSON literal, and the engine that boots it on load.

use crate::codegen::GameBundle;

use super::engine::ENGINE_JS;
use super::helpers::{html_escape, script_json};

/// Wrap a generated bundle in a self-contained HTML document.
///
/// The output depends only on the bundle, so the same project always
/// exports to the same bytes.
pub fn wrap_html(bundle: &GameBundle) -> serde_json::Result<String> {
    let title = html_escape(&bundle.title);
    let size = bundle.grid.map_pixels();
    let payload = script_json(bundle)?;

    Ok(format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
  * {{ margin: 0; padding: 0; box-sizing: border-box; }}
  body {{
    min-height: 100vh;
    display: flex;
    flex-direction: column;
    align-items: center;
    justify-content: center;
    background: #222;
  }}
  canvas {{
    display: block;
    image-rendering: pixelated;
    background: #fff;
  }}
  pre.error {{
    max-width: {size}px;
    margin-top: 12px;
    color: #f66;
    font: 12px monospace;
    white-space: pre-wrap;
  }}
</style>
</head>
<body>
<canvas id="game" width="{size}" height="{size}"></canvas>
<script>
const GAME = {payload};
{ENGINE_JS}
window.addEventListener('load', () => Gridplay.boot(GAME, document.getElementById('game')));
</script>
</body>
</html>
"##
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::generate;
    use crate::project::tests::sample;

    fn document() -> String {
        let bundle = generate(&sample()).unwrap();
        wrap_html(&bundle).unwrap()
    }

    #[test]
    fn canvas_matches_map_pixels() {
        let html = document();
        // 2 tiles of 2 cells at 4 px
        assert!(html.contains(r#"<canvas id="game" width="16" height="16">"#));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert_eq!(html.matches("</script>").count(), 1);
    }

    #[test]
    fn payload_is_the_bundle() {
        let html = document();
        let start = html.find("const GAME = ").unwrap() + "const GAME = ".len();
        let end = start + html[start..].find(";\n").unwrap();
        let value: serde_json::Value = serde_json::from_str(&html[start..end]).unwrap();
        assert_eq!(value["mapSize"], 2);
        assert_eq!(value["gameObjects"][0]["id"], "player-1");
        assert_eq!(value["nextSerial"], 2);
    }

    #[test]
    fn browser_range_limit_matches_interpreter() {
        let html = document();
        let limit = format!("const MAX_ARRAY_LENGTH = {};", crate::script::MAX_ARRAY_LENGTH);
        assert!(html.contains(&limit));
        assert!(html.contains("!Number.isInteger(n) || n < 0 || n > MAX_ARRAY_LENGTH"));
    }

    #[test]
    fn title_is_escaped() {
        let mut snapshot = sample();
        snapshot.title = Some("<Dungeon & Co>".into());
        let html = wrap_html(&generate(&snapshot).unwrap()).unwrap();
        assert!(html.contains("<title>&lt;Dungeon &amp; Co&gt;</title>"));
    }
}
