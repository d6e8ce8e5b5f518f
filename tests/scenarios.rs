use gridplay::game::render::{DrawList, Raster};
use gridplay::game::{Game, GameState, RuntimeConfig, TickOutcome};
use gridplay::project::ProjectSnapshot;
use gridplay::sprite::Color;
use serde_json::{json, Value};

/// A one-tile-type project with 1×1 sprites at 4 screen pixels each.
/// Object sprite `i` is painted with palette colour `i % 2 + 1`.
fn project(map_size: u32, sprites: &[(&str, &str)], placed: Value) -> ProjectSnapshot {
    let cells = map_size as usize * map_size as usize;
    let snapshot = json!({
        "mapSize": map_size,
        "spriteSize": 1,
        "pixelPixels": 4,
        "colors": ["#ffffff", "#ff0000", "#0000ff"],
        "tileNames": ["grass"],
        "tiles": [[0]],
        "objectNames": sprites.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
        "objects": (0..sprites.len()).map(|i| vec![i % 2 + 1]).collect::<Vec<_>>(),
        "codes": sprites.iter().map(|(_, code)| *code).collect::<Vec<_>>(),
        "background": vec![0; cells],
        "gameObjects": placed,
    });
    serde_json::from_value(snapshot).expect("test snapshot should deserialize")
}

fn start(snapshot: &ProjectSnapshot) -> Game {
    gridplay::new_game(snapshot, RuntimeConfig::default()).expect("test snapshot should be valid")
}

fn tile_x(game: &Game, id: &str) -> f64 {
    let object = game.object(id).unwrap_or_else(|| panic!("no object {id}"));
    object.x / f64::from(game.grid().sprite_pixels())
}

#[test]
fn player_walks_right_until_the_edge() {
    let snapshot = project(
        2,
        &[("player", "function update(){ move('right'); }")],
        json!([{ "x": 0, "y": 0, "sprite": 0 }]),
    );
    let mut game = start(&snapshot);
    let mut canvas = DrawList::new();

    game.tick(16.0, &mut canvas);
    assert_eq!(tile_x(&game, "player-1"), 1.0);
    game.tick(32.0, &mut canvas);
    assert_eq!(tile_x(&game, "player-1"), 1.0);
    assert_eq!(game.object("player-1").map(|o| o.y), Some(0.0));
    assert_eq!(game.state(), GameState::Running);
}

#[test]
fn key_press_dismisses_dialogue() {
    let snapshot = project(
        2,
        &[("sign", r#"function start(){ say("hello"); }"#)],
        json!([{ "x": 0, "y": 0, "sprite": 0 }]),
    );
    let mut game = start(&snapshot);
    let mut canvas = DrawList::new();

    game.tick(16.0, &mut canvas);
    assert_eq!(game.dialogue(), Some("hello"));
    assert!(canvas.texts().any(|t| t == "hello"));

    game.press_key("Enter");
    assert_eq!(game.dialogue(), None);
    canvas.clear();
    game.tick(32.0, &mut canvas);
    assert!(!canvas.texts().any(|t| t == "hello"));
}

#[test]
fn create_then_delete_in_one_tick_leaves_no_trace() {
    let spawner = "
        let done = false;
        function update() {
            if (done) return;
            done = true;
            const enemy = createObject('enemy', 1, 1);
            deleteObject(enemy.id);
        }
    ";
    let snapshot = project(
        3,
        &[("spawner", spawner), ("enemy", "function update(){ move('down'); }")],
        json!([{ "x": 0, "y": 0, "sprite": 0 }]),
    );
    let mut game = start(&snapshot);
    let mut canvas = DrawList::new();

    assert!(matches!(game.tick(16.0, &mut canvas), TickOutcome::Running));
    assert_eq!(game.objects().len(), 1);
    assert!(matches!(game.tick(32.0, &mut canvas), TickOutcome::Running));
    assert_eq!(game.objects().len(), 1);
    assert!(game.fault().is_none());
}

#[test]
fn front_layer_is_visible_over_back() {
    let snapshot = project(
        2,
        &[("a", ""), ("b", "")],
        json!([
            { "id": "a", "x": 0, "y": 0, "sprite": 0, "layer": "front" },
            { "id": "b", "x": 0, "y": 0, "sprite": 1, "layer": "back" },
        ]),
    );
    let game = start(&snapshot);
    let mut raster = Raster::for_grid(game.grid());
    game.render(&mut raster);

    assert_eq!(raster.pixel(0, 0), Color::parse("#ff0000"));
    assert_eq!(raster.pixel(3, 3), Color::parse("#ff0000"));
    // the background is white grass
    assert_eq!(raster.pixel(4, 0), Color::parse("#ffffff"));
}

#[test]
fn fault_stops_every_update_and_render() {
    let thrower = "let n = 0; function update(){ n++; if (n == 2) throw 'boom'; }";
    let snapshot = project(
        8,
        &[("thrower", thrower), ("walker", "function update(){ move('right'); }")],
        json!([
            { "id": "t", "x": 0, "y": 0, "sprite": 0 },
            { "id": "w", "x": 0, "y": 1, "sprite": 1 },
        ]),
    );
    let mut game = start(&snapshot);
    let mut canvas = DrawList::new();

    assert!(matches!(game.tick(16.0, &mut canvas), TickOutcome::Running));
    assert_eq!(tile_x(&game, "w"), 1.0);

    canvas.clear();
    let TickOutcome::Faulted(fault) = game.tick(32.0, &mut canvas) else {
        panic!("second update should fault");
    };
    assert_eq!(fault.entity, "t");
    assert_eq!(fault.to_string(), "Uncaught boom\n    in update of 't'");
    assert!(canvas.texts().any(|t| t == "Uncaught boom"));
    assert_eq!(tile_x(&game, "w"), 1.0);

    canvas.clear();
    assert!(matches!(game.tick(48.0, &mut canvas), TickOutcome::Halted));
    assert!(canvas.commands.is_empty());
    assert_eq!(tile_x(&game, "w"), 1.0);
    assert_eq!(game.state(), GameState::Faulted);
}

#[test]
fn same_input_replays_the_same_frames() {
    let wanderer = "
        function update() {
            if (isKey('d')) moveTiles(1, 0);
            if (Math.random() < 0.5) movePixels(0, 1); else movePixels(0, -1);
            addText(getTilePos().x, 0, 0, { id: 'x' });
        }
    ";
    let snapshot = project(
        6,
        &[("wanderer", wanderer)],
        json!([{ "x": 2, "y": 2, "sprite": 0 }]),
    );

    let run = || {
        let mut game = start(&snapshot);
        let mut frames = Vec::new();
        for frame in 1..=20u32 {
            if frame % 5 == 0 {
                game.press_key("d");
            }
            let mut canvas = DrawList::new();
            game.tick(f64::from(frame) * 16.0, &mut canvas);
            game.release_key("d");
            frames.push(canvas);
        }
        frames
    };
    assert_eq!(run(), run());
}
