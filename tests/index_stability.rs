use gridplay::game::render::DrawList;
use gridplay::game::{Game, RuntimeConfig, TickOutcome};
use gridplay::project::ProjectSnapshot;
use proptest::prelude::*;
use serde_json::json;

const MAP: usize = 64;

/// 1×1 sprites at one screen pixel each, so sprite pixels, tiles and
/// screen pixels coincide.
fn project(sprites: &[(&str, &str)], placed: serde_json::Value) -> ProjectSnapshot {
    let snapshot = json!({
        "mapSize": MAP,
        "spriteSize": 1,
        "pixelPixels": 1,
        "colors": ["#000000", "#ffffff"],
        "tileNames": ["floor"],
        "tiles": [[0]],
        "objectNames": sprites.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
        "objects": sprites.iter().map(|_| vec![1]).collect::<Vec<_>>(),
        "codes": sprites.iter().map(|(_, code)| *code).collect::<Vec<_>>(),
        "background": vec![0; MAP * MAP],
        "gameObjects": placed,
    });
    serde_json::from_value(snapshot).unwrap()
}

fn tick(game: &mut Game, frame: usize) {
    let mut canvas = DrawList::new();
    let outcome = game.tick(frame as f64 * 16.0, &mut canvas);
    assert!(matches!(outcome, TickOutcome::Running), "frame {frame}: {outcome:?}");
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Create(usize),
    Delete(usize),
}

/// Turn "create" / "delete the n-th live mover" choices into concrete ids.
fn resolve(choices: &[Option<usize>]) -> Vec<Op> {
    let mut alive = Vec::new();
    let mut next = 0;
    choices
        .iter()
        .map(|choice| match choice {
            Some(n) if !alive.is_empty() => Op::Delete(alive.remove(n % alive.len())),
            _ => {
                alive.push(next);
                next += 1;
                Op::Create(next - 1)
            }
        })
        .collect()
}

fn driver_script(ops: &[Op]) -> String {
    let ops: Vec<String> = ops
        .iter()
        .map(|op| match op {
            Op::Create(k) => format!("['c', {k}]"),
            Op::Delete(k) => format!("['d', {k}]"),
        })
        .collect();
    format!(
        "const ops = [{}];
         let step = 0;
         function update() {{
           if (step >= ops.length) return;
           const op = ops[step];
           step++;
           if (op[0] === 'c') createObject('mover', 0, op[1], {{ id: 'm' + op[1] }});
           else deleteObject('m' + op[1]);
         }}",
        ops.join(", ")
    )
}

proptest! {
    #[test]
    fn movers_only_ever_move_themselves(
        choices in proptest::collection::vec(proptest::option::of(0..8usize), 1..20)
    ) {
        let ops = resolve(&choices);
        let driver = driver_script(&ops);
        let snapshot = project(
            &[("driver", driver.as_str()), ("mover", "function update() { movePixels(1, 0); }")],
            json!([{ "id": "driver", "x": 0, "y": MAP - 1, "sprite": 0 }]),
        );
        let mut game = gridplay::new_game(&snapshot, RuntimeConfig::default()).unwrap();

        // (id, tick it was created on), in creation order
        let mut alive: Vec<(usize, usize)> = Vec::new();
        for (i, op) in ops.iter().enumerate() {
            let frame = i + 1;
            tick(&mut game, frame);
            match *op {
                Op::Create(k) => alive.push((k, frame)),
                Op::Delete(k) => alive.retain(|&(id, _)| id != k),
            }

            for &(k, created) in &alive {
                let id = format!("m{k}");
                let object = game.object(&id).unwrap();
                prop_assert_eq!(object.y, k as f64, "{} drifted to another row", id);
                prop_assert_eq!(object.x, (frame - created) as f64, "{} missed or stole an update", id);
            }
            let ids: Vec<String> = game.objects().iter().skip(1).map(|o| o.id.clone()).collect();
            let expected: Vec<String> = alive.iter().map(|(k, _)| format!("m{k}")).collect();
            prop_assert_eq!(ids, expected);
        }
    }

    #[test]
    fn key_edges_fire_once_per_hold(held in proptest::collection::vec(any::<bool>(), 1..30)) {
        let watcher = "function update() { addText(isKey('K') + ',' + isKeyDown('k'), 0, 0, { id: 'keys' }); }";
        let snapshot = project(&[("watcher", watcher)], json!([{ "x": 0, "y": 0, "sprite": 0 }]));
        let mut game = gridplay::new_game(&snapshot, RuntimeConfig::default()).unwrap();

        let mut before = false;
        for (i, &down) in held.iter().enumerate() {
            if down {
                game.press_key("k");
            } else {
                game.release_key("k");
            }
            tick(&mut game, i + 1);
            let expected = format!("{},{}", down && !before, down);
            prop_assert_eq!(&game.texts()[0].text, &expected, "frame {}", i + 1);
            before = down;
        }
    }
}
