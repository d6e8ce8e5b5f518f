//! The game runtime.
//!
//! [`Game`] is the single state object of one running game. It owns the
//! entity model, the per-entity script instances, input, texts, dialogue
//! and sounds; scripts reach all of it only through the capability calls
//! dispatched in its [`Host`] implementation. Everything runs on the
//! caller's thread, one [`Game::tick`] per display frame.

pub mod binding;
pub mod input;
pub mod render;
pub mod world;

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::ast::Program;
use crate::codegen::{next_object_id, GameBundle};
use crate::error::{Result, ScriptError, SnapshotError, SyntaxError};
use crate::parser::parse_script;
use crate::project::{Grid, Layer};
use crate::script::{Host, Interpreter, Scope, Value};
use crate::sprite::{Color, NameTable, Palette, Sprite, SpriteSheet};

use self::binding::{Capability, EntityRef, ScriptInstance, SlotCell};
use self::input::Input;
use self::render::{render_error, render_frame, Canvas, Frame};
use self::world::{GameObject, World};

/// Runtime knobs that do not come from the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Seed for `Math.random`.
    pub seed: u64,
    /// Deepest script call nesting before a RangeError.
    pub max_call_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_call_depth: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    /// Built, `boot` not yet run.
    Ready,
    Running,
    /// A script failed; the game is frozen.
    Faulted,
}

/// Lifecycle phase a script failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Evaluating the script text itself.
    Load,
    Awake,
    Start,
    Update,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Load => "load",
            Phase::Awake => "awake",
            Phase::Start => "start",
            Phase::Update => "update",
        })
    }
}

/// A script failure that stopped the game.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{error}\n    in {phase} of '{entity}'")]
pub struct ScriptFault {
    pub phase: Phase,
    pub entity: String,
    pub error: ScriptError,
}

#[derive(Debug, Clone)]
pub enum TickOutcome {
    Running,
    /// This tick's updates failed; the error surface was drawn.
    Faulted(ScriptFault),
    /// The game had already stopped; nothing ran.
    Halted,
}

/// A floating text entry. Coordinates are sprite pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEntry {
    pub id: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub size: f64,
}

const DEFAULT_TEXT_COLOR: &str = "black";
const DEFAULT_TEXT_SIZE: f64 = 16.0;

/// An entity's handle and, once evaluated, its script.
struct Live {
    entity: EntityRef,
    script: Option<ScriptInstance>,
}

pub struct Game {
    config: RuntimeConfig,
    world: World,
    sheet: SpriteSheet,
    /// Parsed script per object sprite; syntax errors surface when an
    /// entity of that sprite is loaded.
    programs: Vec<std::result::Result<Rc<Program>, SyntaxError>>,
    globals: Rc<Scope>,
    /// Parallel to the world's object array.
    live: Vec<Live>,
    input: Input,
    texts: Vec<TextEntry>,
    text_serial: u64,
    dialogue: Option<String>,
    sounds: BTreeMap<String, String>,
    played: Vec<String>,
    time: f64,
    delta_time: f64,
    next_serial: u64,
    rng: StdRng,
    state: GameState,
    fault: Option<ScriptFault>,
}

impl Game {
    pub fn new(bundle: &GameBundle, config: RuntimeConfig) -> std::result::Result<Self, SnapshotError> {
        bundle.grid.check()?;
        if bundle.background.len() != bundle.grid.map_cells() {
            return Err(SnapshotError::BackgroundSize {
                len: bundle.background.len(),
                expected: bundle.grid.map_cells(),
            });
        }
        let colors = bundle
            .colors
            .iter()
            .enumerate()
            .map(|(index, value)| {
                Color::parse(value).ok_or_else(|| SnapshotError::BadColor {
                    index,
                    value: value.clone(),
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let sheet = SpriteSheet {
            palette: Palette::new(colors),
            tiles: bundle.tiles.iter().cloned().map(Sprite::new).collect(),
            objects: bundle.objects.iter().cloned().map(Sprite::new).collect(),
        };

        let programs = bundle
            .object_names
            .iter()
            .zip(&bundle.codes)
            .map(|(name, code)| {
                parse_script(code).map(Rc::new).map_err(|e| {
                    debug!(sprite = %name, error = %e, "script does not parse");
                    e
                })
            })
            .collect();

        let objects: Vec<GameObject> = bundle
            .game_objects
            .iter()
            .map(|o| GameObject {
                id: o.id.clone(),
                x: o.x,
                y: o.y,
                sprite: o.sprite,
                layer: o.layer,
            })
            .collect();
        let live = objects
            .iter()
            .enumerate()
            .map(|(slot, o)| Live {
                entity: EntityRef::new(&o.id, slot),
                script: None,
            })
            .collect();

        let world = World::new(
            bundle.grid,
            objects,
            bundle.background.clone(),
            NameTable::new(bundle.tile_names.clone()),
            NameTable::new(bundle.object_names.clone()),
        );

        Ok(Self {
            config,
            world,
            sheet,
            programs,
            globals: binding::global_scope(&bundle.grid),
            live,
            input: Input::default(),
            texts: Vec::new(),
            text_serial: 1,
            dialogue: None,
            sounds: BTreeMap::new(),
            played: Vec::new(),
            time: 0.0,
            delta_time: 0.0,
            next_serial: bundle.next_serial,
            rng: StdRng::seed_from_u64(config.seed),
            state: GameState::Ready,
            fault: None,
        })
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Evaluate every initial script, then run all `awake`s, then all
    /// `start`s, each in placement order.
    pub fn boot(&mut self) -> std::result::Result<(), ScriptFault> {
        match self.state {
            GameState::Running => return Ok(()),
            GameState::Faulted => return Err(self.fault.clone().unwrap_or_else(halted_fault)),
            GameState::Ready => {}
        }

        let initial: Vec<EntityRef> = self.live.iter().map(|l| l.entity.clone()).collect();
        for entity in &initial {
            if entity.slot.get().is_none() {
                continue;
            }
            self.load(entity, 0).map_err(|e| self.record_fault(Phase::Load, entity, e))?;
        }
        for phase in [Phase::Awake, Phase::Start] {
            for entity in &initial {
                let Some(hook) = self.hook(entity, phase) else {
                    continue;
                };
                self.run_hook(&hook)
                    .map_err(|e| self.record_fault(phase, entity, e))?;
            }
        }

        self.state = GameState::Running;
        info!(objects = self.world.len(), "game booted");
        Ok(())
    }

    /// Advance one frame: timing, updates, render, key snapshot.
    ///
    /// Entities created during this tick get their first update next
    /// tick; entities deleted during it are skipped.
    pub fn tick(&mut self, timestamp: f64, canvas: &mut dyn Canvas) -> TickOutcome {
        match self.state {
            GameState::Faulted => return TickOutcome::Halted,
            GameState::Ready => {
                if let Err(fault) = self.boot() {
                    render_error(self.world.grid(), &fault.to_string(), canvas);
                    return TickOutcome::Faulted(fault);
                }
            }
            GameState::Running => {}
        }

        self.delta_time = (timestamp - self.time).max(0.0);
        self.time = timestamp;

        let updates: Vec<(EntityRef, Value)> = self
            .live
            .iter()
            .filter_map(|l| {
                let update = l.script.as_ref()?.update.clone()?;
                Some((l.entity.clone(), update))
            })
            .collect();
        for (entity, update) in &updates {
            if entity.slot.get().is_none() {
                continue;
            }
            if let Err(e) = self.run_hook(update) {
                let fault = self.record_fault(Phase::Update, entity, e);
                render_error(self.world.grid(), &fault.to_string(), canvas);
                return TickOutcome::Faulted(fault);
            }
        }

        self.render(canvas);
        self.input.end_frame();
        TickOutcome::Running
    }

    /// Paint the current state without advancing it.
    pub fn render(&self, canvas: &mut dyn Canvas) {
        if let Some(fault) = &self.fault {
            render_error(self.world.grid(), &fault.to_string(), canvas);
            return;
        }
        render_frame(&self.frame(), canvas);
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            grid: self.world.grid(),
            sheet: &self.sheet,
            background: self.world.background(),
            objects: self.world.objects(),
            texts: &self.texts,
            dialogue: self.dialogue.as_deref(),
        }
    }

    fn record_fault(&mut self, phase: Phase, entity: &EntityRef, error: ScriptError) -> ScriptFault {
        let fault = ScriptFault {
            phase,
            entity: entity.id.to_string(),
            error,
        };
        warn!(phase = %phase, entity = %fault.entity, error = %fault.error, "script fault, game halted");
        self.state = GameState::Faulted;
        self.fault = Some(fault.clone());
        fault
    }

    /// Evaluate the script for `entity` and store its lifecycle functions.
    fn load(&mut self, entity: &EntityRef, depth: usize) -> Result<()> {
        let slot = EntityRef::resolve(&entity.slot)?;
        let sprite = self.world.get(slot).map(|o| o.sprite);
        let program = match sprite.and_then(|s| self.programs.get(s)) {
            Some(Ok(program)) => Rc::clone(program),
            Some(Err(e)) => return Err(e.clone().into()),
            None => return Ok(()),
        };
        let globals = Rc::clone(&self.globals);
        let max_depth = self.config.max_call_depth;
        let script = ScriptInstance::bind(&program, entity, &globals, self, depth, max_depth)?;
        // the script may have deleted its own entity while loading
        if let Some(slot) = entity.slot.get() {
            self.live[slot].script = Some(script);
        }
        Ok(())
    }

    fn hook(&self, entity: &EntityRef, phase: Phase) -> Option<Value> {
        let script = self.live.get(entity.slot.get()?)?.script.as_ref()?;
        match phase {
            Phase::Awake => script.awake.clone(),
            Phase::Start => script.start.clone(),
            Phase::Update => script.update.clone(),
            Phase::Load => None,
        }
    }

    fn run_hook(&mut self, hook: &Value) -> Result<()> {
        self.run_hook_at(hook, 0)
    }

    fn run_hook_at(&mut self, hook: &Value, depth: usize) -> Result<()> {
        let max_depth = self.config.max_call_depth;
        Interpreter::new(self, depth, max_depth).call(hook, Vec::new())?;
        Ok(())
    }

    // ── Host input ─────────────────────────────────────────────────────

    pub fn press_key(&mut self, key: &str) {
        self.input.press(key);
        self.dialogue = None;
    }

    pub fn release_key(&mut self, key: &str) {
        self.input.release(key);
    }

    pub fn click(&mut self) {
        self.dialogue = None;
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn fault(&self) -> Option<&ScriptFault> {
        self.fault.as_ref()
    }

    pub fn grid(&self) -> &Grid {
        self.world.grid()
    }

    pub fn objects(&self) -> &[GameObject] {
        self.world.objects()
    }

    pub fn object(&self, id: &str) -> Option<&GameObject> {
        self.world.slot_of(id).and_then(|slot| self.world.get(slot))
    }

    pub fn background(&self) -> &[usize] {
        self.world.background()
    }

    pub fn dialogue(&self) -> Option<&str> {
        self.dialogue.as_deref()
    }

    pub fn texts(&self) -> &[TextEntry] {
        &self.texts
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }

    /// URL registered for a sound.
    pub fn sound_url(&self, name: &str) -> Option<&str> {
        self.sounds.get(name).map(String::as_str)
    }

    /// Sounds played since the last drain, oldest first.
    pub fn drain_sounds(&mut self) -> Vec<String> {
        std::mem::take(&mut self.played)
    }

    // ── Capabilities ───────────────────────────────────────────────────

    fn move_to(&mut self, slot: usize, x: f64, y: f64) {
        if !self.world.fits(x, y) {
            return;
        }
        if let Some(object) = self.world.get_mut(slot) {
            object.x = x;
            object.y = y;
        }
    }

    fn position(&self, slot: usize) -> Result<(f64, f64)> {
        self.world
            .get(slot)
            .map(|o| (o.x, o.y))
            .ok_or_else(|| ScriptError::reference("object has been deleted"))
    }

    fn tile_pos(&self, slot: usize) -> Result<(f64, f64)> {
        let (x, y) = self.position(slot)?;
        let unit = f64::from(self.world.grid().sprite_pixels());
        Ok(((x / unit).floor(), (y / unit).floor()))
    }

    fn tile_named(&self, name: &str) -> Result<usize> {
        self.world
            .tile_index(name)
            .ok_or_else(|| ScriptError::reference(format!("{name} is not a valid tile")))
    }

    fn create_object(&mut self, args: &Args, depth: usize) -> Result<Value> {
        let name = args.string(0);
        let sprite = self
            .world
            .object_sprite(&name)
            .ok_or_else(|| ScriptError::reference(format!("No sprite found with name {name}")))?;
        let options = args.get(3);
        let id = match option(&options, "id") {
            Value::Undefined | Value::Null => {
                let world = &self.world;
                next_object_id(&name, &mut self.next_serial, |id| world.contains_id(id))
            }
            value => {
                let id = non_empty_string(&value, "id")?;
                if self.world.contains_id(&id) {
                    return Err(ScriptError::type_error(format!("object id {id} is already in use")));
                }
                id
            }
        };
        let layer = match option(&options, "layer") {
            Value::Undefined | Value::Null => Layer::Main,
            value => parse_layer(&value)?,
        };

        let pixel = f64::from(self.world.grid().pixel_pixels);
        let slot = self.world.insert(GameObject {
            id: id.clone(),
            x: args.number(1) * pixel,
            y: args.number(2) * pixel,
            sprite,
            layer,
        });
        let entity = EntityRef::new(&id, slot);
        self.live.push(Live {
            entity: entity.clone(),
            script: None,
        });
        debug!(id = %id, sprite = %name, slot, "object created");

        self.load(&entity, depth)?;
        if let Some(start) = self.hook(&entity, Phase::Start) {
            self.run_hook_at(&start, depth)?;
        }
        Ok(Value::Entity(entity))
    }

    fn delete_object(&mut self, id: &str) -> Result<()> {
        let (slot, _) = self
            .world
            .remove(id)
            .ok_or_else(|| ScriptError::reference(format!("No object found with ID {id}")))?;
        let removed = self.live.remove(slot);
        removed.entity.slot.set(None);
        for (index, live) in self.live.iter().enumerate().skip(slot) {
            live.entity.slot.set(Some(index));
        }
        debug!(id, slot, "object deleted");
        Ok(())
    }

    fn add_text(&mut self, args: &Args) -> Result<Value> {
        let options = args.get(3);
        let id = match option(&options, "id") {
            Value::Undefined | Value::Null => loop {
                let id = format!("text-{}", self.text_serial);
                self.text_serial += 1;
                if !self.texts.iter().any(|t| t.id == id) {
                    break id;
                }
            },
            value => value.to_string(),
        };
        let color = match option(&options, "color") {
            Value::Undefined | Value::Null => DEFAULT_TEXT_COLOR.to_string(),
            value => value.to_string(),
        };
        let size = match option(&options, "size") {
            Value::Undefined | Value::Null => DEFAULT_TEXT_SIZE,
            value => value.to_number(),
        };
        let entry = TextEntry {
            id,
            text: args.get(0).to_string(),
            x: args.number(1),
            y: args.number(2),
            color,
            size,
        };
        let value = Value::object([
            ("id".to_string(), Value::from(entry.id.as_str())),
            ("text".to_string(), Value::from(entry.text.as_str())),
            ("x".to_string(), Value::Number(entry.x)),
            ("y".to_string(), Value::Number(entry.y)),
            ("color".to_string(), Value::from(entry.color.as_str())),
            ("size".to_string(), Value::Number(entry.size)),
        ]);
        // re-adding an id replaces the entry in place
        match self.texts.iter_mut().find(|t| t.id == entry.id) {
            Some(existing) => *existing = entry,
            None => self.texts.push(entry),
        }
        Ok(value)
    }
}

impl Host for Game {
    fn call_capability(
        &mut self,
        capability: Capability,
        slot: Option<&SlotCell>,
        args: Vec<Value>,
        depth: usize,
    ) -> Result<Value> {
        let args = Args(args);
        let this = match slot {
            Some(cell) => Some(EntityRef::resolve(cell)?),
            None if capability.is_entity_bound() => {
                return Err(ScriptError::type_error(format!(
                    "{} must be called on an object",
                    capability.name()
                )))
            }
            None => None,
        };
        let this = || this.ok_or_else(|| ScriptError::type_error("missing object"));
        let pixel = f64::from(self.world.grid().pixel_pixels);
        let tile = f64::from(self.world.grid().sprite_pixels());

        match capability {
            Capability::Move => {
                let slot = this()?;
                let dir = args.get(0);
                let (dx, dy) = match dir.as_str() {
                    Some("up") => (0.0, -tile),
                    Some("down") => (0.0, tile),
                    Some("left") => (-tile, 0.0),
                    Some("right") => (tile, 0.0),
                    _ => return Err(ScriptError::type_error(format!("Invalid direction {dir}"))),
                };
                let (x, y) = self.position(slot)?;
                self.move_to(slot, x + dx, y + dy);
                Ok(Value::Undefined)
            }
            Capability::MovePixels | Capability::MoveTiles => {
                let slot = this()?;
                let unit = if capability == Capability::MovePixels { pixel } else { tile };
                let (x, y) = self.position(slot)?;
                self.move_to(slot, x + args.number(0) * unit, y + args.number(1) * unit);
                Ok(Value::Undefined)
            }
            Capability::SetPixelPos | Capability::SetTilePos => {
                let slot = this()?;
                let unit = if capability == Capability::SetPixelPos { pixel } else { tile };
                self.move_to(slot, args.number(0) * unit, args.number(1) * unit);
                Ok(Value::Undefined)
            }
            Capability::GetPixelPos => {
                let (x, y) = self.position(this()?)?;
                Ok(point((x / pixel).floor(), (y / pixel).floor()))
            }
            Capability::GetTilePos => {
                let (x, y) = self.tile_pos(this()?)?;
                Ok(point(x, y))
            }
            Capability::GetTile => {
                let (x, y) = self.tile_pos(this()?)?;
                Ok(Value::from(self.world.tile_at(x, y)))
            }
            Capability::SetTile => {
                let (x, y) = self.tile_pos(this()?)?;
                let tile = self.tile_named(&args.string(0))?;
                self.world.set_tile_at(x, y, tile);
                Ok(Value::Undefined)
            }
            Capability::GetLayer => {
                let slot = this()?;
                let layer = self.world.get(slot).map(|o| o.layer).unwrap_or_default();
                Ok(Value::from(layer.as_str()))
            }
            Capability::SetLayer => {
                let slot = this()?;
                let layer = parse_layer(&args.get(0))?;
                if let Some(object) = self.world.get_mut(slot) {
                    object.layer = layer;
                }
                Ok(Value::Undefined)
            }
            Capability::GetTileAt => Ok(Value::from(
                self.world.tile_at(args.number(0), args.number(1)),
            )),
            Capability::SetTileAt => {
                let (x, y) = (args.number(0), args.number(1));
                let tile = self.tile_named(&args.string(2))?;
                if !self.world.set_tile_at(x, y, tile) {
                    return Err(ScriptError::range(format!(
                        "tile ({}, {}) is outside the map",
                        args.get(0),
                        args.get(1)
                    )));
                }
                Ok(Value::Undefined)
            }
            Capability::Say => {
                self.dialogue = Some(args.get(0).to_string());
                Ok(Value::Undefined)
            }
            Capability::GetObject => {
                let id = non_empty_string(&args.get(0), "id")?;
                Ok(match self.world.slot_of(&id) {
                    Some(slot) => Value::Entity(self.live[slot].entity.clone()),
                    None => Value::Null,
                })
            }
            Capability::CreateObject => self.create_object(&args, depth),
            Capability::DeleteObject => {
                let id = non_empty_string(&args.get(0), "id")?;
                self.delete_object(&id)?;
                Ok(Value::Undefined)
            }
            Capability::AddSound => {
                self.sounds.insert(args.string(0), args.string(1));
                Ok(Value::Undefined)
            }
            Capability::PlaySound => {
                let name = args.string(0);
                if !self.sounds.contains_key(&name) {
                    return Err(ScriptError::reference(format!("No sound found with name {name}")));
                }
                self.played.push(name);
                Ok(Value::Undefined)
            }
            Capability::AddText => self.add_text(&args),
            Capability::RemoveText => {
                let id = args.string(0);
                let index = self
                    .texts
                    .iter()
                    .position(|t| t.id == id)
                    .ok_or_else(|| ScriptError::reference(format!("No text found with ID {id}")))?;
                self.texts.remove(index);
                Ok(Value::Undefined)
            }
            Capability::GetTime => Ok(Value::Number(self.time)),
            Capability::GetDeltaTime => Ok(Value::Number(self.delta_time)),
            Capability::IsKey => {
                let key = non_empty_string(&args.get(0), "key")?;
                Ok(Value::Bool(self.input.is_pressed(&key)))
            }
            Capability::IsKeyDown => {
                let key = non_empty_string(&args.get(0), "key")?;
                Ok(Value::Bool(self.input.is_down(&key)))
            }
        }
    }

    fn random(&mut self) -> f64 {
        self.rng.gen()
    }
}

/// Positional capability arguments; missing ones read as `undefined`.
struct Args(Vec<Value>);

impl Args {
    fn get(&self, i: usize) -> Value {
        self.0.get(i).cloned().unwrap_or(Value::Undefined)
    }

    fn number(&self, i: usize) -> f64 {
        self.get(i).to_number()
    }

    fn string(&self, i: usize) -> String {
        self.get(i).to_string()
    }
}

fn option(options: &Value, key: &str) -> Value {
    match options {
        Value::Object(map) => map.borrow().get(key).cloned().unwrap_or(Value::Undefined),
        _ => Value::Undefined,
    }
}

fn non_empty_string(value: &Value, what: &str) -> Result<String> {
    match value.as_str() {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(ScriptError::type_error(format!("Invalid {what} {value}"))),
    }
}

fn parse_layer(value: &Value) -> Result<Layer> {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ScriptError::type_error(format!("Invalid layer {value}")))
}

fn point(x: f64, y: f64) -> Value {
    Value::object([("x".to_string(), Value::Number(x)), ("y".to_string(), Value::Number(y))])
}

fn halted_fault() -> ScriptFault {
    ScriptFault {
        phase: Phase::Load,
        entity: String::new(),
        error: ScriptError::type_error("game has halted"),
    }
}
