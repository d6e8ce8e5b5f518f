//! Binds a compiled script to one entity.
//!
//! Every entity gets its own evaluation of its sprite's script. The entity
//! bound capabilities in that scope share a slot cell with the engine; when
//! objects are created or deleted the engine rewrites the cell, so `move()`
//! keeps acting on the same entity while the object array compacts.

use std::cell::Cell;
use std::rc::Rc;

use crate::ast::Program;
use crate::error::Result;
use crate::project::Grid;
use crate::script::{builtins, Host, Interpreter, NativeFn, Scope, Value};

/// Current array position of an entity; `None` once it is deleted.
pub type SlotCell = Rc<Cell<Option<usize>>>;

/// What a script holds on to for an entity: its id and the shared slot.
#[derive(Debug, Clone)]
pub struct EntityRef {
    pub id: Rc<str>,
    pub slot: SlotCell,
}

impl EntityRef {
    pub fn new(id: &str, slot: usize) -> Self {
        Self {
            id: Rc::from(id),
            slot: Rc::new(Cell::new(Some(slot))),
        }
    }

    /// Current slot, or a ReferenceError if the entity has been deleted.
    pub fn resolve(slot: &SlotCell) -> Result<usize> {
        slot.get().ok_or_else(|| {
            crate::error::ScriptError::reference("object has been deleted")
        })
    }
}

macro_rules! capabilities {
    ($($variant:ident => $name:literal, $bound:literal;)*) => {
        /// The fixed capability surface scripts can call.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Capability {
            $($variant,)*
        }

        impl Capability {
            pub const ALL: &'static [Capability] = &[$(Capability::$variant,)*];

            /// Name the capability is bound under in script scope.
            pub fn name(self) -> &'static str {
                match self {
                    $(Capability::$variant => $name,)*
                }
            }

            /// Whether the capability acts on the calling entity.
            pub fn is_entity_bound(self) -> bool {
                match self {
                    $(Capability::$variant => $bound,)*
                }
            }
        }
    };
}

capabilities! {
    Move => "move", true;
    MovePixels => "movePixels", true;
    MoveTiles => "moveTiles", true;
    SetPixelPos => "setPixelPos", true;
    SetTilePos => "setTilePos", true;
    GetPixelPos => "getPixelPos", true;
    GetTilePos => "getTilePos", true;
    GetTile => "getTile", true;
    SetTile => "setTile", true;
    GetLayer => "getLayer", true;
    SetLayer => "setLayer", true;
    GetTileAt => "getTileAt", false;
    SetTileAt => "setTileAt", false;
    Say => "say", false;
    GetObject => "getObject", false;
    CreateObject => "createObject", false;
    DeleteObject => "deleteObject", false;
    AddSound => "addSound", false;
    PlaySound => "playSound", false;
    AddText => "addText", false;
    RemoveText => "removeText", false;
    GetTime => "getTime", false;
    GetDeltaTime => "getDeltaTime", false;
    IsKey => "isKey", false;
    IsKeyDown => "isKeyDown", false;
}

impl Capability {
    /// Entity-bound capability reachable as a method on an entity handle.
    pub fn entity_method(name: &str) -> Option<Capability> {
        Capability::ALL
            .iter()
            .copied()
            .find(|c| c.is_entity_bound() && c.name() == name)
    }
}

/// Scope shared by every script: builtins, grid constants and the global
/// capabilities. Scripts evaluate in a child of it, so they cannot clobber
/// each other's top-level names.
pub fn global_scope(grid: &Grid) -> Rc<Scope> {
    let root = Scope::root();
    builtins::install(&root);
    for (name, value) in [
        ("mapSize", grid.map_size),
        ("mapPixels", grid.map_pixels()),
        ("spriteSize", grid.sprite_size),
        ("spritePixels", grid.sprite_pixels()),
        ("pixelPixels", grid.pixel_pixels),
    ] {
        root.declare_const(name, Value::Number(f64::from(value)));
    }
    for &capability in Capability::ALL.iter().filter(|c| !c.is_entity_bound()) {
        root.declare_const(
            capability.name(),
            Value::native(NativeFn::Capability {
                capability,
                slot: None,
            }),
        );
    }
    root
}

/// One entity's evaluated script: the lifecycle functions it defined.
#[derive(Debug, Clone, Default)]
pub struct ScriptInstance {
    pub awake: Option<Value>,
    pub start: Option<Value>,
    pub update: Option<Value>,
}

impl ScriptInstance {
    /// Evaluate `program` for `entity`, picking up its lifecycle functions.
    pub fn bind(
        program: &Program,
        entity: &EntityRef,
        globals: &Rc<Scope>,
        host: &mut dyn Host,
        depth: usize,
        max_depth: usize,
    ) -> Result<Self> {
        let scope = Scope::child(globals);
        for &capability in Capability::ALL.iter().filter(|c| c.is_entity_bound()) {
            scope.declare_const(
                capability.name(),
                Value::native(NativeFn::Capability {
                    capability,
                    slot: Some(Rc::clone(&entity.slot)),
                }),
            );
        }

        // the script's own declarations live one level down so it may
        // shadow a capability name without tripping over the const binding
        let body = Scope::child(&scope);
        Interpreter::new(host, depth, max_depth).run_program(program, &body)?;

        let hook = |name: &str| body.lookup_local(name).filter(Value::is_callable);
        Ok(Self {
            awake: hook("awake"),
            start: hook("start"),
            update: hook("update"),
        })
    }
}
