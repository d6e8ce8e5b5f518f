//! Embedded interpreter for sprite scripts.
//!
//! Scripts are evaluated once per entity into their own scope; the engine
//! then calls the `awake`, `start` and `update` functions they define.
//! Everything a script can touch outside its own scope goes through the
//! [`Host`] trait.

pub mod builtins;
pub mod interp;
pub mod scope;
pub mod value;

pub use interp::{Host, Interpreter};
pub use scope::Scope;
pub use value::{format_number, Closure, NativeFn, ObjectMap, Value, MAX_ARRAY_LENGTH};
