use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::ScriptError;

use super::value::Value;

#[derive(Debug)]
struct Binding {
    value: Value,
    mutable: bool,
}

/// One lexical scope. Scopes form a parent chain; closures keep their
/// defining scope alive through an `Rc`.
#[derive(Debug, Default)]
pub struct Scope {
    vars: RefCell<HashMap<String, Binding>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn root() -> Rc<Scope> {
        Rc::new(Scope::default())
    }

    pub fn child(parent: &Rc<Scope>) -> Rc<Scope> {
        Rc::new(Scope {
            vars: RefCell::default(),
            parent: Some(Rc::clone(parent)),
        })
    }

    /// Bind `name` in this scope, shadowing outer bindings.
    pub fn declare(&self, name: &str, value: Value, mutable: bool) {
        self.vars
            .borrow_mut()
            .insert(name.to_string(), Binding { value, mutable });
    }

    /// Bind a read-only value.
    pub fn declare_const(&self, name: &str, value: Value) {
        self.declare(name, value, false);
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.vars.borrow().get(name) {
            return Some(binding.value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Value bound directly in this scope, ignoring parents.
    pub fn lookup_local(&self, name: &str) -> Option<Value> {
        self.vars.borrow().get(name).map(|b| b.value.clone())
    }

    pub fn assign(&self, name: &str, value: Value) -> Result<(), ScriptError> {
        if let Some(binding) = self.vars.borrow_mut().get_mut(name) {
            if !binding.mutable {
                return Err(ScriptError::type_error("Assignment to constant variable."));
            }
            binding.value = value;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(ScriptError::reference(format!("{name} is not defined"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_shadows_and_assigns_through() {
        let root = Scope::root();
        root.declare("a", Value::from(1.0), true);
        let child = Scope::child(&root);
        child.declare("b", Value::from(2.0), true);

        child.assign("a", Value::from(5.0)).unwrap();
        assert_eq!(root.lookup("a").unwrap().to_number(), 5.0);
        assert!(root.lookup("b").is_none());
    }

    #[test]
    fn constants_reject_assignment() {
        let root = Scope::root();
        root.declare_const("mapSize", Value::from(8.0));
        let err = root.assign("mapSize", Value::from(1.0)).unwrap_err();
        assert!(matches!(err, ScriptError::Type(_)));
    }

    #[test]
    fn undeclared_assignment_is_reference_error() {
        let root = Scope::root();
        let err = root.assign("ghost", Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "ReferenceError: ghost is not defined");
    }
}
