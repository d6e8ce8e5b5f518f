use std::rc::Rc;

use crate::ast::*;
use crate::error::{Result, ScriptError};
use crate::game::binding::{Capability, SlotCell};

use super::builtins::{self, Method};
use super::scope::Scope;
use super::value::{Closure, NativeFn, Value, MAX_ARRAY_LENGTH};

/// The engine side of the capability surface.
///
/// The interpreter knows nothing about entities or the map; every capability
/// call is forwarded here together with the slot cell of the entity it is
/// bound to. `depth` is the current call depth so that hosts which run more
/// script code (e.g. `createObject` calling `start`) keep the limit intact.
pub trait Host {
    fn call_capability(
        &mut self,
        capability: Capability,
        slot: Option<&SlotCell>,
        args: Vec<Value>,
        depth: usize,
    ) -> Result<Value>;

    /// Source for `Math.random`.
    fn random(&mut self) -> f64;
}

/// How a statement finished.
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Where an assignment or update stores its result.
enum Place {
    Var(String),
    Prop(Value, Value),
}

/// Tree-walking evaluator over [`crate::ast`].
pub struct Interpreter<'h> {
    host: &'h mut dyn Host,
    depth: usize,
    max_depth: usize,
}

impl<'h> Interpreter<'h> {
    pub fn new(host: &'h mut dyn Host, depth: usize, max_depth: usize) -> Self {
        Self {
            host,
            depth,
            max_depth,
        }
    }

    /// Evaluate a whole script in `scope`. Top-level `return`/`break` are
    /// ignored the same way a function body would swallow them.
    pub fn run_program(&mut self, program: &Program, scope: &Rc<Scope>) -> Result<()> {
        self.exec_stmts(&program.body, scope)?;
        Ok(())
    }

    /// Call any callable value with already-evaluated arguments.
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value> {
        match callee {
            Value::Function(closure) => self.call_closure(closure, args),
            Value::Native(native) => match native.as_ref() {
                NativeFn::Builtin(builtin) => builtins::call(*builtin, &args, &mut *self.host),
                NativeFn::Method { method, receiver } => builtins::call_method(*method, receiver, &args),
                NativeFn::Capability { capability, slot } => {
                    self.host
                        .call_capability(*capability, slot.as_ref(), args, self.depth)
                }
            },
            other => Err(ScriptError::type_error(format!("{other} is not a function"))),
        }
    }

    fn call_closure(&mut self, closure: &Rc<Closure>, args: Vec<Value>) -> Result<Value> {
        if self.depth >= self.max_depth {
            return Err(ScriptError::range("Maximum call stack size exceeded"));
        }
        let scope = Scope::child(&closure.env);
        let mut args = args.into_iter();
        for param in &closure.def.params {
            scope.declare(param, args.next().unwrap_or(Value::Undefined), true);
        }

        self.depth += 1;
        let result = match &closure.def.body {
            FunctionBody::Block(body) => self.exec_stmts(body, &scope).map(|flow| match flow {
                Flow::Return(value) => value,
                _ => Value::Undefined,
            }),
            FunctionBody::Expr(expr) => self.eval(expr, &scope),
        };
        self.depth -= 1;
        result
    }

    // ── Statements ─────────────────────────────────────────────────────

    /// Run statements in `scope`, hoisting function declarations first.
    fn exec_stmts(&mut self, stmts: &[Stmt], scope: &Rc<Scope>) -> Result<Flow> {
        for stmt in stmts {
            if let Stmt::Function(def) = stmt {
                if let Some(name) = &def.name {
                    scope.declare(name, make_closure(def, scope), true);
                }
            }
        }
        for stmt in stmts {
            match self.exec(stmt, scope)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_block(&mut self, stmts: &[Stmt], scope: &Rc<Scope>) -> Result<Flow> {
        self.exec_stmts(stmts, &Scope::child(scope))
    }

    fn exec(&mut self, stmt: &Stmt, scope: &Rc<Scope>) -> Result<Flow> {
        match stmt {
            Stmt::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(Flow::Normal)
            }
            // hoisted by exec_stmts
            Stmt::Function(_) | Stmt::Empty => Ok(Flow::Normal),
            Stmt::Decl { kind, decls } => {
                for (name, init) in decls {
                    let value = match init {
                        Some(expr) => self.eval(expr, scope)?,
                        None => Value::Undefined,
                    };
                    scope.declare(name, value, *kind != DeclKind::Const);
                }
                Ok(Flow::Normal)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition, scope)?.is_truthy() {
                    self.exec_nested(then_branch, scope)
                } else if let Some(else_branch) = else_branch {
                    self.exec_nested(else_branch, scope)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { condition, body } => {
                while self.eval(condition, scope)?.is_truthy() {
                    match self.exec_nested(body, scope)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
            } => {
                let loop_scope = Scope::child(scope);
                if let Some(init) = init {
                    self.exec(init, &loop_scope)?;
                }
                loop {
                    if let Some(condition) = condition {
                        if !self.eval(condition, &loop_scope)?.is_truthy() {
                            break;
                        }
                    }
                    match self.exec_nested(body, &loop_scope)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if let Some(update) = update {
                        self.eval(update, &loop_scope)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::ForOf {
                kind,
                binding,
                iterable,
                body,
            } => {
                let items = match self.eval(iterable, scope)? {
                    // iterate a copy so pushes inside the loop do not extend it
                    Value::Array(items) => items.borrow().clone(),
                    Value::String(s) => s.chars().map(|c| Value::string(c.to_string())).collect(),
                    other => {
                        return Err(ScriptError::type_error(format!("{other} is not iterable")))
                    }
                };
                for item in items {
                    let iter_scope = Scope::child(scope);
                    iter_scope.declare(binding, item, *kind != DeclKind::Const);
                    match self.exec_nested(body, &iter_scope)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Block(stmts) => self.exec_block(stmts, scope),
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Throw(expr) => Err(ScriptError::Thrown(self.eval(expr, scope)?)),
            Stmt::Try {
                block,
                catch,
                finally,
            } => {
                let outcome = match (self.exec_block(block, scope), catch) {
                    (Err(err), Some((binding, handler))) => {
                        let catch_scope = Scope::child(scope);
                        if let Some(name) = binding {
                            catch_scope.declare(name, error_value(&err), true);
                        }
                        self.exec_stmts(handler, &catch_scope)
                    }
                    (outcome, _) => outcome,
                };
                if let Some(finally) = finally {
                    match self.exec_block(finally, scope)? {
                        Flow::Normal => {}
                        flow => return Ok(flow),
                    }
                }
                outcome
            }
        }
    }

    /// A statement in loop/branch position gets its own scope when it
    /// declares something.
    fn exec_nested(&mut self, stmt: &Stmt, scope: &Rc<Scope>) -> Result<Flow> {
        match stmt {
            Stmt::Decl { .. } | Stmt::Function(_) => {
                self.exec_stmts(std::slice::from_ref(stmt), &Scope::child(scope))
            }
            _ => self.exec(stmt, scope),
        }
    }

    // ── Expressions ────────────────────────────────────────────────────

    fn eval(&mut self, expr: &Expr, scope: &Rc<Scope>) -> Result<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::string(s.as_str())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Ident(name) => lookup(scope, name),
            Expr::Array(elements) => {
                let items = elements
                    .iter()
                    .map(|e| self.eval(e, scope))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::array(items))
            }
            Expr::Object(entries) => {
                let mut map = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    map.push((key.clone(), self.eval(value, scope)?));
                }
                Ok(Value::object(map))
            }
            Expr::Function(def) => Ok(make_closure(def, scope)),
            Expr::Member { object, field } => {
                let object = self.eval(object, scope)?;
                get_property(&object, &Value::string(field.as_str()))
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, scope)?;
                let index = self.eval(index, scope)?;
                get_property(&object, &index)
            }
            Expr::Call { callee, args } => {
                let function = self.eval(callee, scope)?;
                let args = args
                    .iter()
                    .map(|a| self.eval(a, scope))
                    .collect::<Result<Vec<_>>>()?;
                if !function.is_callable() {
                    return Err(ScriptError::type_error(format!(
                        "{} is not a function",
                        describe_callee(callee)
                    )));
                }
                self.call(&function, args)
            }
            Expr::Unary { op, operand } => {
                if let (UnaryOp::Typeof, Expr::Ident(name)) = (op, operand.as_ref()) {
                    let value = scope.lookup(name).unwrap_or(Value::Undefined);
                    return Ok(Value::string(value.type_of()));
                }
                let value = self.eval(operand, scope)?;
                Ok(match op {
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Typeof => Value::string(value.type_of()),
                })
            }
            Expr::BinaryOp { left, op, right } => {
                let left = self.eval(left, scope)?;
                match op {
                    BinOp::And if !left.is_truthy() => Ok(left),
                    BinOp::Or if left.is_truthy() => Ok(left),
                    BinOp::And | BinOp::Or => self.eval(right, scope),
                    _ => {
                        let right = self.eval(right, scope)?;
                        Ok(binary(*op, &left, &right))
                    }
                }
            }
            Expr::Ternary {
                condition,
                if_true,
                if_false,
            } => {
                if self.eval(condition, scope)?.is_truthy() {
                    self.eval(if_true, scope)
                } else {
                    self.eval(if_false, scope)
                }
            }
            Expr::Assign { target, op, value } => {
                let place = self.place(target, scope)?;
                let value = match op.binary() {
                    None => self.eval(value, scope)?,
                    Some(bin) => {
                        let current = self.read(&place, scope)?;
                        let rhs = self.eval(value, scope)?;
                        binary(bin, &current, &rhs)
                    }
                };
                self.write(&place, value.clone(), scope)?;
                Ok(value)
            }
            Expr::Update {
                target,
                delta,
                prefix,
            } => {
                let place = self.place(target, scope)?;
                let old = self.read(&place, scope)?.to_number();
                let new = old + delta;
                self.write(&place, Value::Number(new), scope)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
        }
    }

    fn place(&mut self, target: &Expr, scope: &Rc<Scope>) -> Result<Place> {
        match target {
            Expr::Ident(name) => Ok(Place::Var(name.clone())),
            Expr::Member { object, field } => Ok(Place::Prop(
                self.eval(object, scope)?,
                Value::string(field.as_str()),
            )),
            Expr::Index { object, index } => {
                let object = self.eval(object, scope)?;
                Ok(Place::Prop(object, self.eval(index, scope)?))
            }
            _ => Err(ScriptError::Syntax(crate::error::SyntaxError::message(
                "Invalid left-hand side in assignment",
                None,
            ))),
        }
    }

    fn read(&mut self, place: &Place, scope: &Rc<Scope>) -> Result<Value> {
        match place {
            Place::Var(name) => lookup(scope, name),
            Place::Prop(object, key) => get_property(object, key),
        }
    }

    fn write(&mut self, place: &Place, value: Value, scope: &Rc<Scope>) -> Result<()> {
        match place {
            Place::Var(name) => scope.assign(name, value),
            Place::Prop(object, key) => set_property(object, key, value),
        }
    }
}

fn make_closure(def: &Rc<FunctionDef>, scope: &Rc<Scope>) -> Value {
    Value::Function(Rc::new(Closure {
        def: Rc::clone(def),
        env: Rc::clone(scope),
    }))
}

fn lookup(scope: &Scope, name: &str) -> Result<Value> {
    scope
        .lookup(name)
        .ok_or_else(|| ScriptError::reference(format!("{name} is not defined")))
}

/// What `catch (e)` binds for a given failure.
fn error_value(err: &ScriptError) -> Value {
    match err {
        ScriptError::Thrown(value) => value.clone(),
        other => Value::object([
            ("name".to_string(), Value::string(other.name())),
            ("message".to_string(), Value::from(other.message())),
        ]),
    }
}

fn describe_callee(callee: &Expr) -> String {
    match callee {
        Expr::Ident(name) => name.clone(),
        Expr::Member { object, field } => format!("{}.{field}", describe_callee(object)),
        _ => "expression".to_string(),
    }
}

fn array_index(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn get_property(object: &Value, key: &Value) -> Result<Value> {
    match object {
        Value::Undefined | Value::Null => Err(ScriptError::type_error(format!(
            "Cannot read properties of {object} (reading '{key}')"
        ))),
        Value::Array(items) => {
            if let Some(i) = array_index(key) {
                return Ok(items.borrow().get(i).cloned().unwrap_or(Value::Undefined));
            }
            let name = key.to_string();
            if name == "length" {
                return Ok(Value::Number(items.borrow().len() as f64));
            }
            Ok(Method::bind(object, &name).unwrap_or(Value::Undefined))
        }
        Value::String(s) => {
            if let Some(i) = array_index(key) {
                return Ok(s
                    .chars()
                    .nth(i)
                    .map_or(Value::Undefined, |c| Value::string(c.to_string())));
            }
            let name = key.to_string();
            if name == "length" {
                return Ok(Value::Number(s.encode_utf16().count() as f64));
            }
            Ok(Method::bind(object, &name).unwrap_or(Value::Undefined))
        }
        Value::Object(map) => Ok(map
            .borrow()
            .get(&*key.to_string())
            .cloned()
            .unwrap_or(Value::Undefined)),
        Value::Entity(entity) => {
            let name = key.to_string();
            if name == "id" {
                return Ok(Value::string(Rc::clone(&entity.id)));
            }
            Ok(match Capability::entity_method(&name) {
                Some(capability) => Value::native(NativeFn::Capability {
                    capability,
                    slot: Some(Rc::clone(&entity.slot)),
                }),
                None => Value::Undefined,
            })
        }
        _ => Ok(Value::Undefined),
    }
}

fn set_property(object: &Value, key: &Value, value: Value) -> Result<()> {
    match object {
        Value::Object(map) => {
            map.borrow_mut().insert(key.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let Some(i) = array_index(key) else {
                return Err(ScriptError::type_error(format!(
                    "Cannot assign to property '{key}' of array"
                )));
            };
            let mut items = items.borrow_mut();
            if i >= items.len() {
                let len = i
                    .checked_add(1)
                    .filter(|len| *len <= MAX_ARRAY_LENGTH)
                    .ok_or_else(|| ScriptError::range("Invalid array length"))?;
                items.resize(len, Value::Undefined);
            }
            items[i] = value;
            Ok(())
        }
        Value::Undefined | Value::Null => Err(ScriptError::type_error(format!(
            "Cannot set properties of {object} (setting '{key}')"
        ))),
        other => Err(ScriptError::type_error(format!(
            "Cannot assign to property '{key}' of {}",
            other.type_of()
        ))),
    }
}

fn binary(op: BinOp, left: &Value, right: &Value) -> Value {
    let num = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
    match op {
        BinOp::Add => {
            let concat = |v: &Value| !matches!(v, Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_));
            if concat(left) || concat(right) {
                Value::from(format!("{left}{right}"))
            } else {
                num(|a, b| a + b)
            }
        }
        BinOp::Sub => num(|a, b| a - b),
        BinOp::Mul => num(|a, b| a * b),
        BinOp::Div => num(|a, b| a / b),
        BinOp::Rem => num(|a, b| a % b),
        BinOp::Eq => Value::Bool(left.loose_equals(right)),
        BinOp::NotEq => Value::Bool(!left.loose_equals(right)),
        BinOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
        BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => Value::Bool(compare(op, left, right)),
        // short-circuit operators are handled by the evaluator
        BinOp::And | BinOp::Or => Value::Undefined,
    }
}

fn compare(op: BinOp, left: &Value, right: &Value) -> bool {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return match op {
            BinOp::Lt => a < b,
            BinOp::LtEq => a <= b,
            BinOp::Gt => a > b,
            _ => a >= b,
        };
    }
    let (a, b) = (left.to_number(), right.to_number());
    match op {
        BinOp::Lt => a < b,
        BinOp::LtEq => a <= b,
        BinOp::Gt => a > b,
        _ => a >= b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_script;

    /// A host with no capabilities; `Math.random` counts up.
    struct NullHost(f64);

    impl Host for NullHost {
        fn call_capability(
            &mut self,
            capability: Capability,
            _slot: Option<&SlotCell>,
            _args: Vec<Value>,
            _depth: usize,
        ) -> Result<Value> {
            Err(ScriptError::type_error(format!("{} unavailable", capability.name())))
        }

        fn random(&mut self) -> f64 {
            self.0 += 0.25;
            self.0
        }
    }

    fn run(source: &str) -> Result<Rc<Scope>> {
        let program = parse_script(source)?;
        let root = Scope::root();
        builtins::install(&root);
        let scope = Scope::child(&root);
        let mut host = NullHost(0.0);
        Interpreter::new(&mut host, 0, 64).run_program(&program, &scope)?;
        Ok(scope)
    }

    fn eval_var(source: &str, name: &str) -> Value {
        run(source).expect("script failed").lookup(name).expect("unbound")
    }

    #[test]
    fn arithmetic_and_strings() {
        assert_eq!(eval_var("let x = 1 + 2 * 3 - 4 / 2", "x").to_number(), 5.0);
        assert_eq!(eval_var("let s = 'a' + 1 + 2", "s").to_string(), "a12");
        assert_eq!(eval_var("let r = 7 % 3", "r").to_number(), 1.0);
        assert_eq!(eval_var("let t = typeof nothing", "t").to_string(), "undefined");
    }

    #[test]
    fn hoisted_functions_and_closures() {
        let scope = run(
            r#"
            let total = add(2, 3);
            function add(a, b) { return a + b; }
            function counter() { let n = 0; return () => ++n; }
            const next = counter();
            next(); next();
            let count = next();
            "#,
        )
        .unwrap();
        assert_eq!(scope.lookup("total").unwrap().to_number(), 5.0);
        assert_eq!(scope.lookup("count").unwrap().to_number(), 3.0);
    }

    #[test]
    fn loops_break_and_continue() {
        let sum = eval_var(
            r#"
            let sum = 0;
            for (let i = 0; i < 10; i++) {
                if (i % 2 === 0) continue;
                if (i > 7) break;
                sum += i;
            }
            for (const v of [10, 20]) sum += v;
            let k = 0;
            while (true) { k++; if (k == 3) break; }
            sum += k;
            "#,
            "sum",
        );
        assert_eq!(sum.to_number(), 1.0 + 3.0 + 5.0 + 7.0 + 30.0 + 3.0);
    }

    #[test]
    fn arrays_objects_and_methods() {
        let scope = run(
            r#"
            const list = [];
            list.push(1, 2, 3);
            list[4] = 5;
            const last = list.pop();
            const obj = { a: 1, nested: { b: 2 } };
            obj.nested.b += 40;
            obj['c'] = list.length;
            const found = list.includes(2) && 'Hello'.toLowerCase() === 'hello';
            "#,
        )
        .unwrap();
        assert_eq!(scope.lookup("last").unwrap().to_number(), 5.0);
        assert_eq!(format!("{:?}", scope.lookup("list").unwrap()), "[1, 2, 3, undefined]");
        let obj = scope.lookup("obj").unwrap();
        assert_eq!(format!("{obj:?}"), r#"{"a": 1, "c": 4, "nested": {"b": 42}}"#);
        assert!(scope.lookup("found").unwrap().is_truthy());
    }

    #[test]
    fn huge_array_index_is_a_range_error() {
        for source in ["const a = []; a[1e300] = 1;", "const a = []; a[1e9] = 1;", "const a = [1]; a['4294967296'] = 1;"] {
            let err = run(source).unwrap_err();
            assert!(matches!(err, ScriptError::Range(_)), "{source}: {err}");
        }
        let scope = run("const a = []; a[65535] = 1; const n = a.length; const far = a[1e300];").unwrap();
        assert_eq!(scope.lookup("n").unwrap().to_number(), 65536.0);
        assert!(matches!(scope.lookup("far").unwrap(), Value::Undefined));
    }

    #[test]
    fn range_takes_whole_lengths_only() {
        assert_eq!(format!("{:?}", eval_var("const r = range(3);", "r")), "[0, 1, 2]");
        assert_eq!(eval_var("const r = range('2');", "r").to_string(), "0,1");
        for (source, message) in [
            ("range(2.5)", "RangeError: Invalid range length 2.5"),
            ("range(-1)", "RangeError: Invalid range length -1"),
            ("range('x')", "RangeError: Invalid range length NaN"),
            ("range(65537)", "RangeError: Invalid range length 65537"),
        ] {
            assert_eq!(run(source).unwrap_err().to_string(), message, "{source}");
        }
        assert!(run("range(65536)").is_ok());
    }

    #[test]
    fn undeclared_assignment_fails() {
        let err = run("ghost = 1").unwrap_err();
        assert_eq!(err.to_string(), "ReferenceError: ghost is not defined");
    }

    #[test]
    fn const_reassignment_fails() {
        let err = run("const a = 1; a = 2;").unwrap_err();
        assert!(matches!(err, ScriptError::Type(_)));
    }

    #[test]
    fn calling_non_function_names_callee() {
        let err = run("const o = {}; o.missing();").unwrap_err();
        assert_eq!(err.to_string(), "TypeError: o.missing is not a function");
    }

    #[test]
    fn try_catch_binds_errors() {
        let scope = run(
            r#"
            let caught, thrown, cleaned = false;
            try { undefinedThing(); } catch (e) { caught = e.name + ': ' + e.message; }
            try { throw 'boom'; } catch (e) { thrown = e; } finally { cleaned = true; }
            "#,
        )
        .unwrap();
        assert_eq!(
            scope.lookup("caught").unwrap().to_string(),
            "ReferenceError: undefinedThing is not defined"
        );
        assert_eq!(scope.lookup("thrown").unwrap().to_string(), "boom");
        assert!(scope.lookup("cleaned").unwrap().is_truthy());
    }

    #[test]
    fn uncaught_throw_propagates() {
        let err = run("throw 'bad input'").unwrap_err();
        assert_eq!(err.to_string(), "Uncaught bad input");
    }

    #[test]
    fn runaway_recursion_is_range_error() {
        let err = run("function f() { return f(); } f();").unwrap_err();
        assert!(matches!(err, ScriptError::Range(_)));
    }

    #[test]
    fn builtins_use_host_random() {
        let scope = run("const a = Math.random(); const b = Math.random(); const m = Math.max(1, 9, 4);").unwrap();
        assert_eq!(scope.lookup("a").unwrap().to_number(), 0.25);
        assert_eq!(scope.lookup("b").unwrap().to_number(), 0.5);
        assert_eq!(scope.lookup("m").unwrap().to_number(), 9.0);
    }

    #[test]
    fn null_member_access_is_type_error() {
        let err = run("const p = null; p.x;").unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: Cannot read properties of null (reading 'x')"
        );
    }
}
