//! Runtime values and the object model (functions, classes, instances).

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::token::Token;

/// Signature of a built-in function.  Errors are plain messages; the
/// interpreter attaches the call-site line.
pub type NativeFn<'a> = fn(&[Value<'a>]) -> std::result::Result<Value<'a>, String>;

#[derive(Clone)]
pub enum Value<'a> {
    NativeFunction {
        name: &'static str,
        arity: usize,
        func: NativeFn<'a>,
    },
    Function(Rc<Function<'a>>),
    Class(Rc<Class<'a>>),
    Instance(Rc<RefCell<Instance<'a>>>),
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
}

impl<'a> Value<'a> {
    /// `nil` and `false` are falsy, everything else (including `0` and `""`) is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Language-level `==`.  Never fails: values of different kinds are
    /// simply unequal, and callables/instances compare by identity.
    pub fn equals(&self, other: &Value<'a>) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction { name: a, .. }, Value::NativeFunction { name: b, .. }) => {
                a == b
            }
            _ => false,
        }
    }

    /// Kind name used in runtime error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::NativeFunction { .. } | Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Nil => "nil",
        }
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NativeFunction { name, .. } => write!(f, "<native fn {}>", name),

            Value::Function(function) => write!(f, "{}", function),

            Value::Class(class) => write!(f, "{}", class.name),

            Value::Instance(instance) => write!(f, "{} instance", instance.borrow().class.name),

            Value::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),
        }
    }
}

// Frames and instances can reference each other in cycles, so Debug only
// ever prints the shallow textual form.
impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "String({:?})", s),
            other => write!(f, "{}({})", other.type_name(), other),
        }
    }
}

// ───────────────────────────── functions ─────────────────────────────

/// A user function: its declaration plus the frame that was active when it
/// was declared.
pub struct Function<'a> {
    pub declaration: &'a FunctionDecl<'a>,
    pub closure: EnvRef<'a>,
    pub is_initializer: bool,
}

impl<'a> Function<'a> {
    pub fn new(declaration: &'a FunctionDecl<'a>, closure: EnvRef<'a>, is_initializer: bool) -> Self {
        Function {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.arity()
    }

    /// A copy of this method whose closure is a fresh frame binding `this`.
    pub fn bind(&self, instance: Rc<RefCell<Instance<'a>>>) -> Function<'a> {
        debug!(
            "Binding method '{}' to an instance",
            self.declaration.name().unwrap_or("<anonymous>")
        );

        let environment: EnvRef<'a> = Environment::child(&self.closure);
        environment
            .borrow_mut()
            .define("this", Value::Instance(instance));

        Function {
            declaration: self.declaration,
            closure: environment,
            is_initializer: self.is_initializer,
        }
    }
}

impl fmt::Display for Function<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.declaration.name() {
            Some(name) => write!(f, "<fn {}>", name),
            None => write!(f, "<fn>"),
        }
    }
}

// ───────────────────────────── classes ───────────────────────────────

pub struct Class<'a> {
    pub name: String,
    pub superclass: Option<Rc<Class<'a>>>,
    pub methods: HashMap<String, Rc<Function<'a>>>,
}

impl<'a> Class<'a> {
    pub fn new(
        name: &str,
        superclass: Option<Rc<Class<'a>>>,
        methods: HashMap<String, Rc<Function<'a>>>,
    ) -> Self {
        Class {
            name: name.to_string(),
            superclass,
            methods,
        }
    }

    /// Own methods first, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function<'a>>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// Arity of the constructor: that of `init`, or 0 without one.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

// ──────────────────────────── instances ──────────────────────────────

pub struct Instance<'a> {
    pub class: Rc<Class<'a>>,
    fields: HashMap<String, Value<'a>>,
}

impl<'a> Instance<'a> {
    pub fn new(class: Rc<Class<'a>>) -> Self {
        Instance {
            class,
            fields: HashMap::new(),
        }
    }

    /// Property read: fields shadow methods; a found method comes back bound
    /// to `instance`.
    pub fn get(instance: &Rc<RefCell<Instance<'a>>>, name: &Token<'_>) -> Result<Value<'a>> {
        if let Some(value) = instance.borrow().fields.get(name.lexeme) {
            return Ok(value.clone());
        }

        let method: Option<Rc<Function<'a>>> = instance.borrow().class.find_method(name.lexeme);

        match method {
            Some(method) => Ok(Value::Function(Rc::new(method.bind(Rc::clone(instance))))),
            None => Err(LoxError::runtime(
                name.line,
                format!("Undefined property '{}'.", name.lexeme),
            )),
        }
    }

    /// Fields spring into existence on first assignment.
    pub fn set(&mut self, name: &Token<'_>, value: Value<'a>) {
        self.fields.insert(name.lexeme.to_string(), value);
    }
}
