//! Runtime scope frames.
//!
//! A frame is shared (`Rc<RefCell<_>>`) between the construct that opened it
//! and every closure created while it was active, so it lives as long as the
//! longest of them.

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a frame.
pub type EnvRef<'a> = Rc<RefCell<Environment<'a>>>;

#[derive(Debug, Default)]
pub struct Environment<'a> {
    values: HashMap<String, Value<'a>>,
    enclosing: Option<EnvRef<'a>>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef<'a>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Convenience: a fresh shared child frame of `enclosing`.
    pub fn child(enclosing: &EnvRef<'a>) -> EnvRef<'a> {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            enclosing,
        ))))
    }

    /// Bind `name` in this frame, overwriting any previous binding here.
    pub fn define(&mut self, name: &str, value: Value<'a>) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &Token<'_>) -> Result<Value<'a>> {
        if let Some(value) = self.values.get(name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Update the nearest frame that already binds `name`; never creates one.
    pub fn assign(&mut self, name: &Token<'_>, value: Value<'a>) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// Look `name` up in this frame only.
    pub fn get_here(&self, name: &str) -> Option<Value<'a>> {
        self.values.get(name).cloned()
    }

    /// The frame exactly `distance` links up the chain from `env`.
    ///
    /// # Panics
    /// If the chain is shorter than `distance`; resolved distances always
    /// describe the runtime chain, so this is a broken invariant.
    pub fn ancestor(env: &EnvRef<'a>, distance: usize) -> EnvRef<'a> {
        let mut frame: EnvRef<'a> = Rc::clone(env);

        for hop in 0..distance {
            let parent: EnvRef<'a> = frame
                .borrow()
                .enclosing
                .clone()
                .unwrap_or_else(|| {
                    panic!(
                        "resolved distance {} exceeds environment depth {}",
                        distance, hop
                    )
                });
            frame = parent;
        }

        frame
    }

    pub fn get_at(env: &EnvRef<'a>, distance: usize, name: &Token<'_>) -> Result<Value<'a>> {
        debug!("get_at '{}' distance={}", name.lexeme, distance);

        Environment::ancestor(env, distance)
            .borrow()
            .get_here(name.lexeme)
            .ok_or_else(|| undefined(name))
    }

    pub fn assign_at(
        env: &EnvRef<'a>,
        distance: usize,
        name: &Token<'_>,
        value: Value<'a>,
    ) -> Result<()> {
        debug!("assign_at '{}' distance={}", name.lexeme, distance);

        let frame: EnvRef<'a> = Environment::ancestor(env, distance);
        let mut frame = frame.borrow_mut();

        let result = match frame.values.get_mut(name.lexeme) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(undefined(name)),
        };

        result
    }
}

fn undefined(name: &Token<'_>) -> LoxError {
    LoxError::runtime(name.line, format!("Undefined variable '{}'.", name.lexeme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token<'_> {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    #[test]
    fn get_walks_enclosing_frames() {
        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner: EnvRef = Environment::child(&globals);

        let value = inner.borrow().get(&ident("a")).unwrap();
        assert!(matches!(value, Value::Number(n) if n == 1.0));
    }

    #[test]
    fn assign_updates_nearest_declaring_frame() {
        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::Number(1.0));
        let inner: EnvRef = Environment::child(&globals);

        inner
            .borrow_mut()
            .assign(&ident("a"), Value::Number(2.0))
            .unwrap();

        assert!(inner.borrow().get_here("a").is_none());
        assert!(matches!(globals.borrow().get_here("a"), Some(Value::Number(n)) if n == 2.0));
    }

    #[test]
    fn assign_to_undeclared_name_fails() {
        let env: EnvRef = Rc::new(RefCell::new(Environment::new()));

        let err = env
            .borrow_mut()
            .assign(&ident("missing"), Value::Nil)
            .unwrap_err();

        assert_eq!(err.message(), "Undefined variable 'missing'.");
    }

    #[test]
    fn get_at_skips_shadowing_frames() {
        let outer: EnvRef = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("x", Value::Number(42.0));
        let inner: EnvRef = Environment::child(&outer);
        inner.borrow_mut().define("x", Value::Number(99.0));

        let value = Environment::get_at(&inner, 1, &ident("x")).unwrap();
        assert!(matches!(value, Value::Number(n) if n == 42.0));

        Environment::assign_at(&inner, 0, &ident("x"), Value::Bool(true)).unwrap();
        assert!(matches!(inner.borrow().get_here("x"), Some(Value::Bool(true))));
        assert!(matches!(outer.borrow().get_here("x"), Some(Value::Number(n)) if n == 42.0));
    }

    #[test]
    #[should_panic(expected = "exceeds environment depth")]
    fn ancestor_beyond_chain_panics() {
        let env: EnvRef = Rc::new(RefCell::new(Environment::new()));
        Environment::ancestor(&env, 1);
    }
}
