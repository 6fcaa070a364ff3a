//! Environment frames: nested scopes with `ancestor(n)` access.
//!
//! Frames are shared (`Rc<RefCell<…>>`) because closures keep their defining
//! frame alive past the block that created it; a frame's lifetime extends to
//! the longest-lived closure that captured it.
//!
//! Two access modes exist by design: resolved (non-global) references step a
//! known number of frames outward, while globals use a chained walk because
//! the resolver records no depth for them.

use std::{cell::RefCell, rc::Rc};

use ahash::AHashMap;

use crate::{
    error::{RunResult, RuntimeError},
    token::Token,
    value::Value,
};

pub(crate) type EnvRef = Rc<RefCell<Environment>>;

pub(crate) struct Environment {
    values: AHashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    /// Creates a root frame with no enclosing scope.
    pub fn global() -> EnvRef {
        Rc::new(RefCell::new(Self {
            values: AHashMap::new(),
            enclosing: None,
        }))
    }

    /// Creates a frame nested inside `enclosing`.
    pub fn nested(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Self {
            values: AHashMap::new(),
            enclosing: Some(Rc::clone(enclosing)),
        }))
    }

    /// Binds `name` in this frame, shadowing any outer binding.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Chained lookup: walks enclosing frames until the name is found.
    pub fn get(env: &EnvRef, name: &Token) -> RunResult<Value> {
        let mut current = Rc::clone(env);
        loop {
            if let Some(value) = current.borrow().values.get(&name.lexeme) {
                return Ok(value.clone());
            }
            let enclosing = current.borrow().enclosing.clone();
            match enclosing {
                Some(outer) => current = outer,
                None => {
                    return Err(RuntimeError::new(
                        name.clone(),
                        format!("Undefined variable '{}'.", name.lexeme),
                    ));
                }
            }
        }
    }

    /// Chained assignment: writes to the nearest frame holding the name.
    pub fn assign(env: &EnvRef, name: &Token, value: Value) -> RunResult<()> {
        let mut current = Rc::clone(env);
        loop {
            {
                let mut frame = current.borrow_mut();
                if let Some(slot) = frame.values.get_mut(&name.lexeme) {
                    *slot = value;
                    return Ok(());
                }
            }
            let enclosing = current.borrow().enclosing.clone();
            match enclosing {
                Some(outer) => current = outer,
                None => {
                    return Err(RuntimeError::new(
                        name.clone(),
                        format!("Undefined variable '{}'.", name.lexeme),
                    ));
                }
            }
        }
    }

    /// Reads `name` exactly `distance` frames outward.
    ///
    /// `None` means the frame or the binding is missing, which the resolver
    /// rules out for well-formed programs; callers turn it into a runtime
    /// error rather than silently yielding nil.
    pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
        let frame = Self::ancestor(env, distance)?;
        let value = frame.borrow().values.get(name).cloned();
        value
    }

    /// Writes `name` exactly `distance` frames outward. Returns whether the
    /// target frame existed.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &Token, value: Value) -> bool {
        let Some(frame) = Self::ancestor(env, distance) else {
            return false;
        };
        frame.borrow_mut().values.insert(name.lexeme.clone(), value);
        true
    }

    fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut current = Rc::clone(env);
        for _ in 0..distance {
            let enclosing = current.borrow().enclosing.clone()?;
            current = enclosing;
        }
        Some(current)
    }
}
