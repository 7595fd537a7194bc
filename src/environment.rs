use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// Shared handle to an environment frame.
pub type EnvRef = Rc<RefCell<Environment>>;

/// A single lexical frame: bindings plus a link to the enclosing frame.
///
/// Frames form a graph rooted at the globals frame.  A function-call frame
/// encloses the *closure's* captured frame, not the caller's, so several
/// closures may share ancestors.  `reachable` is owned by the collector.
#[derive(Debug)]
pub struct Environment {
    pub(crate) values: HashMap<String, Value>,
    pub(crate) enclosing: Option<EnvRef>,
    pub(crate) reachable: bool,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
            reachable: false,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
            reachable: false,
        }
    }

    /// Introduce (or overwrite) a binding in this frame.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Read a binding, searching this frame then its ancestors.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }

        self.enclosing
            .as_ref()
            .and_then(|enclosing| enclosing.borrow().get(name))
    }

    /// Update an existing binding, searching this frame then its
    /// ancestors.  Returns false when the name is bound nowhere.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            return true;
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value),
            None => false,
        }
    }

    /// Read a binding from the frame exactly `distance` enclosing links up.
    pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
        let frame = Self::ancestor(env, distance)?;
        let value = frame.borrow().values.get(name).cloned();
        value
    }

    /// Write a binding into the frame exactly `distance` enclosing links up.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &str, value: Value) -> bool {
        match Self::ancestor(env, distance) {
            Some(frame) => {
                frame.borrow_mut().define(name, value);
                true
            }
            None => false,
        }
    }

    fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let next = match &current.borrow().enclosing {
                Some(enclosing) => Rc::clone(enclosing),
                None => return None,
            };
            current = next;
        }

        Some(current)
    }

    pub(crate) fn enclosing(&self) -> Option<&EnvRef> {
        self.enclosing.as_ref()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
