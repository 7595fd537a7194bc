//! Mark-and-sweep collector over environment frames.
//!
//! Reference counting alone leaks environments linked through closures
//! stored in instance fields (closure → frame → value → instance →
//! closure → frame …).  The collector treats frames as heap nodes and
//! reclaims the ones kept alive only through such cycles.
//!
//! Roots are the globals frame plus every block/call frame that has been
//! entered but not yet exited (the directly-reachable stack).  Edges are
//! the enclosing link, a function value's closure frame, and an instance
//! value's field graph.  The evaluator runs a cycle at every block exit,
//! *before* the exiting frame leaves the root stack: collecting after the
//! pop could clear a frame that closures created inside the block still
//! expect to find intact on return.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use log::debug;

use crate::class::LoxInstance;
use crate::environment::{EnvRef, Environment};
use crate::value::Value;

pub struct GarbageCollector {
    // Every frame the evaluator has created, by weak handle.  Strong
    // ownership stays with the frames' users (closures, the active
    // chain); the collector only neutralizes what nobody else holds.
    environments: Vec<Weak<RefCell<Environment>>>,

    // Frames that enclose the currently active frame.  They can be found
    // by walking the active chain upwards and are always upgradable.
    directly_reachable: Vec<Weak<RefCell<Environment>>>,
}

impl GarbageCollector {
    /// The globals frame is rooted for the collector's whole lifetime.
    pub fn new(globals: &EnvRef) -> Self {
        let mut gc = GarbageCollector {
            environments: Vec::new(),
            directly_reachable: Vec::new(),
        };
        gc.track(globals);

        gc
    }

    /// Register a frame the evaluator just entered.
    pub fn track(&mut self, environment: &EnvRef) {
        self.environments.push(Rc::downgrade(environment));
        self.directly_reachable.push(Rc::downgrade(environment));
    }

    /// Drop the most recently entered frame from the root stack.
    pub fn pop(&mut self) {
        self.directly_reachable.pop();
    }

    /// Number of tracked frames still alive (globals included).  Handles
    /// whose frame has already been dropped linger in the list until the
    /// next sweep and are not counted.
    pub fn tracked_count(&self) -> usize {
        self.environments
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn collect(&mut self) {
        // Instances already visited this cycle; self-referential field
        // graphs would otherwise recurse forever.
        let mut visited: HashSet<*const RefCell<LoxInstance>> = HashSet::new();

        for root in &self.directly_reachable {
            if let Some(environment) = root.upgrade() {
                mark_environment(&environment, &mut visited);
            }
        }

        let before = self.environments.len();

        // Expired handles are gone already; unmarked survivors are
        // unreachable.  Clearing their values breaks any cycles that
        // were keeping the frames' contents alive.
        self.environments.retain(|weak| match weak.upgrade() {
            None => false,

            Some(environment) => {
                if environment.borrow().reachable {
                    true
                } else {
                    environment.borrow_mut().values.clear();
                    false
                }
            }
        });

        debug!(
            "gc: swept {} of {} tracked frame(s)",
            before - self.environments.len(),
            before
        );

        // Unmark survivors for the next cycle.
        for weak in &self.environments {
            if let Some(environment) = weak.upgrade() {
                environment.borrow_mut().reachable = false;
            }
        }
    }
}

fn mark_environment(environment: &EnvRef, visited: &mut HashSet<*const RefCell<LoxInstance>>) {
    if environment.borrow().reachable {
        return;
    }

    environment.borrow_mut().reachable = true;

    // Clone the handles out before recursing: a cycle can lead back to
    // this frame, and the mark test above must be able to borrow it.
    let enclosing = environment.borrow().enclosing().map(Rc::clone);
    if let Some(enclosing) = enclosing {
        mark_environment(&enclosing, visited);
    }

    let values: Vec<Value> = environment.borrow().values.values().cloned().collect();
    for value in &values {
        mark_value(value, visited);
    }
}

fn mark_value(value: &Value, visited: &mut HashSet<*const RefCell<LoxInstance>>) {
    match value {
        // Function values carry environments.
        Value::Function(function) => {
            mark_environment(function.closure(), visited);
        }

        // Instance fields can hold function values which carry
        // environments.  Entry is guarded so that an instance reachable
        // from itself terminates the walk.
        Value::Instance(instance) => {
            if !visited.insert(Rc::as_ptr(instance)) {
                return;
            }

            let fields: Vec<Value> = instance.borrow().fields.values().cloned().collect();
            for field in &fields {
                mark_value(field, visited);
            }
        }

        _ => {}
    }
}
