use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::class::LoxInstance;
use crate::environment::{EnvRef, Environment};
use crate::interpreter::{Interpreter, Unwind};
use crate::stmt::FunctionDecl;
use crate::value::Value;

/// A user function paired with the frame that was active at its
/// declaration.  The declaration's params and body are `Rc`-shared with
/// the AST, so a closure stays valid after its defining scope exits.
#[derive(Debug)]
pub struct LoxFunction {
    declaration: FunctionDecl,
    closure: EnvRef,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: FunctionDecl, closure: EnvRef, is_initializer: bool) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    pub(crate) fn closure(&self) -> &EnvRef {
        &self.closure
    }

    /// Produce a bound method: the same declaration over a fresh frame
    /// holding `this`, enclosed by this function's closure.
    ///
    /// The `this` frame is not collector-tracked; it is reachable exactly
    /// through the bound method itself.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance>>) -> LoxFunction {
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define("this", Value::Instance(instance));

        LoxFunction::new(
            self.declaration.clone(),
            Rc::new(RefCell::new(environment)),
            self.is_initializer,
        )
    }

    /// Invoke the function: a fresh frame over the closure, parameters
    /// bound by position, body run as a block.
    ///
    /// An initializer yields the constructed instance on every exit path,
    /// early `return;` included.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, Unwind> {
        debug!("Calling <fn {}> with {} argument(s)", self.name(), arguments.len());

        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let frame = Rc::new(RefCell::new(environment));

        match interpreter.execute_block(&self.declaration.body, frame) {
            Ok(()) => {}

            Err(Unwind::Return(_, value)) => {
                if self.is_initializer {
                    return Ok(self.this_binding());
                }

                return Ok(value);
            }

            Err(other) => return Err(other),
        }

        if self.is_initializer {
            return Ok(self.this_binding());
        }

        Ok(Value::Nil)
    }

    // An initializer's closure is always a bound-`this` frame, so the
    // instance sits at depth zero.
    fn this_binding(&self) -> Value {
        Environment::get_at(&self.closure, 0, "this").unwrap_or(Value::Nil)
    }
}
