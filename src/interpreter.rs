//! Tree-walking evaluator.
//!
//! Statements execute for effect; expressions evaluate to a [`Value`].
//! `break`/`continue`/`return` are typed non-local exits threaded through
//! the `Err` channel: each unwinds through any number of block frames
//! (cleaning up and running the collector at every boundary) until the
//! matching construct catches it.  A distinct variant per exit keeps a
//! `return` inside a loop from being swallowed by the loop.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::debug;

use crate::class::{LoxClass, LoxInstance};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId};
use crate::function::LoxFunction;
use crate::gc::GarbageCollector;
use crate::native::NATIVES;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Non-local exits.  The line is carried for the diagnostic emitted if an
/// exit ever escapes its construct (the resolver statically forbids it).
#[derive(Debug)]
pub enum Unwind {
    Break(usize),
    Continue(usize),
    Return(usize, Value),
    Error(LoxError),
}

impl From<LoxError> for Unwind {
    fn from(err: LoxError) -> Self {
        Unwind::Error(err)
    }
}

type Exec = std::result::Result<(), Unwind>;
type Eval = std::result::Result<Value, Unwind>;

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,

    // Resolver output: use-site id → number of enclosing links to the
    // defining frame.  Absent means global.
    locals: HashMap<ExprId, usize>,

    gc: GarbageCollector,

    // `print` sink; stdout unless a harness swaps it out.
    output: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Self {
        let mut globals = Environment::new();
        for native in NATIVES {
            globals.define(native.name, Value::NativeFn(native.clone()));
        }

        let globals = Rc::new(RefCell::new(globals));
        let gc = GarbageCollector::new(&globals);

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            gc,
            output: Box::new(io::stdout()),
        }
    }

    /// Redirect `print` output, e.g. into a test capture.
    pub fn with_output(mut self, output: Box<dyn Write>) -> Self {
        self.output = output;
        self
    }

    /// Called by the resolver for every local use site.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        debug!("Noting local use site {} at depth {}", id, depth);
        self.locals.insert(id, depth);
    }

    pub fn gc(&self) -> &GarbageCollector {
        &self.gc
    }

    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        for stmt in statements {
            if let Err(unwind) = self.execute(stmt) {
                return Err(escape_error(unwind));
            }
        }

        Ok(())
    }

    // Statement execution
    // ─────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Exec {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;

                writeln!(self.output, "{}", value).map_err(LoxError::from)?;

                Ok(())
            }

            Stmt::Assert {
                keyword,
                expression,
            } => {
                if !is_truthy(&self.evaluate(expression)?) {
                    return Err(LoxError::runtime(keyword.line, "Assertion failed.").into());
                }

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let frame = Environment::with_enclosing(Rc::clone(&self.environment));

                self.execute_block(statements, Rc::new(RefCell::new(frame)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }

                Ok(())
            }

            Stmt::While {
                condition,
                body,
                increment,
            } => {
                while is_truthy(&self.evaluate(condition)?) {
                    match self.execute(body) {
                        // `continue` falls through so the increment of a
                        // desugared `for` still runs.
                        Ok(()) | Err(Unwind::Continue(_)) => {}

                        Err(Unwind::Break(_)) => break,

                        Err(other) => return Err(other),
                    }

                    if let Some(increment) = increment {
                        self.evaluate(increment)?;
                    }
                }

                Ok(())
            }

            Stmt::Break(keyword) => Err(Unwind::Break(keyword.line)),

            Stmt::Continue(keyword) => Err(Unwind::Continue(keyword.line)),

            Stmt::Return { keyword, value } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Err(Unwind::Return(keyword.line, value))
            }

            Stmt::Function(declaration) => {
                let function = LoxFunction::new(
                    declaration.clone(),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[FunctionDecl],
    ) -> Exec {
        // Reserve the slot first so methods can refer to the class name.
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        let superclass = match superclass {
            Some(expr) => {
                let line = match expr {
                    Expr::Variable { name, .. } => name.line,
                    _ => name.line,
                };

                match self.evaluate(expr)? {
                    Value::Class(class) => Some(class),

                    _ => {
                        return Err(
                            LoxError::runtime(line, "Superclass must be a class.").into()
                        );
                    }
                }
            }

            None => None,
        };

        // Methods close over a synthetic frame holding `super` when a
        // superclass exists.  That frame is shared by every method and is
        // not collector-tracked: the methods themselves keep it alive.
        let method_env = match &superclass {
            Some(class) => {
                let mut frame = Environment::with_enclosing(Rc::clone(&self.environment));
                frame.define("super", Value::Class(Rc::clone(class)));

                Rc::new(RefCell::new(frame))
            }

            None => Rc::clone(&self.environment),
        };

        let mut method_table: HashMap<String, Rc<LoxFunction>> = HashMap::new();
        for method in methods {
            let is_initializer = method.name.lexeme == "init";
            let function = LoxFunction::new(method.clone(), Rc::clone(&method_env), is_initializer);

            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = LoxClass::new(name.lexeme.clone(), superclass, method_table);

        // Fill the slot reserved above.
        if !self
            .environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(Rc::new(class)))
        {
            return Err(LoxError::runtime(
                name.line,
                format!("Undefined variable '{}'.", name.lexeme),
            )
            .into());
        }

        Ok(())
    }

    /// Run statements in a fresh frame, restoring the previous frame on
    /// every exit path.  The collector runs *before* the frame leaves the
    /// root stack; the `gc` module docs explain why the order matters.
    pub fn execute_block(&mut self, statements: &[Stmt], frame: EnvRef) -> Exec {
        let previous = Rc::clone(&self.environment);

        self.gc.track(&frame);
        self.environment = frame;

        let mut result = Ok(());
        for stmt in statements {
            result = self.execute(stmt);

            if result.is_err() {
                break;
            }
        }

        self.gc.collect();
        self.gc.pop();
        self.environment = previous;

        result
    }

    // Expression evaluation
    // ─────────────────────────────────────────────────────────────────────

    fn evaluate(&mut self, expr: &Expr) -> Eval {
        match expr {
            Expr::Literal(token) => literal_value(token),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_value = self.evaluate(left)?;

                // The result is the deciding operand, not a coerced bool.
                match operator.token_type {
                    TokenType::OR if is_truthy(&left_value) => Ok(left_value),
                    TokenType::AND if !is_truthy(&left_value) => Ok(left_value),
                    _ => self.evaluate(right),
                }
            }

            Expr::Ternary {
                condition,
                true_expr,
                false_expr,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.evaluate(true_expr)
                } else {
                    self.evaluate(false_expr)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                let assigned = match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                    ),

                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone()),
                };

                if !assigned {
                    return Err(LoxError::runtime(
                        name.line,
                        format!("Undefined variable '{}'.", name.lexeme),
                    )
                    .into());
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, &name.lexeme)
                    .ok_or_else(|| {
                        Unwind::from(LoxError::runtime(
                            name.line,
                            format!("Undefined property '{}'.", name.lexeme),
                        ))
                    }),

                _ => Err(LoxError::runtime(name.line, "Only instances have properties.").into()),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;

                    instance.borrow_mut().set(&name.lexeme, value.clone());

                    Ok(value)
                }

                _ => Err(LoxError::runtime(name.line, "Only instances have fields.").into()),
            },

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Eval {
        let value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::BANG => Ok(Value::Bool(!is_truthy(&value))),

            TokenType::PLUS => match value {
                Value::Number(n) => Ok(Value::Number(n)),

                _ => Err(number_operand_error(operator)),
            },

            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(number_operand_error(operator)),
            },

            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator.").into()),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Eval {
        let left_value = self.evaluate(left)?;
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(string_or_number_operands_error(operator)),
            },

            TokenType::MINUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(number_operands_error(operator)),
            },

            TokenType::STAR => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(number_operands_error(operator)),
            },

            // Division by zero follows IEEE-754; no trap.
            TokenType::SLASH => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),

                _ => Err(number_operands_error(operator)),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_value == right_value)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_value != right_value)),

            TokenType::GREATER => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                (Value::String(a), Value::String(b)) => Ok(Value::Bool(a > b)),

                _ => Err(string_or_number_operands_error(operator)),
            },

            TokenType::GREATER_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                (Value::String(a), Value::String(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(string_or_number_operands_error(operator)),
            },

            TokenType::LESS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                (Value::String(a), Value::String(b)) => Ok(Value::Bool(a < b)),

                _ => Err(string_or_number_operands_error(operator)),
            },

            TokenType::LESS_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                (Value::String(a), Value::String(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(string_or_number_operands_error(operator)),
            },

            _ => Err(LoxError::runtime(operator.line, "Invalid binary operator.").into()),
        }
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> Eval {
        let callee_value = self.evaluate(callee)?;

        let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.evaluate(argument)?);
        }

        match callee_value {
            Value::Function(function) => {
                check_arity(function.arity(), args.len(), paren)?;

                function.call(self, args)
            }

            Value::Class(class) => {
                check_arity(class.arity(), args.len(), paren)?;

                LoxClass::construct(&class, self, args)
            }

            Value::NativeFn(native) => {
                check_arity(native.arity, args.len(), paren)?;

                (native.func)(&args).map_err(|msg| Unwind::from(LoxError::Native(msg)))
            }

            _ => Err(LoxError::runtime(paren.line, "Can only call functions and classes.").into()),
        }
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Eval {
        let distance = match self.locals.get(&id) {
            Some(&distance) => distance,

            None => {
                return Err(LoxError::runtime(keyword.line, "Undefined variable 'super'.").into());
            }
        };

        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Some(Value::Class(class)) => class,

            _ => {
                return Err(LoxError::runtime(keyword.line, "Undefined variable 'super'.").into());
            }
        };

        // `this` lives in the scope nested directly inside the one
        // holding `super`.
        let this_distance = match distance.checked_sub(1) {
            Some(d) => d,
            None => {
                return Err(LoxError::runtime(keyword.line, "Undefined variable 'this'.").into());
            }
        };

        let instance = match Environment::get_at(&self.environment, this_distance, "this") {
            Some(Value::Instance(instance)) => instance,

            _ => {
                return Err(LoxError::runtime(keyword.line, "Undefined variable 'this'.").into());
            }
        };

        let found = superclass.find_method(&method.lexeme).ok_or_else(|| {
            Unwind::from(LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            ))
        })?;

        Ok(Value::Function(Rc::new(found.bind(instance))))
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> Eval {
        let value = match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme),

            None => self.globals.borrow().get(&name.lexeme),
        };

        value.ok_or_else(|| {
            Unwind::from(LoxError::runtime(
                name.line,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        })
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,

        Value::Bool(b) => *b,

        _ => true,
    }
}

fn literal_value(token: &Token) -> Eval {
    match &token.token_type {
        TokenType::NUMBER(n) => Ok(Value::Number(*n)),

        TokenType::STRING(s) => Ok(Value::String(s.clone())),

        TokenType::TRUE => Ok(Value::Bool(true)),

        TokenType::FALSE => Ok(Value::Bool(false)),

        TokenType::NIL => Ok(Value::Nil),

        _ => Err(LoxError::runtime(token.line, "Invalid literal.").into()),
    }
}

fn check_arity(expected: usize, got: usize, paren: &Token) -> Exec {
    if expected != got {
        return Err(LoxError::runtime(
            paren.line,
            format!("Expected {} arguments but got {} arguments.", expected, got),
        )
        .into());
    }

    Ok(())
}

fn number_operand_error(operator: &Token) -> Unwind {
    LoxError::runtime(operator.line, "Operand must be a number.").into()
}

fn number_operands_error(operator: &Token) -> Unwind {
    LoxError::runtime(operator.line, "Operands must be numbers.").into()
}

fn string_or_number_operands_error(operator: &Token) -> Unwind {
    LoxError::runtime(operator.line, "Operands must be two strings or two numbers.").into()
}

/// A control-flow exit that reached the top level.  The resolver rejects
/// programs that could get here; this keeps the diagnostic honest if one
/// slips through.
fn escape_error(unwind: Unwind) -> LoxError {
    match unwind {
        Unwind::Error(err) => err,

        Unwind::Break(line) => LoxError::runtime(line, "'break' outside of a loop."),

        Unwind::Continue(line) => LoxError::runtime(line, "'continue' outside of a loop."),

        Unwind::Return(line, _) => LoxError::runtime(line, "'return' outside of a function."),
    }
}
