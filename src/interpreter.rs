//! Tree-walking evaluator.
//!
//! The active frame is threaded through every call as an explicit
//! `env: &EnvRef` argument; blocks and calls open child frames and simply
//! stop using them when they return, so the caller's frame is back in effect
//! on every exit path.  `return` travels upward as [`Flow::Return`], never
//! through the error channel.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::{Class, Function, Instance, Value};

/// Outcome of executing one statement.
#[derive(Debug)]
pub enum Flow<'a> {
    Normal,
    Return(Value<'a>),
}

pub struct Interpreter<'a> {
    globals: EnvRef<'a>,
    locals: Locals,
    out: Box<dyn Write + 'a>,
}

impl<'a> Default for Interpreter<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Interpreter<'a> {
    /// An interpreter printing to stdout, with the built-ins defined.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    /// An interpreter whose `print` statements write to `out`.
    pub fn with_output<W: Write + 'a>(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef<'a> = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock",
                arity: 0,
                func: |_args: &[Value<'a>]| {
                    let timestamp: f64 = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
                    debug!("Native function 'clock' returned: {}", timestamp);
                    Ok(Value::Number(timestamp))
                },
            },
        );

        Interpreter {
            globals,
            locals: Locals::new(),
            out: Box::new(out),
        }
    }

    /// Merge a resolver side-table into the one consulted at run time.
    pub fn add_locals(&mut self, locals: Locals) {
        debug!("Recording {} resolved reference(s)", locals.len());
        self.locals.extend(locals);
    }

    /// Execute a whole program in the global frame.
    pub fn interpret(&mut self, statements: &'a [Stmt<'a>]) -> Result<()> {
        info!("Interpreting {} statement(s)", statements.len());

        let globals: EnvRef<'a> = Rc::clone(&self.globals);

        for stmt in statements {
            // a top-level `return` is rejected by the resolver
            if let Flow::Return(_) = self.execute(stmt, &globals)? {
                break;
            }
        }

        self.out.flush()?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Evaluate a lone expression in the global frame.
    pub fn evaluate_expression(&mut self, expr: &'a Expr<'a>) -> Result<Value<'a>> {
        let globals: EnvRef<'a> = Rc::clone(&self.globals);
        self.evaluate(expr, &globals)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &'a Stmt<'a>, env: &EnvRef<'a>) -> Result<Flow<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr, env)?;
            }

            Stmt::Print(expr) => {
                let value: Value<'a> = self.evaluate(expr, env)?;
                writeln!(self.out, "{}", value)?;
                debug!("Printed value: {}", value);
            }

            Stmt::Var { name, initializer } => {
                let value: Value<'a> = match initializer {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);
                env.borrow_mut().define(name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let frame: EnvRef<'a> = Environment::child(env);
                return self.execute_block(statements, &frame);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition, env)?.is_truthy() {
                    return self.execute(then_branch, env);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch, env);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition, env)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }

            Stmt::Function(declaration) => {
                debug!("Defining function {:?}", declaration.name());

                let function = Function::new(declaration, Rc::clone(env), false);
                env.borrow_mut().define(
                    declaration.token.lexeme,
                    Value::Function(Rc::new(function)),
                );
            }

            Stmt::Return { value, .. } => {
                let value: Value<'a> = match value {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Nil,
                };

                return Ok(Flow::Return(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.declare_class(name, superclass.as_ref(), methods, env)?,
        }

        Ok(Flow::Normal)
    }

    /// Run `statements` in `env` until one of them returns.
    pub fn execute_block(&mut self, statements: &'a [Stmt<'a>], env: &EnvRef<'a>) -> Result<Flow<'a>> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt, env)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    fn declare_class(
        &mut self,
        name: &'a Token<'a>,
        superclass: Option<&'a Expr<'a>>,
        methods: &'a [FunctionDecl<'a>],
        env: &EnvRef<'a>,
    ) -> Result<()> {
        info!("Declaring class '{}'", name.lexeme);

        env.borrow_mut().define(name.lexeme, Value::Nil);

        let superclass: Option<Rc<Class<'a>>> = match superclass {
            Some(expr) => match self.evaluate(expr, env)? {
                Value::Class(class) => Some(class),
                _ => {
                    let line: usize = match expr {
                        Expr::Variable { name, .. } => name.line,
                        _ => name.line,
                    };
                    return Err(LoxError::runtime(line, "Superclass must be a class."));
                }
            },
            None => None,
        };

        let closure: EnvRef<'a> = match &superclass {
            Some(class) => {
                let frame: EnvRef<'a> = Environment::child(env);
                frame
                    .borrow_mut()
                    .define("super", Value::Class(Rc::clone(class)));
                frame
            }
            None => Rc::clone(env),
        };

        let mut table: HashMap<String, Rc<Function<'a>>> = HashMap::new();

        for method in methods {
            let method_name: &'a str = method.token.lexeme;
            let function = Function::new(method, Rc::clone(&closure), method_name == "init");
            table.insert(method_name.to_string(), Rc::new(function));
        }

        let class = Class::new(name.lexeme, superclass, table);
        env.borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))?;

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &'a Expr<'a>, env: &EnvRef<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner, env),

            Expr::Unary { operator, right } => {
                let right: Value<'a> = self.evaluate(right, env)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(LoxError::runtime(
                            operator.line,
                            format!("Operand must be a number, got {}.", other.type_name()),
                        )),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(LoxError::runtime(
                        operator.line,
                        format!("Unknown unary operator '{}'.", operator.lexeme),
                    )),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value<'a> = self.evaluate(left, env)?;
                let right: Value<'a> = self.evaluate(right, env)?;

                binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value<'a> = self.evaluate(left, env)?;

                let settled: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if settled {
                    Ok(left)
                } else {
                    self.evaluate(right, env)
                }
            }

            Expr::Comma(expressions) => {
                let mut last: Value<'a> = Value::Nil;
                for e in expressions {
                    last = self.evaluate(e, env)?;
                }
                Ok(last)
            }

            Expr::Conditional {
                predicate,
                consequent,
                alternative,
            } => {
                if self.evaluate(predicate, env)?.is_truthy() {
                    self.evaluate(consequent, env)
                } else {
                    self.evaluate(alternative, env)
                }
            }

            Expr::Variable { id, name } => self.lookup_variable(*id, name, env),

            Expr::Assign { id, name, value } => {
                let value: Value<'a> = self.evaluate(value, env)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(env, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                debug!("Assigned {} to '{}'", value, name.lexeme);
                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value<'a> = self.evaluate(callee, env)?;

                let mut args: Vec<Value<'a>> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg, env)?);
                }

                self.call_value(callee, args, paren)
            }

            Expr::Function(declaration) => Ok(Value::Function(Rc::new(Function::new(
                declaration,
                Rc::clone(env),
                false,
            )))),

            Expr::Get { object, name } => match self.evaluate(object, env)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                _ => Err(LoxError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let instance = match self.evaluate(object, env)? {
                    Value::Instance(instance) => instance,
                    _ => {
                        return Err(LoxError::runtime(
                            name.line,
                            "Only instances have properties.",
                        ))
                    }
                };

                let value: Value<'a> = self.evaluate(value, env)?;
                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }

            Expr::This { id, keyword } => self.lookup_variable(*id, keyword, env),

            Expr::Super { id, keyword, method } => self.lookup_super(*id, keyword, method, env),
        }
    }

    fn lookup_variable(&self, id: ExprId, name: &Token<'_>, env: &EnvRef<'a>) -> Result<Value<'a>> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(env, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    /// `super.method`: the superclass sits one frame above the frame binding
    /// `this` for the running method.
    fn lookup_super(
        &self,
        id: ExprId,
        keyword: &Token<'_>,
        method: &Token<'_>,
        env: &EnvRef<'a>,
    ) -> Result<Value<'a>> {
        let distance: usize = match self.locals.get(&id) {
            Some(&distance) if distance > 0 => distance,
            _ => {
                return Err(LoxError::runtime(
                    keyword.line,
                    "Can't use 'super' in a class with no superclass.",
                ))
            }
        };

        let superclass: Rc<Class<'a>> = match Environment::get_at(env, distance, keyword)? {
            Value::Class(class) => class,
            _ => return Err(LoxError::runtime(keyword.line, "Superclass must be a class.")),
        };

        let instance = match Environment::ancestor(env, distance - 1)
            .borrow()
            .get_here("this")
        {
            Some(Value::Instance(instance)) => instance,
            _ => {
                return Err(LoxError::runtime(
                    keyword.line,
                    "Can't use 'this' outside of a class.",
                ))
            }
        };

        match superclass.find_method(method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),
            None => Err(LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────────

    fn call_value(&mut self, callee: Value<'a>, args: Vec<Value<'a>>, paren: &Token<'_>) -> Result<Value<'a>> {
        let arity: usize = match &callee {
            Value::NativeFunction { arity, .. } => *arity,
            Value::Function(function) => function.arity(),
            Value::Class(class) => class.arity(),
            _ => {
                return Err(LoxError::runtime(
                    paren.line,
                    "Can only call functions and classes.",
                ))
            }
        };

        if args.len() != arity {
            return Err(LoxError::runtime(
                paren.line,
                format!("Expected {} arguments but got {}.", arity, args.len()),
            ));
        }

        match callee {
            Value::NativeFunction { name, func, .. } => {
                debug!("Calling native function '{}'", name);
                func(&args).map_err(|msg| LoxError::runtime(paren.line, msg))
            }

            Value::Function(function) => self.call_function(&function, args),

            Value::Class(class) => {
                info!("Instantiating class '{}'", class.name);

                let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(&class))));

                if let Some(init) = class.find_method("init") {
                    self.call_function(&init.bind(Rc::clone(&instance)), args)?;
                }

                Ok(Value::Instance(instance))
            }

            _ => Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }

    /// Parameters live in a frame of their own, the body in a child of it.
    pub fn call_function(&mut self, function: &Function<'a>, args: Vec<Value<'a>>) -> Result<Value<'a>> {
        let declaration: &'a FunctionDecl<'a> = function.declaration;

        debug!(
            "Calling function {} with {} argument(s)",
            function,
            args.len()
        );

        let params: EnvRef<'a> = Environment::child(&function.closure);
        for (param, value) in declaration.params.iter().zip(args) {
            params.borrow_mut().define(param.lexeme, value);
        }

        let body: EnvRef<'a> = Environment::child(&params);
        let flow: Flow<'a> = self.execute_block(&declaration.body, &body)?;

        if function.is_initializer {
            return Ok(function
                .closure
                .borrow()
                .get_here("this")
                .unwrap_or(Value::Nil));
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────────────

fn binary<'a>(operator: &Token<'_>, left: Value<'a>, right: Value<'a>) -> Result<Value<'a>> {
    let line: usize = operator.line;

    match operator.token_type {
        TokenType::PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (a, b) => Err(LoxError::runtime(
                line,
                format!(
                    "Operands must be two numbers or two strings, got {} and {}.",
                    a.type_name(),
                    b.type_name()
                ),
            )),
        },

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left.equals(&right))),
        TokenType::BANG_EQUAL => Ok(Value::Bool(!left.equals(&right))),

        _ => {
            let (a, b) = numbers(line, &left, &right)?;

            match operator.token_type {
                TokenType::MINUS => Ok(Value::Number(a - b)),
                TokenType::STAR => Ok(Value::Number(a * b)),
                TokenType::SLASH => {
                    if b == 0.0 {
                        Err(LoxError::runtime(line, "Division by zero."))
                    } else {
                        Ok(Value::Number(a / b))
                    }
                }
                TokenType::GREATER => Ok(Value::Bool(a > b)),
                TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
                TokenType::LESS => Ok(Value::Bool(a < b)),
                TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
                _ => Err(LoxError::runtime(
                    line,
                    format!("Unknown binary operator '{}'.", operator.lexeme),
                )),
            }
        }
    }
}

fn numbers(line: usize, left: &Value<'_>, right: &Value<'_>) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        (a, b) => Err(LoxError::runtime(
            line,
            format!(
                "Operands must be numbers, got {} and {}.",
                a.type_name(),
                b.type_name()
            ),
        )),
    }
}
