//! Static resolver pass.
//!
//! One walk over the AST that:
//! 1. Builds lexical scopes (a stack of name → [`NameMeta`] maps, innermost last).
//! 2. Reports static errors (redeclaration, reading a local in its own
//!    initializer, unused or parameter-shadowing function locals, misplaced
//!    `return`/`this`/`super`, self-inheritance).
//! 3. Records, for each name reference, how many scopes separate it from its
//!    declaration.  References found in no scope are globals and get no entry.
//!
//! The result is a side-table keyed by [`ExprId`]; the tree itself is never
//! touched, so resolving it again with a fresh resolver yields the same table.

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::{LoxError, Result};
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;

/// Binding distance for every locally-resolved reference.
pub type Locals = HashMap<ExprId, usize>;

/// What kind of function body we are inside.  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// What kind of class body we are inside.  Used to validate `this`/`super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Per-name bookkeeping inside one scope.
#[derive(Copy, Clone, Debug)]
struct NameMeta {
    /// The initializer has finished resolving.
    initialized: bool,
    /// Read at least once before the scope closed.
    used: bool,
    /// Declaration line, for diagnostics.
    line: usize,
    /// Declaration order within the scope.
    order: usize,
}

type Scope<'a> = HashMap<&'a str, NameMeta>;

pub struct Resolver<'a> {
    scopes: Vec<Scope<'a>>,
    locals: Locals,
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'a> Default for Resolver<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: Vec::new(),
            locals: Locals::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top‑level statements and hand back the distance table.
    pub fn resolve(&mut self, statements: &[Stmt<'a>]) -> Result<Locals> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }

        info!("Resolved {} local reference(s)", self.locals.len());

        Ok(std::mem::take(&mut self.locals))
    }

    /// Resolve a lone expression (the `evaluate` entry point).
    pub fn resolve_expression(&mut self, expr: &Expr<'a>) -> Result<Locals> {
        self.resolve_expr(expr)?;

        Ok(std::mem::take(&mut self.locals))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt<'a>) -> Result<()> {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                let result = self.resolve_stmts(statements);
                self.end_scope();
                result?;
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(*name)?;
                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }
                self.define(*name);
            }

            Stmt::Function(declaration) => {
                // the name is visible inside its own body
                let name: &'a Token<'a> = declaration.token;
                self.declare(name)?;
                self.define(name);
                self.resolve_function(declaration, FunctionType::Function)?;
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let enclosing: ClassType = self.current_class;
                self.current_class = ClassType::Class;

                let result = self.resolve_class(*name, superclass.as_ref(), methods);

                self.current_class = enclosing;
                result?;
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Can't return from top-level code.",
                    ));
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        return Err(LoxError::resolve(
                            keyword.line,
                            "Can't return a value from an initializer.",
                        ));
                    }

                    self.resolve_expr(expr)?;
                }
            }
        }

        Ok(())
    }

    fn resolve_stmts(&mut self, statements: &[Stmt<'a>]) -> Result<()> {
        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }

        Ok(())
    }

    fn resolve_class(
        &mut self,
        name: &'a Token<'a>,
        superclass: Option<&Expr<'a>>,
        methods: &[FunctionDecl<'a>],
    ) -> Result<()> {
        self.declare(name)?;
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expr::Variable { name: super_name, .. } = superclass {
                if super_name.lexeme == name.lexeme {
                    return Err(LoxError::resolve(
                        super_name.line,
                        "A class can't inherit from itself.",
                    ));
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass)?;

            self.begin_scope();
            self.insert_synthetic("super", name.line);
        }

        self.begin_scope();
        self.insert_synthetic("this", name.line);

        let mut result: Result<()> = Ok(());

        for method in methods {
            let kind: FunctionType = if method.name() == Some("init") {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            result = self.resolve_function(method, kind);
            if result.is_err() {
                break;
            }
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr<'a>) -> Result<()> {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner)?;
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right)?;
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Comma(expressions) => {
                for e in expressions {
                    self.resolve_expr(e)?;
                }
            }

            Expr::Conditional {
                predicate,
                consequent,
                alternative,
            } => {
                self.resolve_expr(predicate)?;
                self.resolve_expr(consequent)?;
                self.resolve_expr(alternative)?;
            }

            Expr::Variable { id, name } => {
                if let Some(meta) = self.scopes.last().and_then(|s| s.get(name.lexeme)) {
                    if !meta.initialized {
                        return Err(LoxError::resolve(
                            name.line,
                            "Can't read local variable in its own initializer.",
                        ));
                    }
                }

                self.resolve_local(*id, name, true);
            }

            Expr::Assign { id, name, value } => {
                // RHS first, then bind LHS; a write is not a use
                self.resolve_expr(value)?;
                self.resolve_local(*id, name, false);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;
                for arg in arguments {
                    self.resolve_expr(arg)?;
                }
            }

            Expr::Function(declaration) => {
                self.resolve_function(declaration, FunctionType::Function)?;
            }

            Expr::Get { object, .. } => self.resolve_expr(object)?,

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object)?;
                self.resolve_expr(value)?;
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Can't use 'this' outside of a class.",
                    ));
                }

                self.resolve_local(*id, keyword, true);
            }

            Expr::Super { id, keyword, .. } => match self.current_class {
                ClassType::None => {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Can't use 'super' outside of a class.",
                    ));
                }
                ClassType::Class => {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Can't use 'super' in a class with no superclass.",
                    ));
                }
                ClassType::Subclass => self.resolve_local(*id, keyword, true),
            },
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// One scope for the parameters, one for the body block.  The enclosing
    /// function kind is restored on every exit path.
    fn resolve_function(&mut self, declaration: &FunctionDecl<'a>, kind: FunctionType) -> Result<()> {
        let enclosing: FunctionType = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        let result = self.resolve_function_scopes(declaration);
        self.end_scope();

        self.current_function = enclosing;
        result
    }

    fn resolve_function_scopes(&mut self, declaration: &FunctionDecl<'a>) -> Result<()> {
        for &param in &declaration.params {
            self.declare(param)?;
            self.define(param);
        }

        self.begin_scope();
        let result = self
            .resolve_stmts(&declaration.body)
            .and_then(|()| self.check_body_locals());
        self.end_scope();

        result
    }

    /// Locals of a function body must not reuse a parameter name and must be
    /// read at least once.  Reported in declaration order.
    fn check_body_locals(&self) -> Result<()> {
        let (body, params) = match self.scopes.as_slice() {
            [.., params, body] => (body, params),
            _ => return Ok(()),
        };

        let mut declared: Vec<(&&'a str, &NameMeta)> = body.iter().collect();
        declared.sort_by_key(|(_, meta)| meta.order);

        for (name, meta) in declared {
            if params.contains_key(*name) {
                return Err(LoxError::resolve(
                    meta.line,
                    format!("Local variable `{}` conflicts with parameter.", name),
                ));
            }

            if !meta.used {
                return Err(LoxError::resolve(
                    meta.line,
                    format!("Local variable `{}` is declared but never used.", name),
                ));
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &'a Token<'a>) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.lexeme) {
                return Err(LoxError::resolve(
                    name.line,
                    format!(
                        "Already a variable with this name `{}` in this scope.",
                        name.lexeme
                    ),
                ));
            }

            let order: usize = scope.len();
            scope.insert(
                name.lexeme,
                NameMeta {
                    initialized: false,
                    used: false,
                    line: name.line,
                    order,
                },
            );
        }

        Ok(())
    }

    fn define(&mut self, name: &'a Token<'a>) {
        if let Some(meta) = self
            .scopes
            .last_mut()
            .and_then(|scope| scope.get_mut(name.lexeme))
        {
            meta.initialized = true;
        }
    }

    /// `this` / `super`: always initialized, never subject to the unused check.
    fn insert_synthetic(&mut self, name: &'static str, line: usize) {
        if let Some(scope) = self.scopes.last_mut() {
            let order: usize = scope.len();
            scope.insert(
                name,
                NameMeta {
                    initialized: true,
                    used: true,
                    line,
                    order,
                },
            );
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this reference as a local at depth `d`, or leave it unrecorded
    /// (global) if no scope declares it.
    fn resolve_local(&mut self, id: ExprId, name: &Token<'_>, is_read: bool) {
        for (depth, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(meta) = scope.get_mut(name.lexeme) {
                if is_read {
                    meta.used = true;
                }

                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
