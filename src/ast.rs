//! Abstract syntax tree produced by the [`Parser`](crate::parser::Parser).
//!
//! Two closed families: [`Expr`] and [`Stmt`].  Nodes borrow their tokens
//! from the token buffer (`'a`), are built once by the parser and never
//! mutated afterwards.  Name-reference nodes carry an [`ExprId`] so the
//! resolver can attach binding distances out-of-band, keyed by node
//! identity, and the same tree can be walked any number of times.

use crate::token::Token;

/// Identity of a name-reference node (`Variable`, `Assign`, `This`, `Super`),
/// unique within one parse.
pub type ExprId = usize;

/// A **literal constant** that appears directly in the source code.
///
/// These are the terminal leaves of the expression tree and do **not**
/// retain a reference to the originating [`Token`].
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal, stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

/// Every kind of *expression* in the language.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'a> {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr<'a>>),

    /// Prefix unary operator expression, `!ready` or `-42`.
    Unary {
        operator: &'a Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Infix binary operator expression, `a + b`, `x <= y`.
    Binary {
        left: Box<Expr<'a>>,
        operator: &'a Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Short‑circuiting `and` / `or`.  The right operand is evaluated only
    /// when the left one does not settle the result.
    Logical {
        left: Box<Expr<'a>>,
        operator: &'a Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// `a, b, c`: evaluated left to right, yields the last value.
    Comma(Vec<Expr<'a>>),

    /// `predicate ? consequent : alternative`
    Conditional {
        predicate: Box<Expr<'a>>,
        consequent: Box<Expr<'a>>,
        alternative: Box<Expr<'a>>,
    },

    /// Variable access.
    Variable { id: ExprId, name: &'a Token<'a> },

    /// Assignment expression: `identifier "=" expression`
    Assign {
        id: ExprId,
        name: &'a Token<'a>,
        value: Box<Expr<'a>>,
    },

    /// Function‑ or method‑call expression, `clock()` or `add(1, 2)`.
    Call {
        callee: Box<Expr<'a>>,
        /// The closing `)` token, retained for error reporting.
        paren: &'a Token<'a>,
        arguments: Vec<Expr<'a>>,
    },

    /// Anonymous function: `fun (a, b) { ... }`.
    Function(FunctionDecl<'a>),

    /// object.property
    Get {
        object: Box<Expr<'a>>,
        name: &'a Token<'a>,
    },

    /// object.property = value
    Set {
        object: Box<Expr<'a>>,
        name: &'a Token<'a>,
        value: Box<Expr<'a>>,
    },

    /// The `this` keyword inside a method.
    This { id: ExprId, keyword: &'a Token<'a> },

    /// `super.method` inside a subclass method.
    Super {
        id: ExprId,
        keyword: &'a Token<'a>,
        method: &'a Token<'a>,
    },
}

/// Parameters and body shared by named functions, methods and lambdas.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl<'a> {
    /// `None` for anonymous functions.
    pub name: Option<&'a Token<'a>>,

    /// Name token, or the `fun` keyword of a lambda; used for error lines.
    pub token: &'a Token<'a>,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<&'a Token<'a>>,

    /// Statements of the body block.
    pub body: Vec<Stmt<'a>>,
}

impl<'a> FunctionDecl<'a> {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn name(&self) -> Option<&'a str> {
        self.name.map(|t| t.lexeme)
    }
}

/// Complete executable constructs.  A program is a sequence of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt<'a> {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr<'a>),

    /// `print` statement used for output.
    Print(Expr<'a>),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: &'a Token<'a>,
        initializer: Option<Expr<'a>>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt<'a>>),

    If {
        condition: Expr<'a>,
        then_branch: Box<Stmt<'a>>,
        else_branch: Option<Box<Stmt<'a>>>,
    },

    /// `while` loop; `for` loops are desugared into this.
    While {
        condition: Expr<'a>,
        body: Box<Stmt<'a>>,
    },

    /// Function declaration, becomes a first‑class callable value.
    Function(FunctionDecl<'a>),

    /// `return` statement inside a function body.
    Return {
        /// The `return` keyword token (for error locations).
        keyword: &'a Token<'a>,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr<'a>>,
    },

    Class {
        name: &'a Token<'a>,

        /// Always an [`Expr::Variable`] when present.
        superclass: Option<Expr<'a>>,

        methods: Vec<FunctionDecl<'a>>,
    },
}
