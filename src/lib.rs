//! Rox: a tree-walking interpreter for Lox.
//!
//! The pipeline is `scanner → parser → resolver → interpreter`; every stage
//! fails fast with a [`LoxError`](error::LoxError) of its own kind.

pub mod ast;
pub mod ast_printer;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use std::fs::File;
use std::io::Write;
use std::path::Path;

use log::info;
use memmap2::Mmap;

use crate::ast::{Expr, Stmt};
use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::{Locals, Resolver};
use crate::token::Token;

/// Map a source file into memory and decode it as UTF‑8.  A missing or
/// unreadable file is [`LoxError::Io`], bad encoding [`LoxError::Utf8`].
pub fn read_source(path: &Path) -> Result<String> {
    info!("Reading file: {:?}", path);

    let file = File::open(path)?;

    // zero-length mappings are rejected on some platforms
    if file.metadata()?.len() == 0 {
        return Ok(String::new());
    }

    // SAFETY: the file must not be truncated or modified while mapped; the
    // mapping is decoded into an owned string and dropped before returning.
    let mmap = unsafe { Mmap::map(&file) }?;
    let source: String = std::str::from_utf8(&mmap)
        .map_err(LoxError::from)?
        .to_owned();

    info!("Read {} bytes from {:?}", source.len(), path);

    Ok(source)
}

/// Scan, parse and resolve a program without running it.
pub fn check(source: &str) -> Result<()> {
    let tokens: Vec<Token<'_>> = scanner::tokenize(source)?;
    let statements: Vec<Stmt<'_>> = Parser::new(&tokens).parse()?;
    Resolver::new().resolve(&statements)?;

    Ok(())
}

/// Run a whole program, sending `print` output to `out`.
pub fn run<W: Write>(source: &str, out: W) -> Result<()> {
    let tokens: Vec<Token<'_>> = scanner::tokenize(source)?;
    let statements: Vec<Stmt<'_>> = Parser::new(&tokens).parse()?;
    let locals: Locals = Resolver::new().resolve(&statements)?;

    info!("Program parsed and resolved, executing");

    let mut interpreter = Interpreter::with_output(out);
    interpreter.add_locals(locals);
    interpreter.interpret(&statements)
}

/// Evaluate a single expression and render its value.
pub fn evaluate(source: &str) -> Result<String> {
    let tokens: Vec<Token<'_>> = scanner::tokenize(source)?;
    let expr: Expr<'_> = Parser::new(&tokens).parse_expression()?;
    let locals: Locals = Resolver::new().resolve_expression(&expr)?;

    let mut interpreter = Interpreter::new();
    interpreter.add_locals(locals);
    let value = interpreter.evaluate_expression(&expr)?;

    Ok(value.to_string())
}
