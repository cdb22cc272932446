//! Tree-walking evaluator and builtins hosting for the mjs ECMAScript
//! interpreter (spec.md §4.4/§4.5). Parses nothing itself — callers hand it
//! an `mjs_ast::Ast` plus a program `NodeId` (typically straight from
//! `mjs_parser::parse_program`) and an [`Agent`] evaluates it against a
//! heap-backed global object and scope chain.
//!
//! The embedding surface is [`Interpreter`] (a thin alias over [`Agent`]):
//! construct one with [`InterpreterConfig`], feed it source with
//! [`Interpreter::evaluate`], and reach into the global object with
//! [`Agent::define_global`]/[`Agent::global_object`].

mod agent;
mod builtins;
mod completion;
mod conversion;
mod error;
mod eval;
mod expr;
mod function;
mod reference;
mod scope;
mod stmt;

use std::rc::Rc;

use mjs_ast::{Ast, NodeId};

pub use agent::{Agent, InterpreterConfig, StatementTraceFn};
pub use completion::{Completion, CompletionKind};
pub use conversion::Hint;
pub use error::{ErrorKind, JsError, JsResult};
pub use reference::{EvalResult, Reference};

/// Alias for [`Agent`] under the name an embedder thinks in terms of.
pub type Interpreter = Agent;

impl Agent {
    /// Parses and runs a complete program as top-level (non-eval) code:
    /// the CLI's and the library embedder's entry point. Equivalent to
    /// pasting `source` into a `<script>` tag — declarations land in the
    /// global object, and the return value is the last expression
    /// statement's value (`undefined` if the program had none). Syntax
    /// errors collapse to a plain message here; an embedder that wants
    /// `mjs_parser`'s full `miette` diagnostic (source span, line/column)
    /// should parse with `mjs_parser::parse_program` itself and call
    /// [`Agent::evaluate_parsed`] instead.
    pub fn evaluate(&mut self, source: &str, filename: &str) -> JsResult<mjs_heap::Value> {
        let (ast, program) = mjs_parser::parse_program(source, filename, self.version())
            .map_err(|e| self.throw_error(ErrorKind::Syntax, e.to_string()))?;
        self.evaluate_parsed(Rc::new(ast), program)
    }

    /// Runs a program already parsed elsewhere.
    pub fn evaluate_parsed(&mut self, ast: Rc<Ast>, program: NodeId) -> JsResult<mjs_heap::Value> {
        stmt::run_program(self, &ast, program)
    }
}
