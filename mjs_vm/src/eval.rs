//! `eval` (ECMA-262 15.1.2.1): parses and evaluates a string as program
//! text, either as direct eval (inherits the calling scope chain and
//! strict-mode status) or indirect eval (always runs as global code in the
//! global scope, strict only if the text has its own directive).

use std::rc::Rc;

use mjs_ast::Node;
use mjs_heap::Value;

use crate::agent::Agent;
use crate::error::{ErrorKind, JsResult};
use crate::stmt::run_program_inner;

impl Agent {
    /// Called by the `eval` global function (`builtins::global::install_globals`).
    /// Whether this call is direct was already decided by `expr::evaluate_call`'s
    /// syntactic check and recorded in `self.in_direct_eval`.
    pub fn eval_program(&mut self, source: &str) -> JsResult<Value> {
        let (ast, program) = mjs_parser::parse_program(source, "<eval>", self.version)
            .map_err(|e| self.throw_error(ErrorKind::Syntax, e.to_string()))?;
        let ast = Rc::new(ast);
        debug_assert!(matches!(ast.get(program), Node::Program { .. }));

        if self.in_direct_eval {
            let inherited_strict = self.strict_mode;
            run_program_inner(self, &ast, program, inherited_strict)
        } else {
            let global_scope = self.global_scope.clone();
            self.with_scope(global_scope, |agent| run_program_inner(agent, &ast, program, false))
        }
    }
}
