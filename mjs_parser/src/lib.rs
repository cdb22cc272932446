//! Recursive-descent parser: tokens in, an [`mjs_ast::Ast`] out.

mod error;
mod parser;
mod scope;

pub use error::SyntaxError;
pub use parser::parse_program;
pub use scope::ScopeState;
