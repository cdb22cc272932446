//! Abstract syntax tree types shared by the lexer, parser and evaluator
//! crates: source/version bookkeeping plus the arena-backed [`Node`] graph.

mod node;
mod source;

pub use node::{
    Ast, AssignOp, BinaryOp, ForInBinding, FunctionNode, MemberProp, Node, NodeId, ObjectProperty,
    PostfixOp, PrefixOp, PropertyKey, PropertyKind, SwitchCase,
};
pub use source::{SourceExtend, SourceFile, Version};
