//! `Function` constructor and `Function.prototype` (ECMA-262 15.3), bounded
//! to `toString` plus the minimal dynamic `new Function(...)` form spec.md
//! §1's "handful of globals" leaves room for (SPEC_FULL §1).

use std::rc::Rc;

use mjs_ast::Node;
use mjs_heap::{Heap, JsStringData, ObjectHandle, Value};
use mjs_parser::parse_program;

use super::{define_constructor, install_native_function, make_constructable_function, Intrinsics};
use crate::agent::Agent;
use crate::error::{ErrorKind, JsResult};
use crate::function::{create_script_function, ScriptClosure};

pub fn install_function_constructor(heap: &mut Heap, intrinsics: &Intrinsics, global: ObjectHandle) {
    let prototype = intrinsics.function_prototype();
    install_native_function(heap, prototype, "toString", 0, |agent, this, _args| {
        let obj = agent.to_object(this)?;
        let text = match agent.heap().object(obj).as_function() {
            Some(f) => f.body_text.to_string(),
            None => return Err(agent.throw_error(ErrorKind::Type, "not a function")),
        };
        let handle = agent.heap_mut().allocate_string(JsStringData::from_str(&text));
        Ok(Value::String(handle))
    });
    let ctor = make_constructable_function(
        heap,
        prototype,
        "Function",
        1,
        |agent, _this, args| Ok(Value::Object(new_function(agent, args)?)),
        |agent, args, _new_target| Ok(Value::Object(new_function(agent, args)?)),
    );
    define_constructor(heap, global, "Function", ctor, prototype);
}

/// `new Function(arg1, ..., argN, body)`: every argument but the last
/// becomes a (comma-joined, then re-split) parameter name, the last
/// becomes the body source. Parsed by wrapping in a parenthesized function
/// expression so the ordinary parser can produce the `FunctionExpr` node
/// directly (the same trick `original_source`'s `Function` constructor
/// uses, per SPEC_FULL §4.3).
fn new_function(agent: &mut Agent, args: &[Value]) -> JsResult<ObjectHandle> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(agent.to_js_string(*arg)?);
    }
    let body = parts.pop().unwrap_or_default();
    let params = parts.join(",");
    let source = format!("(function anonymous({params}\n) {{\n{body}\n}})");

    let (ast, program) = parse_program(&source, "<function>", agent.version())
        .map_err(|e| agent.throw_error(ErrorKind::Syntax, e.to_string()))?;
    // Cloned out of `ast` before it moves into the `Rc` the closure keeps
    // alive: `ScriptClosure::new` wants `&FunctionNode` plus an owned
    // `Rc<Ast>`, and the two can't borrow and move the same `Ast` at once.
    let function_node = {
        let Node::Program { body, .. } = ast.get(program) else {
            unreachable!("parse_program always returns a Program node");
        };
        let Some(&stmt) = body.first() else {
            return Err(agent.throw_error(ErrorKind::Syntax, "Function constructor produced an empty program"));
        };
        let Node::ExprStmt(expr) = ast.get(stmt) else {
            return Err(agent.throw_error(ErrorKind::Syntax, "Function constructor body is not an expression"));
        };
        let Node::FunctionExpr(function_node) = ast.get(*expr) else {
            return Err(agent.throw_error(ErrorKind::Syntax, "Function constructor did not parse to a function"));
        };
        function_node.clone()
    };

    let named_args = function_node.params.len() as u32;
    let is_strict = function_node.is_strict;
    let closure = ScriptClosure::new(Rc::new(ast), &function_node, agent.global_scope.clone());
    Ok(create_script_function(agent, closure, named_args, is_strict, Rc::from(source.as_str())))
}
