//! Statement evaluation (spec.md §4.4's evaluator component, statement
//! list): one function per [`Node`] statement variant, producing a
//! [`Completion`]. Hoisting runs once per statement list — `var` names and
//! top-level function definitions are installed on the current activation
//! object before any statement in the list actually executes.

use std::rc::Rc;

use mjs_ast::{Ast, ForInBinding, FunctionNode, Node, NodeId, SwitchCase};
use mjs_heap::{property_key, Attributes, JsObjectData, JsStringData, ObjectHandle, PropertySlot, Value};

use crate::agent::Agent;
use crate::completion::{Completion, CompletionKind};
use crate::error::{JsError, JsResult};
use crate::expr::{evaluate_expr, evaluate_expr_value};
use crate::function::{create_script_function, ScriptClosure};
use crate::reference::EvalResult;
use crate::scope::Scope;

/// Runs a parsed program's top-level statement list: hoists into the
/// current scope's activation, executes every statement in order, and
/// returns the last expression statement's value (used by `eval`'s return
/// value and the CLI's program-completion exit code).
pub fn run_program(agent: &mut Agent, ast: &Rc<Ast>, program: NodeId) -> JsResult<Value> {
    run_program_inner(agent, ast, program, false)
}

/// `run_program`, plus an `inherited_strict` flag ORed into the program's
/// own strictness. Used by direct `eval` (ECMA-262 10.1.1): eval code
/// without its own `"use strict"` prologue is still strict when the
/// calling context already is.
pub(crate) fn run_program_inner(agent: &mut Agent, ast: &Rc<Ast>, program: NodeId, inherited_strict: bool) -> JsResult<Value> {
    let Node::Program { body, strict } = ast.get(program) else {
        unreachable!("run_program called on a non-Program node");
    };
    let body = body.clone();
    let strict = *strict || inherited_strict;
    hoist(agent, ast, &body);
    let mut last_value = Value::Undefined;
    let completion = agent.with_strict_mode(strict, |agent| run_statement_list(agent, ast, &body, &mut last_value))?;
    match completion.kind {
        CompletionKind::Return => Ok(completion.value),
        _ => Ok(last_value),
    }
}

/// Runs a function body (always a `Block`): hoists into the caller-created
/// activation, then executes. Called from `crate::function::invoke`.
pub(crate) fn run_function_body(agent: &mut Agent, ast: &Rc<Ast>, body: NodeId) -> JsResult<Completion> {
    let Node::Block { body, .. } = ast.get(body) else {
        unreachable!("a function's body node is always a Block");
    };
    let body = body.clone();
    hoist(agent, ast, &body);
    let mut last_value = Value::Undefined;
    run_statement_list(agent, ast, &body, &mut last_value)
}

fn run_statement_list(agent: &mut Agent, ast: &Rc<Ast>, stmts: &[NodeId], last_value: &mut Value) -> JsResult<Completion> {
    for &stmt in stmts {
        let completion = run_statement(agent, ast, stmt, last_value)?;
        if completion.is_abrupt() {
            return Ok(completion);
        }
    }
    Ok(Completion::normal(*last_value))
}

fn run_statement(agent: &mut Agent, ast: &Rc<Ast>, node: NodeId, last_value: &mut Value) -> JsResult<Completion> {
    if let Some(extend) = ast.extend(node) {
        agent.trace_statement(extend);
    }
    agent.maybe_collect(&mut [&mut *last_value]);
    match ast.get(node) {
        Node::Block { body, .. } => {
            let body = body.clone();
            hoist(agent, ast, &body);
            run_statement_list(agent, ast, &body, last_value)
        }
        Node::VarDecl(decls) => {
            let decls = decls.clone();
            for (name, init) in &decls {
                if matches!(ast.get(*init), Node::Empty) {
                    continue;
                }
                let value = evaluate_expr_value(agent, ast, *init)?;
                let reference = agent.resolve_identifier(name);
                agent.put_value(reference, value)?;
            }
            Ok(Completion::normal(*last_value))
        }
        Node::Debugger => Ok(Completion::normal(*last_value)),
        Node::ExprStmt(expr) => {
            *last_value = evaluate_expr_value(agent, ast, *expr)?;
            Ok(Completion::normal(*last_value))
        }
        Node::If { test, consequent, alternate } => {
            let (test, consequent, alternate) = (*test, *consequent, *alternate);
            let test_value = evaluate_expr_value(agent, ast, test)?;
            if agent.to_boolean(test_value) {
                run_statement(agent, ast, consequent, last_value)
            } else if !matches!(ast.get(alternate), Node::Empty) {
                run_statement(agent, ast, alternate, last_value)
            } else {
                Ok(Completion::normal(*last_value))
            }
        }
        Node::DoWhile { body, test } => run_do_while(agent, ast, *body, *test, last_value, &[]),
        Node::While { test, body } => run_while(agent, ast, *test, *body, last_value, &[]),
        Node::For { init, test, update, body } => {
            let (init, test, update, body) = (*init, *test, *update, *body);
            run_for(agent, ast, init, test, update, body, last_value, &[])
        }
        Node::ForIn { binding, object, body } => {
            let (binding, object, body) = (binding.clone(), *object, *body);
            run_for_in(agent, ast, &binding, object, body, last_value, &[])
        }
        Node::Continue(label) => Ok(Completion::continue_(label.clone().map(Rc::from))),
        Node::Break(label) => Ok(Completion::break_(label.clone().map(Rc::from))),
        Node::Return(expr) => {
            let expr = *expr;
            let value = if matches!(ast.get(expr), Node::Empty) {
                Value::Undefined
            } else {
                evaluate_expr_value(agent, ast, expr)?
            };
            Ok(Completion::return_(value))
        }
        Node::With { object, body } => {
            let (object, body) = (*object, *body);
            run_with(agent, ast, object, body, last_value)
        }
        Node::Labelled { label, body } => {
            let (label, body) = (Rc::from(label.as_str()), *body);
            run_labelled(agent, ast, label, body, last_value)
        }
        Node::Switch { discriminant, cases } => {
            let (discriminant, cases) = (*discriminant, cases.clone());
            run_switch(agent, ast, discriminant, &cases, last_value, &[])
        }
        Node::Throw(expr) => {
            let value = evaluate_expr_value(agent, ast, *expr)?;
            Err(JsError::new(value))
        }
        Node::Try { block, handler, finalizer } => {
            let (block, handler, finalizer) = (*block, handler.clone(), *finalizer);
            run_try(agent, ast, block, handler.as_ref(), finalizer, last_value)
        }
        // Already bound during hoisting; executing one is a no-op.
        Node::FunctionDecl(_) => Ok(Completion::normal(*last_value)),
        _ => unreachable!("run_statement called on a non-statement node"),
    }
}

/// Runs `body` under a loop's label set, translating an `unlabelled` or
/// matching-label `break`/`continue` into loop control rather than letting
/// it propagate further outward.
fn run_loop_body(
    agent: &mut Agent,
    ast: &Rc<Ast>,
    body: NodeId,
    last_value: &mut Value,
    labels: &[Rc<str>],
) -> JsResult<Option<Completion>> {
    let completion = run_statement(agent, ast, body, last_value)?;
    match completion.kind {
        CompletionKind::Normal => Ok(None),
        CompletionKind::Break if completion.targets(labels) => Ok(Some(Completion::normal(*last_value))),
        CompletionKind::Continue if completion.targets(labels) => Ok(None),
        _ => Ok(Some(completion)),
    }
}

fn run_while(agent: &mut Agent, ast: &Rc<Ast>, test: NodeId, body: NodeId, last_value: &mut Value, labels: &[Rc<str>]) -> JsResult<Completion> {
    loop {
        let test_value = evaluate_expr_value(agent, ast, test)?;
        if !agent.to_boolean(test_value) {
            return Ok(Completion::normal(*last_value));
        }
        if let Some(completion) = run_loop_body(agent, ast, body, last_value, labels)? {
            return Ok(completion);
        }
    }
}

fn run_do_while(agent: &mut Agent, ast: &Rc<Ast>, body: NodeId, test: NodeId, last_value: &mut Value, labels: &[Rc<str>]) -> JsResult<Completion> {
    loop {
        if let Some(completion) = run_loop_body(agent, ast, body, last_value, labels)? {
            return Ok(completion);
        }
        let test_value = evaluate_expr_value(agent, ast, test)?;
        if !agent.to_boolean(test_value) {
            return Ok(Completion::normal(*last_value));
        }
    }
}

fn run_for(
    agent: &mut Agent,
    ast: &Rc<Ast>,
    init: NodeId,
    test: NodeId,
    update: NodeId,
    body: NodeId,
    last_value: &mut Value,
    labels: &[Rc<str>],
) -> JsResult<Completion> {
    if !matches!(ast.get(init), Node::Empty) {
        if matches!(ast.get(init), Node::VarDecl(_)) {
            run_statement(agent, ast, init, last_value)?;
        } else {
            evaluate_expr_value(agent, ast, init)?;
        }
    }
    loop {
        if !matches!(ast.get(test), Node::Empty) {
            let test_value = evaluate_expr_value(agent, ast, test)?;
            if !agent.to_boolean(test_value) {
                return Ok(Completion::normal(*last_value));
            }
        }
        if let Some(completion) = run_loop_body(agent, ast, body, last_value, labels)? {
            return Ok(completion);
        }
        if !matches!(ast.get(update), Node::Empty) {
            evaluate_expr_value(agent, ast, update)?;
        }
    }
}

/// `for (x in obj)` / `for (var x in obj)` (ECMA-262 12.6.4): enumerates
/// `obj`'s own and inherited enumerable string property names in
/// insertion order, rebinding `x` to each in turn. `undefined`/`null`
/// short-circuit to a no-op loop (ES5 relaxation spec.md §4.4 notes).
fn run_for_in(
    agent: &mut Agent,
    ast: &Rc<Ast>,
    binding: &ForInBinding,
    object: NodeId,
    body: NodeId,
    last_value: &mut Value,
    labels: &[Rc<str>],
) -> JsResult<Completion> {
    let object_value = evaluate_expr_value(agent, ast, object)?;
    if matches!(object_value, Value::Undefined | Value::Null) {
        return Ok(Completion::normal(*last_value));
    }
    let obj = agent.to_object(object_value)?;
    let names = enumerable_property_names(agent, obj);
    for name in names {
        let value = Value::String(agent.heap_mut().allocate_string(JsStringData::from_str(&name)));
        match binding {
            ForInBinding::Var(name) => {
                let reference = agent.resolve_identifier(name);
                agent.put_value(reference, value)?;
            }
            ForInBinding::Pattern(target) => {
                let reference = evaluate_expr(agent, ast, *target)?;
                let EvalResult::Ref(reference) = reference else {
                    return Err(agent.throw_error(crate::error::ErrorKind::Reference, "invalid for-in binding target"));
                };
                agent.put_value(reference, value)?;
            }
        }
        if let Some(completion) = run_loop_body(agent, ast, body, last_value, labels)? {
            return Ok(completion);
        }
    }
    Ok(Completion::normal(*last_value))
}

/// Own enumerable keys first (insertion order), then each prototype's own
/// enumerable keys in turn, skipping any name already yielded by a
/// closer object (ECMA-262 12.6.4's "not already visited" rule).
fn enumerable_property_names(agent: &Agent, obj: ObjectHandle) -> Vec<Rc<str>> {
    let mut seen = std::collections::HashSet::new();
    let mut names = Vec::new();
    let mut current = Some(obj);
    while let Some(o) = current {
        for (key, slot) in agent.heap().object(o).properties.iter() {
            if slot.attributes.is_dont_enum() || slot.attributes.is_internal() {
                continue;
            }
            let name: Rc<str> = Rc::from(key.as_ref());
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
        current = agent.heap().prototype_of(o);
    }
    names
}

/// `with (obj) stmt` (ECMA-262 12.10): pushes `ToObject(obj)` as a scope
/// layer with no parent-less activation of its own — identifier lookup
/// inside `stmt` checks `obj`'s properties before falling through to the
/// enclosing scope. Disallowed in strict mode by the parser (spec.md
/// §4.3), so the evaluator need not re-check here.
fn run_with(agent: &mut Agent, ast: &Rc<Ast>, object: NodeId, body: NodeId, last_value: &mut Value) -> JsResult<Completion> {
    let object_value = evaluate_expr_value(agent, ast, object)?;
    let obj = agent.to_object(object_value)?;
    let tracked = agent.heap_mut().track_object(obj);
    let scope = Scope::new(tracked, Some(agent.scope().clone()));
    agent.with_scope(scope, |agent| run_statement(agent, ast, body, last_value))
}

/// A label attaches to the statement it decorates; loops and `switch`
/// consult the *enclosing* label set (accumulated by nested `Labelled`
/// wrappers) to decide whether a `break`/`continue` targeting that label
/// belongs to them, rather than `Labelled` itself intercepting control
/// flow.
fn run_labelled(agent: &mut Agent, ast: &Rc<Ast>, label: Rc<str>, body: NodeId, last_value: &mut Value) -> JsResult<Completion> {
    let labels = vec![label.clone()];
    let completion = agent.with_labels(labels, |agent| run_labelled_body(agent, ast, body, last_value))?;
    match completion.kind {
        CompletionKind::Break if completion.targets(std::slice::from_ref(&label)) => Ok(Completion::normal(*last_value)),
        _ => Ok(completion),
    }
}

/// Dispatches a labelled statement's body directly to the loop/switch
/// runners with the accumulated label set when it is itself a looping or
/// switch construct (so `continue label` can reach it), otherwise falls
/// back to plain statement evaluation.
fn run_labelled_body(agent: &mut Agent, ast: &Rc<Ast>, body: NodeId, last_value: &mut Value) -> JsResult<Completion> {
    let labels = agent.label_set.clone();
    match ast.get(body) {
        Node::While { test, body: inner } => run_while(agent, ast, *test, *inner, last_value, &labels),
        Node::DoWhile { body: inner, test } => run_do_while(agent, ast, *inner, *test, last_value, &labels),
        Node::For { init, test, update, body: inner } => {
            let (init, test, update, inner) = (*init, *test, *update, *inner);
            run_for(agent, ast, init, test, update, inner, last_value, &labels)
        }
        Node::ForIn { binding, object, body: inner } => {
            let (binding, object, inner) = (binding.clone(), *object, *inner);
            run_for_in(agent, ast, &binding, object, inner, last_value, &labels)
        }
        Node::Switch { discriminant, cases } => {
            let (discriminant, cases) = (*discriminant, cases.clone());
            run_switch(agent, ast, discriminant, &cases, last_value, &labels)
        }
        Node::Labelled { label, body: inner } => run_labelled(agent, ast, Rc::from(label.as_str()), *inner, last_value),
        _ => run_statement(agent, ast, body, last_value),
    }
}

/// `switch` (ECMA-262 12.11): evaluates the discriminant once, then tries
/// `===`-matching `case` tests top to bottom; on no match, falls into the
/// `default` clause if present (continuing execution from there through
/// any later cases, "fallthrough" style); `break` (with no or a matching
/// label) exits the whole construct.
fn run_switch(
    agent: &mut Agent,
    ast: &Rc<Ast>,
    discriminant: NodeId,
    cases: &[SwitchCase],
    last_value: &mut Value,
    labels: &[Rc<str>],
) -> JsResult<Completion> {
    let discriminant_value = evaluate_expr_value(agent, ast, discriminant)?;
    let body: Vec<NodeId> = cases.iter().flat_map(|c| c.body.iter().copied()).collect();
    hoist(agent, ast, &body);

    let mut start = None;
    for (i, case) in cases.iter().enumerate() {
        if let Some(test) = case.test {
            let test_value = evaluate_expr_value(agent, ast, test)?;
            if agent.strict_equals(discriminant_value, test_value) {
                start = Some(i);
                break;
            }
        }
    }
    let start = start.or_else(|| cases.iter().position(|c| c.test.is_none()));
    let Some(start) = start else {
        return Ok(Completion::normal(*last_value));
    };

    for case in &cases[start..] {
        for &stmt in &case.body {
            let completion = run_statement(agent, ast, stmt, last_value)?;
            if completion.is_abrupt() {
                return match completion.kind {
                    CompletionKind::Break if completion.targets(labels) => Ok(Completion::normal(*last_value)),
                    _ => Ok(completion),
                };
            }
        }
    }
    Ok(Completion::normal(*last_value))
}

/// `try`/`catch`/`finally` (ECMA-262 12.14): the `finally` clause, if
/// present, always runs, and its own abrupt completion overrides whatever
/// the `try`/`catch` portion produced (including a `throw` propagating as
/// `Err` — caught here, converted to a completion, and allowed to be
/// replaced by `finally`'s outcome).
fn run_try(
    agent: &mut Agent,
    ast: &Rc<Ast>,
    block: NodeId,
    handler: Option<&(String, NodeId)>,
    finalizer: Option<NodeId>,
    last_value: &mut Value,
) -> JsResult<Completion> {
    let result = run_statement(agent, ast, block, last_value);
    let mut outcome = match (result, handler) {
        (Ok(completion), _) => Ok(completion),
        (Err(err), Some((param, catch_body))) => {
            run_catch(agent, ast, param, *catch_body, err.value(), last_value)
        }
        (Err(err), None) => Err(err),
    };

    if let Some(finalizer) = finalizer {
        let finally_result = run_statement(agent, ast, finalizer, last_value);
        match finally_result {
            Ok(completion) if completion.is_abrupt() => outcome = Ok(completion),
            Ok(_) => {}
            Err(err) => outcome = Err(err),
        }
    }

    outcome
}

fn run_catch(
    agent: &mut Agent,
    ast: &Rc<Ast>,
    param: &str,
    catch_body: NodeId,
    thrown: Value,
    last_value: &mut Value,
) -> JsResult<Completion> {
    let object_prototype = agent.intrinsics.object_prototype();
    let activation_data = JsObjectData::new("Object", Value::Object(object_prototype).to_representation());
    let activation_handle = agent.heap_mut().allocate_object(activation_data);
    agent
        .heap_mut()
        .define_own_property(
            activation_handle,
            property_key(param),
            PropertySlot::data(thrown.to_representation(), Attributes::new(Attributes::DONT_DELETE)),
        )
        .ok();
    let activation = agent.heap_mut().track_object(activation_handle);
    let scope = Scope::new(activation, Some(agent.scope().clone()));
    agent.with_scope(scope, |agent| run_statement(agent, ast, catch_body, last_value))
}

/// Scans a statement list for `var` names and top-level function
/// definitions and installs both on the current activation object
/// (spec.md §4.4 "Hoisting"). Descends into every statement-shaped
/// construct except a nested function's own body, which hoists itself
/// when invoked.
fn hoist(agent: &mut Agent, ast: &Rc<Ast>, body: &[NodeId]) {
    let activation = agent.scope().activation();
    let mut names = Vec::new();
    for &stmt in body {
        collect_var_names(ast, stmt, &mut names);
    }
    for name in names {
        if agent.heap().get_own_property(activation, &property_key(name.as_str())).is_none() {
            agent
                .heap_mut()
                .define_own_property(
                    activation,
                    property_key(name.as_str()),
                    PropertySlot::data(Value::Undefined.to_representation(), Attributes::new(Attributes::DONT_DELETE)),
                )
                .ok();
        }
    }
    for &stmt in body {
        if let Node::FunctionDecl(function_node) = ast.get(stmt) {
            declare_function(agent, ast, activation, stmt, function_node);
        }
    }
}

fn collect_var_names(ast: &Ast, node: NodeId, names: &mut Vec<String>) {
    match ast.get(node) {
        Node::VarDecl(decls) => names.extend(decls.iter().map(|(name, _)| name.clone())),
        Node::Block { body, .. } => {
            for &stmt in body {
                collect_var_names(ast, stmt, names);
            }
        }
        Node::If { consequent, alternate, .. } => {
            collect_var_names(ast, *consequent, names);
            collect_var_names(ast, *alternate, names);
        }
        Node::DoWhile { body, .. } | Node::While { body, .. } => collect_var_names(ast, *body, names),
        Node::For { init, body, .. } => {
            collect_var_names(ast, *init, names);
            collect_var_names(ast, *body, names);
        }
        Node::ForIn { binding, body, .. } => {
            if let ForInBinding::Var(name) = binding {
                names.push(name.clone());
            }
            collect_var_names(ast, *body, names);
        }
        Node::With { body, .. } => collect_var_names(ast, *body, names),
        Node::Labelled { body, .. } => collect_var_names(ast, *body, names),
        Node::Switch { cases, .. } => {
            for case in cases {
                for &stmt in &case.body {
                    collect_var_names(ast, stmt, names);
                }
            }
        }
        Node::Try { block, handler, finalizer } => {
            collect_var_names(ast, *block, names);
            if let Some((_, catch_body)) = handler {
                collect_var_names(ast, *catch_body, names);
            }
            if let Some(finalizer) = finalizer {
                collect_var_names(ast, *finalizer, names);
            }
        }
        // Function declarations/expressions hoist their own parameters
        // and body-internal vars when invoked; their *name* is handled by
        // `hoist`'s separate function-declaration pass, not here.
        _ => {}
    }
}

/// Idempotent per spec.md §4.4: the first function declaration for a
/// given name in this block wins and is (re)bound; a later declaration of
/// the same name (only possible via the parser producing duplicate
/// top-level names, e.g. `annex B`-style re-declaration) is skipped so it
/// doesn't clobber a value the first binding's closure may already be
/// referenced by.
fn declare_function(agent: &mut Agent, ast: &Rc<Ast>, activation: ObjectHandle, stmt: NodeId, function_node: &FunctionNode) {
    let Some(name) = &function_node.name else {
        return;
    };
    if !agent.scope().mark_function_definition_active(name) {
        return;
    }
    let closure = ScriptClosure::new(ast.clone(), function_node, agent.scope().clone());
    let named_args = function_node.params.len() as u32;
    let is_strict = function_node.is_strict;
    let body_text = ast.extend(stmt).map(|e| e.text().to_string()).unwrap_or_default();
    let handle = create_script_function(agent, closure, named_args, is_strict, Rc::from(body_text.as_str()));
    agent
        .heap_mut()
        .define_own_property(
            activation,
            property_key(name.as_str()),
            PropertySlot::data(Value::Object(handle).to_representation(), Attributes::new(Attributes::DONT_DELETE)),
        )
        .ok();
}

#[cfg(test)]
mod tests {
    use crate::agent::{Agent, InterpreterConfig};

    fn run(source: &str) -> Value {
        let mut agent = Agent::new(InterpreterConfig::default());
        agent.evaluate(source, "<test>").unwrap_or_else(|err| panic!("{}", agent.to_js_string(err.value()).unwrap_or_default()))
    }

    use super::Value;

    #[test]
    fn function_call_sums_arguments() {
        let v = run("function f(a,b){return a+b;} f(2,3)");
        assert_eq!(v, Value::Number(5.0));
    }

    #[test]
    fn array_elision_leaves_a_hole() {
        let v = run("a=[1,,3]; a.length*10 + (a[1]===undefined ? 1 : 0)");
        assert_eq!(v, Value::Number(31.0));
    }

    #[test]
    fn null_property_access_throws_type_error() {
        let mut agent = Agent::new(InterpreterConfig::default());
        let v = agent
            .evaluate("try { null.x } catch (e) { e.name + ':' + typeof e.message }", "<test>")
            .unwrap();
        let s = agent.to_js_string(v).unwrap();
        assert_eq!(s, "TypeError:string");
    }

    #[test]
    fn for_loop_accumulates() {
        let v = run("(function(){var x=0; for (var i=0;i<10;++i) x+=i; return x;})()");
        assert_eq!(v, Value::Number(45.0));
    }

    #[test]
    fn strict_function_this_is_undefined() {
        let v = run("(function(){'use strict'; return this;})()");
        assert_eq!(v, Value::Undefined);
    }

    #[test]
    fn direct_eval_shares_scope_indirect_eval_is_global() {
        let mut agent = Agent::new(InterpreterConfig::default());
        let v = agent.evaluate("var x=1; eval('var x=2'); x", "<test>").unwrap();
        assert_eq!(v, Value::Number(2.0));

        let v = agent.evaluate("(0,eval)('var y=3'); y", "<test>").unwrap();
        assert_eq!(v, Value::Number(3.0));
    }
}
