//! Expression evaluation (spec.md §4.4's evaluator component, operation
//! list): one function per [`Node`] expression variant, producing an
//! [`EvalResult`] that callers resolve through `Agent::get_value`/
//! `put_value` rather than a bare [`Value`] — this is what lets
//! `typeof`/`delete`/assignment targets and increment/decrement operate on
//! the *reference*, not its current value.

use std::rc::Rc;

use mjs_ast::{
    Ast, AssignOp, BinaryOp, FunctionNode, MemberProp, Node, NodeId, ObjectProperty, PostfixOp, PrefixOp,
    PropertyKey as AstPropertyKey, PropertyKind,
};
use mjs_heap::{
    property_key, ArrayData, Attributes, JsObjectData, JsStringData, ObjectHandle, ObjectKind, PropertyKey,
    PropertySlot, PropertyValue, Representation, Value,
};

use crate::agent::Agent;
use crate::error::{ErrorKind, JsResult};
use crate::function::{create_script_function, ScriptClosure};
use crate::reference::{EvalResult, Reference};

pub fn evaluate_expr(agent: &mut Agent, ast: &Rc<Ast>, node: NodeId) -> JsResult<EvalResult> {
    match ast.get(node) {
        Node::This => {
            let reference = agent.resolve_identifier("this");
            Ok(EvalResult::value(agent.get_value(EvalResult::reference(reference))?))
        }
        Node::Identifier(name) => Ok(EvalResult::reference(agent.resolve_identifier(name))),
        Node::NumberLiteral(n) => Ok(EvalResult::value(Value::Number(*n))),
        Node::StringLiteral(s) => {
            let handle = agent.heap_mut().allocate_string(JsStringData::from_str(s));
            Ok(EvalResult::value(Value::String(handle)))
        }
        Node::BooleanLiteral(b) => Ok(EvalResult::value(Value::Boolean(*b))),
        Node::NullLiteral => Ok(EvalResult::value(Value::Null)),
        Node::ArrayLiteral(elements) => evaluate_array_literal(agent, ast, elements),
        Node::ObjectLiteral(properties) => evaluate_object_literal(agent, ast, properties),
        Node::RegExpLiteral { pattern, flags } => evaluate_regexp_literal(agent, pattern, flags),
        Node::FunctionExpr(function_node) => {
            let body_text = ast.extend(node).map(|e| e.text().to_string()).unwrap_or_default();
            let closure = ScriptClosure::new(ast.clone(), function_node, agent.scope().clone());
            let named_args = function_node.params.len() as u32;
            let is_strict = function_node.is_strict;
            let handle = create_script_function(agent, closure, named_args, is_strict, Rc::from(body_text.as_str()));
            Ok(EvalResult::value(Value::Object(handle)))
        }
        Node::Member { object, property } => evaluate_member(agent, ast, *object, property),
        Node::Call { callee, args } => evaluate_call(agent, ast, *callee, args),
        Node::New { callee, args } => evaluate_new(agent, ast, *callee, args),
        Node::Prefix { op, operand } => evaluate_prefix(agent, ast, *op, *operand),
        Node::Postfix { op, operand } => evaluate_postfix(agent, ast, *op, *operand),
        Node::Binary { op, left, right } => evaluate_binary(agent, ast, *op, *left, *right),
        Node::Assignment { op, target, value } => evaluate_assignment(agent, ast, *op, *target, *value),
        Node::Conditional { test, consequent, alternate } => {
            let test = evaluate_expr_value(agent, ast, *test)?;
            if agent.to_boolean(test) {
                evaluate_expr(agent, ast, *consequent)
            } else {
                evaluate_expr(agent, ast, *alternate)
            }
        }
        Node::Sequence(exprs) => {
            let mut last = Value::Undefined;
            for &expr in exprs {
                last = evaluate_expr_value(agent, ast, expr)?;
            }
            Ok(EvalResult::value(last))
        }
        _ => unreachable!("evaluate_expr called on a non-expression node"),
    }
}

/// Convenience wrapper: evaluate then immediately resolve through
/// `GetValue`, for the overwhelming majority of call sites that never
/// need the bare reference.
pub fn evaluate_expr_value(agent: &mut Agent, ast: &Rc<Ast>, node: NodeId) -> JsResult<Value> {
    let result = evaluate_expr(agent, ast, node)?;
    agent.get_value(result)
}

fn evaluate_array_literal(agent: &mut Agent, ast: &Rc<Ast>, elements: &[NodeId]) -> JsResult<EvalResult> {
    let mut array = ArrayData::default();
    for (i, &el) in elements.iter().enumerate() {
        if matches!(ast.get(el), Node::Empty) {
            continue;
        }
        let value = evaluate_expr_value(agent, ast, el)?;
        array.set(i as u32, value.to_representation());
    }
    array.truncate(elements.len() as u32);
    let prototype = Value::Object(agent.intrinsics.array_prototype()).to_representation();
    let mut data = JsObjectData::new("Array", prototype);
    data.kind = ObjectKind::Array(array);
    let handle = agent.heap_mut().allocate_object(data);
    Ok(EvalResult::value(Value::Object(handle)))
}

fn property_key_text(agent: &mut Agent, key: &AstPropertyKey) -> JsResult<String> {
    Ok(match key {
        AstPropertyKey::Identifier(name) | AstPropertyKey::String(name) => name.clone(),
        AstPropertyKey::Number(n) => agent.to_js_string(Value::Number(*n))?,
    })
}

/// Object literals merge a `get`/`set` pair sharing the same key into one
/// accessor property (ECMA-262 11.1.5); a later `Init` for the same key
/// simply overwrites the earlier entry, matching normal object insertion
/// order rather than raising (ES5 non-strict behavior; strict mode's
/// duplicate-property restriction is a parser-level concern, not the
/// evaluator's).
fn evaluate_object_literal(agent: &mut Agent, ast: &Rc<Ast>, properties: &[ObjectProperty]) -> JsResult<EvalResult> {
    let proto = Value::Object(agent.intrinsics.object_prototype()).to_representation();
    let handle = agent.heap_mut().allocate_object(JsObjectData::new("Object", proto));
    for prop in properties {
        let name = property_key_text(agent, &prop.key)?;
        let key = property_key(&name);
        match &prop.kind {
            PropertyKind::Init(value_node) => {
                let value = evaluate_expr_value(agent, ast, *value_node)?;
                agent
                    .heap_mut()
                    .define_own_property(
                        handle,
                        key,
                        PropertySlot::data(value.to_representation(), Attributes::writable_enumerable_configurable()),
                    )
                    .ok();
            }
            PropertyKind::Get(body) => {
                let function_node = body_as_function(ast, *body);
                let closure = ScriptClosure::new(ast.clone(), function_node, agent.scope().clone());
                let getter = create_script_function(agent, closure, 0, function_node.is_strict, Rc::from(""));
                merge_accessor(agent, handle, key, Some(getter), None);
            }
            PropertyKind::Set(body) => {
                let function_node = body_as_function(ast, *body);
                let closure = ScriptClosure::new(ast.clone(), function_node, agent.scope().clone());
                let setter = create_script_function(agent, closure, 1, function_node.is_strict, Rc::from(""));
                merge_accessor(agent, handle, key, None, Some(setter));
            }
        }
    }
    Ok(EvalResult::value(Value::Object(handle)))
}

fn body_as_function(ast: &Ast, node: NodeId) -> &FunctionNode {
    match ast.get(node) {
        Node::FunctionExpr(f) => f,
        _ => unreachable!("object literal accessor body is always a FunctionExpr node"),
    }
}

fn merge_accessor(
    agent: &mut Agent,
    obj: ObjectHandle,
    key: PropertyKey,
    get: Option<ObjectHandle>,
    set: Option<ObjectHandle>,
) {
    let existing = agent.heap().get_own_property(obj, &key);
    let (existing_get, existing_set) = match existing.map(|s| s.value) {
        Some(PropertyValue::Accessor { get, set }) => (
            Value::from_representation(get).as_object(),
            Value::from_representation(set).as_object(),
        ),
        _ => (None, None),
    };
    let get = get.or(existing_get);
    let set = set.or(existing_set);
    let get_repr = get.map(Value::Object).unwrap_or(Value::Undefined).to_representation();
    let set_repr = set.map(Value::Object).unwrap_or(Value::Undefined).to_representation();
    // A getter-only accessor (no setter) must carry `read_only` itself
    // (spec.md §3.4's invariant) — the engine maintains this, it doesn't
    // just validate it, or a getter-only property would get silently
    // rejected by `define_own_property`.
    let mut attrs = Attributes::new(Attributes::DONT_ENUM);
    if set_repr == Representation::UNDEFINED {
        attrs = attrs.with(Attributes::READ_ONLY);
    }
    agent
        .heap_mut()
        .define_own_property(obj, key, PropertySlot::accessor(get_repr, set_repr, attrs))
        .ok();
}

/// `RegExp` literals are recognized and given an object shell (`source`/
/// `flags` own properties) with no matching engine behind them — spec.md
/// §1 excludes `RegExp` matching entirely; this just keeps `/x/i` from
/// being a parse or evaluation error.
fn evaluate_regexp_literal(agent: &mut Agent, pattern: &str, flags: &str) -> JsResult<EvalResult> {
    let proto = Value::Object(agent.intrinsics.object_prototype()).to_representation();
    let handle = agent.heap_mut().allocate_object(JsObjectData::new("RegExp", proto));
    let source_handle = agent.heap_mut().allocate_string(JsStringData::from_str(pattern));
    let flags_handle = agent.heap_mut().allocate_string(JsStringData::from_str(flags));
    agent
        .heap_mut()
        .define_own_property(
            handle,
            property_key("source"),
            PropertySlot::data(Value::String(source_handle).to_representation(), Attributes::sealed()),
        )
        .ok();
    agent
        .heap_mut()
        .define_own_property(
            handle,
            property_key("flags"),
            PropertySlot::data(Value::String(flags_handle).to_representation(), Attributes::sealed()),
        )
        .ok();
    Ok(EvalResult::value(Value::Object(handle)))
}

fn evaluate_member(agent: &mut Agent, ast: &Rc<Ast>, object: NodeId, property: &MemberProp) -> JsResult<EvalResult> {
    let base = evaluate_expr_value(agent, ast, object)?;
    let name = match property {
        MemberProp::Identifier(name) => property_key(name),
        MemberProp::Computed(expr) => {
            let key_value = evaluate_expr_value(agent, ast, *expr)?;
            agent.to_property_key(key_value)?
        }
    };
    Ok(EvalResult::reference(Reference::Property {
        base,
        name,
        strict: agent.strict_mode,
    }))
}

/// `f(...)` (ECMA-262 11.2.3): a `Member` callee evaluates its base
/// separately so `this` is bound to it; a direct call to the global
/// `eval` identifier (not `x.eval(...)`, not through an alias) sets
/// `Agent::in_direct_eval` for the duration of the call, letting `eval`
/// itself decide whether to run in the caller's scope.
fn evaluate_call(agent: &mut Agent, ast: &Rc<Ast>, callee: NodeId, args: &[NodeId]) -> JsResult<EvalResult> {
    let (function, this) = match ast.get(callee) {
        Node::Member { object, property } => {
            let base = evaluate_expr_value(agent, ast, *object)?;
            let name = match property {
                MemberProp::Identifier(name) => property_key(name),
                MemberProp::Computed(expr) => {
                    let key_value = evaluate_expr_value(agent, ast, *expr)?;
                    agent.to_property_key(key_value)?
                }
            };
            let obj = agent.to_object(base)?;
            (agent.get_property(obj, &name, base)?, base)
        }
        _ => {
            let result = evaluate_expr(agent, ast, callee)?;
            let this = match &result {
                EvalResult::Ref(Reference::Property { base, .. }) => *base,
                _ => Value::Undefined,
            };
            (agent.get_value(result)?, this)
        }
    };
    let mut arg_values = Vec::with_capacity(args.len());
    for &arg in args {
        arg_values.push(evaluate_expr_value(agent, ast, arg)?);
    }
    let callee_obj = function
        .as_object()
        .ok_or_else(|| agent.throw_error(ErrorKind::Type, "value is not callable"))?;

    let is_direct_eval = matches!(ast.get(callee), Node::Identifier(name) if name == "eval")
        && function.as_object() == Some(agent.intrinsics.global_eval());
    if is_direct_eval {
        let previous = agent.in_direct_eval;
        agent.in_direct_eval = true;
        let result = agent.call_function(callee_obj, this, &arg_values);
        agent.in_direct_eval = previous;
        Ok(EvalResult::value(result?))
    } else {
        Ok(EvalResult::value(agent.call_function(callee_obj, this, &arg_values)?))
    }
}

fn evaluate_new(agent: &mut Agent, ast: &Rc<Ast>, callee: NodeId, args: &[NodeId]) -> JsResult<EvalResult> {
    let callee_value = evaluate_expr_value(agent, ast, callee)?;
    let callee_obj = callee_value
        .as_object()
        .ok_or_else(|| agent.throw_error(ErrorKind::Type, "value is not a constructor"))?;
    let mut arg_values = Vec::with_capacity(args.len());
    for &arg in args {
        arg_values.push(evaluate_expr_value(agent, ast, arg)?);
    }
    Ok(EvalResult::value(agent.construct_function(callee_obj, &arg_values)?))
}

fn evaluate_prefix(agent: &mut Agent, ast: &Rc<Ast>, op: PrefixOp, operand: NodeId) -> JsResult<EvalResult> {
    match op {
        PrefixOp::TypeOf => {
            let result = evaluate_expr(agent, ast, operand)?;
            if matches!(&result, EvalResult::Ref(Reference::Unresolvable { .. })) {
                return Ok(EvalResult::value(string_value(agent, "undefined")));
            }
            let value = agent.get_value(result)?;
            let tag = type_of(agent, value);
            Ok(EvalResult::value(string_value(agent, tag)))
        }
        PrefixOp::Void => {
            evaluate_expr_value(agent, ast, operand)?;
            Ok(EvalResult::value(Value::Undefined))
        }
        PrefixOp::Delete => evaluate_delete(agent, ast, operand),
        PrefixOp::Plus => {
            let operand_value = evaluate_expr_value(agent, ast, operand)?;
            let n = agent.to_number(operand_value)?;
            Ok(EvalResult::value(Value::Number(n)))
        }
        PrefixOp::Minus => {
            let operand_value = evaluate_expr_value(agent, ast, operand)?;
            let n = agent.to_number(operand_value)?;
            Ok(EvalResult::value(Value::Number(-n)))
        }
        PrefixOp::Not => {
            let operand_value = evaluate_expr_value(agent, ast, operand)?;
            let b = agent.to_boolean(operand_value);
            Ok(EvalResult::value(Value::Boolean(!b)))
        }
        PrefixOp::BitNot => {
            let operand_value = evaluate_expr_value(agent, ast, operand)?;
            let n = agent.to_int32(operand_value)?;
            Ok(EvalResult::value(Value::Number(!n as f64)))
        }
        PrefixOp::PreIncrement | PrefixOp::PreDecrement => {
            let reference = evaluate_expr(agent, ast, operand)?;
            let EvalResult::Ref(reference) = reference else {
                return Err(agent.throw_error(ErrorKind::Reference, "invalid increment/decrement target"));
            };
            let current = agent.get_value(EvalResult::reference(reference.clone()))?;
            let old = agent.to_number(current)?;
            let new = if op == PrefixOp::PreIncrement { old + 1.0 } else { old - 1.0 };
            agent.put_value(reference, Value::Number(new))?;
            Ok(EvalResult::value(Value::Number(new)))
        }
    }
}

fn evaluate_delete(agent: &mut Agent, ast: &Rc<Ast>, operand: NodeId) -> JsResult<EvalResult> {
    let result = evaluate_expr(agent, ast, operand)?;
    match result {
        EvalResult::Ref(Reference::Unresolvable { .. }) => Ok(EvalResult::value(Value::Boolean(true))),
        EvalResult::Ref(Reference::Property { base, name, strict }) => {
            let obj = agent.to_object(base)?;
            let deleted = agent.heap_mut().delete_own_property(obj, &name);
            if !deleted && strict {
                return Err(agent.throw_error(ErrorKind::Type, format!("cannot delete property '{name}'")));
            }
            Ok(EvalResult::value(Value::Boolean(deleted)))
        }
        EvalResult::Value(_) => Ok(EvalResult::value(Value::Boolean(true))),
    }
}

fn string_value(agent: &mut Agent, s: &str) -> Value {
    Value::String(agent.heap_mut().allocate_string(JsStringData::from_str(s)))
}

fn type_of(agent: &Agent, value: Value) -> &'static str {
    match value {
        Value::Undefined => "undefined",
        Value::Null => "object",
        Value::Boolean(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Object(obj) => {
            if agent.heap().object(obj).is_callable() {
                "function"
            } else {
                "object"
            }
        }
    }
}

fn evaluate_postfix(agent: &mut Agent, ast: &Rc<Ast>, op: PostfixOp, operand: NodeId) -> JsResult<EvalResult> {
    let reference = evaluate_expr(agent, ast, operand)?;
    let EvalResult::Ref(reference) = reference else {
        return Err(agent.throw_error(ErrorKind::Reference, "invalid increment/decrement target"));
    };
    let current = agent.get_value(EvalResult::reference(reference.clone()))?;
    let old = agent.to_number(current)?;
    let new = if op == PostfixOp::PostIncrement { old + 1.0 } else { old - 1.0 };
    agent.put_value(reference, Value::Number(new))?;
    Ok(EvalResult::value(Value::Number(old)))
}

fn evaluate_binary(agent: &mut Agent, ast: &Rc<Ast>, op: BinaryOp, left: NodeId, right: NodeId) -> JsResult<EvalResult> {
    if matches!(op, BinaryOp::LogicalAnd | BinaryOp::LogicalOr) {
        let left_value = evaluate_expr_value(agent, ast, left)?;
        let left_bool = agent.to_boolean(left_value);
        return if (op == BinaryOp::LogicalAnd && !left_bool) || (op == BinaryOp::LogicalOr && left_bool) {
            Ok(EvalResult::value(left_value))
        } else {
            Ok(EvalResult::value(evaluate_expr_value(agent, ast, right)?))
        };
    }
    let left_value = evaluate_expr_value(agent, ast, left)?;
    let right_value = evaluate_expr_value(agent, ast, right)?;
    apply_binary(agent, op, left_value, right_value)
}

fn apply_binary(agent: &mut Agent, op: BinaryOp, left: Value, right: Value) -> JsResult<EvalResult> {
    use crate::conversion::Hint;
    let value = match op {
        BinaryOp::Add => {
            let left_prim = agent.to_primitive(left, Hint::Default)?;
            let right_prim = agent.to_primitive(right, Hint::Default)?;
            if matches!(left_prim, Value::String(_)) || matches!(right_prim, Value::String(_)) {
                let left_str = agent.to_js_string(left_prim)?;
                let right_str = agent.to_js_string(right_prim)?;
                string_value(agent, &(left_str + &right_str))
            } else {
                Value::Number(agent.to_number(left_prim)? + agent.to_number(right_prim)?)
            }
        }
        BinaryOp::Sub => Value::Number(agent.to_number(left)? - agent.to_number(right)?),
        BinaryOp::Mul => Value::Number(agent.to_number(left)? * agent.to_number(right)?),
        BinaryOp::Div => Value::Number(agent.to_number(left)? / agent.to_number(right)?),
        BinaryOp::Mod => Value::Number(agent.to_number(left)? % agent.to_number(right)?),
        BinaryOp::ShiftLeft => Value::Number(((agent.to_int32(left)?) << (agent.to_uint32(right)? & 31)) as f64),
        BinaryOp::ShiftRight => Value::Number(((agent.to_int32(left)?) >> (agent.to_uint32(right)? & 31)) as f64),
        BinaryOp::UnsignedShiftRight => Value::Number(((agent.to_uint32(left)?) >> (agent.to_uint32(right)? & 31)) as f64),
        BinaryOp::BitAnd => Value::Number(((agent.to_int32(left)?) & (agent.to_int32(right)?)) as f64),
        BinaryOp::BitOr => Value::Number(((agent.to_int32(left)?) | (agent.to_int32(right)?)) as f64),
        BinaryOp::BitXor => Value::Number(((agent.to_int32(left)?) ^ (agent.to_int32(right)?)) as f64),
        BinaryOp::Lt => Value::Boolean(compare(agent, left, right)? == Some(std::cmp::Ordering::Less)),
        // `a > b` is defined directly as `b < a` (ECMA-262 11.8.2).
        BinaryOp::Gt => Value::Boolean(compare(agent, right, left)? == Some(std::cmp::Ordering::Less)),
        // `a <= b` is `not (b < a)`, with an undefined (NaN) comparison
        // treated as false rather than flipped to true (11.8.3).
        BinaryOp::Lte => Value::Boolean(!matches!(compare(agent, right, left)?, Some(std::cmp::Ordering::Less) | None)),
        BinaryOp::Gte => Value::Boolean(!matches!(compare(agent, left, right)?, Some(std::cmp::Ordering::Less) | None)),
        BinaryOp::Equal => Value::Boolean(agent.abstract_equals(left, right)?),
        BinaryOp::NotEqual => Value::Boolean(!agent.abstract_equals(left, right)?),
        BinaryOp::StrictEqual => Value::Boolean(agent.strict_equals(left, right)),
        BinaryOp::StrictNotEqual => Value::Boolean(!agent.strict_equals(left, right)),
        BinaryOp::InstanceOf => Value::Boolean(instance_of(agent, left, right)?),
        BinaryOp::In => {
            let obj = right
                .as_object()
                .ok_or_else(|| agent.throw_error(ErrorKind::Type, "'in' requires an object operand"))?;
            let key = agent.to_property_key(left)?;
            Value::Boolean(agent.heap().find_property(obj, &key).is_some())
        }
        BinaryOp::LogicalAnd | BinaryOp::LogicalOr => unreachable!("short-circuited above"),
    };
    Ok(EvalResult::value(value))
}

/// The abstract relational comparison algorithm (ECMA-262 11.8.5):
/// string/string compares lexicographically by UTF-16 code unit, anything
/// else coerces both sides to `Number` first. Returns `None` for an
/// `undefined`-involving (`NaN`) comparison, which every relational
/// operator treats as `false`.
fn compare(agent: &mut Agent, a: Value, b: Value) -> JsResult<Option<std::cmp::Ordering>> {
    use crate::conversion::Hint;
    let a_prim = agent.to_primitive(a, Hint::Number)?;
    let b_prim = agent.to_primitive(b, Hint::Number)?;
    if let (Value::String(x), Value::String(y)) = (a_prim, b_prim) {
        return Ok(Some(agent.heap().string(x).units().cmp(agent.heap().string(y).units())));
    }
    let x = agent.to_number(a_prim)?;
    let y = agent.to_number(b_prim)?;
    if x.is_nan() || y.is_nan() {
        return Ok(None);
    }
    Ok(x.partial_cmp(&y))
}

fn instance_of(agent: &mut Agent, left: Value, right: Value) -> JsResult<bool> {
    let ctor = right
        .as_object()
        .ok_or_else(|| agent.throw_error(ErrorKind::Type, "right-hand side of 'instanceof' is not callable"))?;
    if !agent.heap().object(ctor).is_callable() {
        return Err(agent.throw_error(ErrorKind::Type, "right-hand side of 'instanceof' is not callable"));
    }
    let Some(obj) = left.as_object() else {
        return Ok(false);
    };
    let proto_value = agent.get_property(ctor, &property_key("prototype"), right)?;
    let Some(target_proto) = proto_value.as_object() else {
        return Err(agent.throw_error(ErrorKind::Type, "'prototype' property of constructor is not an object"));
    };
    let mut current = agent.heap().prototype_of(obj);
    while let Some(p) = current {
        if p == target_proto {
            return Ok(true);
        }
        current = agent.heap().prototype_of(p);
    }
    Ok(false)
}

fn evaluate_assignment(agent: &mut Agent, ast: &Rc<Ast>, op: AssignOp, target: NodeId, value: NodeId) -> JsResult<EvalResult> {
    let reference = evaluate_expr(agent, ast, target)?;
    let EvalResult::Ref(reference) = reference else {
        return Err(agent.throw_error(ErrorKind::Reference, "invalid assignment target"));
    };
    let new_value = if op == AssignOp::Assign {
        evaluate_expr_value(agent, ast, value)?
    } else {
        let old = agent.get_value(EvalResult::reference(reference.clone()))?;
        let rhs = evaluate_expr_value(agent, ast, value)?;
        let binary_op = compound_to_binary(op);
        match apply_binary(agent, binary_op, old, rhs)? {
            EvalResult::Value(v) => v,
            EvalResult::Ref(_) => unreachable!("apply_binary always returns a Value"),
        }
    };
    agent.put_value(reference, new_value)?;
    Ok(EvalResult::value(new_value))
}

fn compound_to_binary(op: AssignOp) -> BinaryOp {
    match op {
        AssignOp::Assign => unreachable!("plain assignment has no binary counterpart"),
        AssignOp::Add => BinaryOp::Add,
        AssignOp::Sub => BinaryOp::Sub,
        AssignOp::Mul => BinaryOp::Mul,
        AssignOp::Div => BinaryOp::Div,
        AssignOp::Mod => BinaryOp::Mod,
        AssignOp::ShiftLeft => BinaryOp::ShiftLeft,
        AssignOp::ShiftRight => BinaryOp::ShiftRight,
        AssignOp::UnsignedShiftRight => BinaryOp::UnsignedShiftRight,
        AssignOp::BitAnd => BinaryOp::BitAnd,
        AssignOp::BitXor => BinaryOp::BitXor,
        AssignOp::BitOr => BinaryOp::BitOr,
    }
}
