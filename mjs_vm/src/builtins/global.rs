//! Global function properties (ECMA-262 15.1): `eval`, `parseInt`,
//! `parseFloat`, `isNaN`, `isFinite`, plus the teacher-style convenience
//! `print` (spec.md §1's "handful of globals"), and the `NaN`/`Infinity`/
//! `undefined` global value properties.

use mjs_ast::Version;
use mjs_heap::{property_key, Attributes, Heap, ObjectHandle, PropertySlot, Value};

use super::{install_native_function, Intrinsics};

pub fn install_globals(heap: &mut Heap, intrinsics: &Intrinsics, global: ObjectHandle, _version: Version) -> ObjectHandle {
    for (name, value) in [
        ("NaN", Value::Number(f64::NAN)),
        ("Infinity", Value::Number(f64::INFINITY)),
        ("undefined", Value::Undefined),
    ] {
        heap.define_own_property(
            global,
            property_key(name),
            PropertySlot::data(value.to_representation(), Attributes::sealed()),
        )
        .ok();
    }

    let eval = install_native_function(heap, global, "eval", 1, |agent, _this, args| {
        let Some(value) = args.first().copied() else {
            return Ok(Value::Undefined);
        };
        let Value::String(handle) = value else {
            return Ok(value);
        };
        let source = agent.heap().string(handle).to_string_lossy();
        agent.eval_program(&source)
    });

    install_native_function(heap, global, "parseInt", 2, |agent, _this, args| {
        let text = match args.first() {
            Some(v) => agent.to_js_string(*v)?,
            None => "undefined".to_string(),
        };
        let radix = match args.get(1) {
            Some(v) if !matches!(v, Value::Undefined) => agent.to_number(*v)? as u32,
            _ => 10,
        };
        Ok(Value::Number(parse_int(text.trim(), if radix == 0 { 10 } else { radix })))
    });

    install_native_function(heap, global, "parseFloat", 1, |agent, _this, args| {
        let text = match args.first() {
            Some(v) => agent.to_js_string(*v)?,
            None => "undefined".to_string(),
        };
        Ok(Value::Number(parse_float(text.trim())))
    });

    install_native_function(heap, global, "isNaN", 1, |agent, _this, args| {
        let n = match args.first() {
            Some(v) => agent.to_number(*v)?,
            None => f64::NAN,
        };
        Ok(Value::Boolean(n.is_nan()))
    });

    install_native_function(heap, global, "isFinite", 1, |agent, _this, args| {
        let n = match args.first() {
            Some(v) => agent.to_number(*v)?,
            None => f64::NAN,
        };
        Ok(Value::Boolean(n.is_finite()))
    });

    install_native_function(heap, global, "print", 1, |agent, _this, args| {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            parts.push(agent.to_js_string(*arg)?);
        }
        println!("{}", parts.join(" "));
        Ok(Value::Undefined)
    });

    eval
}

/// A permissive `parseInt` (ECMA-262 15.1.2.2): skips leading whitespace
/// (already trimmed by the caller), an optional sign, an optional
/// `0x`/`0X` prefix when `radix` is 16, then as many radix digits as
/// match; returns `NaN` if no digits matched at all.
fn parse_int(text: &str, radix: u32) -> f64 {
    let (sign, rest) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };
    let (radix, rest) = match rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        Some(hex) if radix == 16 || radix == 10 => (16, hex),
        _ => (radix, rest),
    };
    let digits: String = rest.chars().take_while(|c| c.to_digit(radix).is_some()).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .fold(0.0, |acc, c| acc * radix as f64 + c.to_digit(radix).unwrap() as f64)
        * sign
}

/// A permissive `parseFloat` (ECMA-262 15.1.2.3): longest numeric prefix
/// (optional sign, digits, optional fraction, optional exponent) parsed
/// via `str::parse`, falling back through shorter prefixes until one
/// parses or nothing is left.
fn parse_float(text: &str) -> f64 {
    if let Some(rest) = text.strip_prefix("Infinity").or_else(|| text.strip_prefix("+Infinity")) {
        let _ = rest;
        return f64::INFINITY;
    }
    if let Some(rest) = text.strip_prefix("-Infinity") {
        let _ = rest;
        return f64::NEG_INFINITY;
    }
    let mut end = text.len();
    while end > 0 {
        if let Ok(n) = text[..end].parse::<f64>() {
            return n;
        }
        end -= 1;
    }
    f64::NAN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_with_prefix() {
        assert_eq!(parse_int("0xff", 10), 255.0);
    }

    #[test]
    fn parses_decimal_with_trailing_garbage() {
        assert_eq!(parse_int("42px", 10), 42.0);
    }

    #[test]
    fn parse_float_stops_at_first_invalid_char() {
        assert_eq!(parse_float("3.14abc"), 3.14);
    }

    #[test]
    fn parse_int_empty_is_nan() {
        assert!(parse_int("abc", 10).is_nan());
    }
}
