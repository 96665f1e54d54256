//! The operator table.
//!
//! Every operator is a pure function of its already evaluated operands.
//! Operators never fail: operands they cannot work with produce `undefined`
//! (or one of the documented fallbacks below).

use std::cmp::Ordering;

use rust_decimal::Decimal;

use crate::ast::Operator;
use crate::number::{Arithmetic, Number, NumericMode};
use crate::value::{Map, Pattern, Value};

/// Applies `op` to its evaluated operands.
///
/// # Examples
///
/// ```
/// use sprig_lang::ast::Operator;
/// use sprig_lang::number::NumericMode;
/// use sprig_lang::operators::apply;
/// use sprig_lang::Value;
///
/// let sum = apply(Operator::Add, vec![Value::from(0.1), Value::from(0.2)], NumericMode::Exact);
/// assert_eq!(sum.as_string(), "0.3");
/// ```
pub fn apply(op: Operator, args: Vec<Value>, mode: NumericMode) -> Value {
    if op == Operator::Array {
        return Value::Array(args);
    }
    let mut args = args.into_iter();
    let left = args.next().unwrap_or_default();
    let right = args.next().unwrap_or_default();

    match op {
        Operator::And => {
            if left.is_truthy() {
                right
            } else {
                left
            }
        }
        Operator::Or => {
            if left.is_truthy() {
                left
            } else {
                right
            }
        }
        Operator::Not => Value::Boolean(!left.is_truthy()),
        Operator::Concat => {
            if left.is_undefined() {
                right
            } else if right.is_undefined() {
                left
            } else {
                concat(vec![left, right])
            }
        }

        Operator::Equal => Value::Boolean(equals(&left, &right, mode)),
        Operator::NotEqual => Value::Boolean(!equals(&left, &right, mode)),
        Operator::Less => Value::Boolean(ordering(&left, &right, mode).is_some_and(Ordering::is_lt)),
        Operator::LessEqual => Value::Boolean(ordering(&left, &right, mode).is_some_and(Ordering::is_le)),
        Operator::Greater => Value::Boolean(ordering(&left, &right, mode).is_some_and(Ordering::is_gt)),
        Operator::GreaterEqual => {
            Value::Boolean(ordering(&left, &right, mode).is_some_and(Ordering::is_ge))
        }
        Operator::Compare => Value::from(three_way(&left, &right, mode)),
        Operator::Matches => Value::Boolean(matches(&left, &right)),

        Operator::Add => {
            if left.is_undefined() {
                right
            } else if right.is_undefined() {
                left
            } else if all_numeric(&left, &right) {
                arithmetic(op, &left, &right, mode)
            } else {
                Value::String(left.as_string() + &right.as_string())
            }
        }
        Operator::Divide => {
            if all_numeric(&left, &right) {
                arithmetic(op, &left, &right, mode)
            } else {
                Value::String(format!("{}/{}", left.as_string(), right.as_string()))
            }
        }
        Operator::Subtract | Operator::Multiply | Operator::Modulo | Operator::Power => {
            if all_numeric(&left, &right) {
                arithmetic(op, &left, &right, mode)
            } else {
                Value::Undefined
            }
        }

        Operator::Pair => Value::Array(vec![left, right]),
        Operator::Object => make_object(left),
        Operator::Range => range(&left, &right),
        Operator::Group => left,
        // Handled before the operands are split
        Operator::Array => Value::Undefined,
    }
}

/// True when both operands are numbers or numeric strings.
pub fn all_numeric(left: &Value, right: &Value) -> bool {
    left.is_numeric_like() && right.is_numeric_like()
}

fn arithmetic(op: Operator, left: &Value, right: &Value, mode: NumericMode) -> Value {
    let exact = match mode {
        NumericMode::Exact => compute::<Decimal>(op, left, right),
        NumericMode::Native => None,
    };
    exact
        .or_else(|| compute::<f64>(op, left, right))
        .map(Value::Number)
        .unwrap_or(Value::Undefined)
}

fn compute<N: Arithmetic>(op: Operator, left: &Value, right: &Value) -> Option<Number> {
    let a = N::from_value(left)?;
    let b = N::from_value(right)?;
    let result = match op {
        Operator::Add => a.add(b),
        Operator::Subtract => a.sub(b),
        Operator::Multiply => a.mul(b),
        Operator::Divide => a.div(b),
        Operator::Modulo => a.rem(b),
        Operator::Power => a.pow(b),
        _ => None,
    }?;
    Some(result.into_number())
}

fn numeric_ordering(left: &Value, right: &Value, mode: NumericMode) -> Option<Ordering> {
    if mode == NumericMode::Exact
        && let (Some(a), Some(b)) = (Decimal::from_value(left), Decimal::from_value(right))
    {
        return a.compare(b);
    }
    f64::from_value(left)?.compare(f64::from_value(right)?)
}

/// Loose conversion used when comparing unlike primitives.
fn loose_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Boolean(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.to_f64(),
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn is_composite(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

/// `==` semantics: numeric when both sides look numeric, deep structural for
/// arrays and objects, loose primitive equality otherwise.
pub fn equals(left: &Value, right: &Value, mode: NumericMode) -> bool {
    if all_numeric(left, right) {
        return numeric_ordering(left, right, mode) == Some(Ordering::Equal);
    }
    if is_composite(left) {
        return left == right;
    }
    match (left, right) {
        (l, r) if l.is_nullish() || r.is_nullish() => l.is_nullish() && r.is_nullish(),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Regex(a), Value::Regex(b)) => a == b,
        (_, r) if is_composite(r) => left.as_string() == r.as_string(),
        (l, r) => loose_number(l) == loose_number(r),
    }
}

fn ordering(left: &Value, right: &Value, mode: NumericMode) -> Option<Ordering> {
    if all_numeric(left, right) {
        return numeric_ordering(left, right, mode);
    }
    let stringish = |v: &Value| matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_));
    if stringish(left) && stringish(right) {
        return Some(left.as_string().cmp(&right.as_string()));
    }
    loose_number(left).partial_cmp(&loose_number(right))
}

/// `<=>`: -1, 0 or 1. NaN sorts before every other number.
pub fn three_way(left: &Value, right: &Value, mode: NumericMode) -> i64 {
    let order = if all_numeric(left, right) {
        match numeric_ordering(left, right, mode) {
            Some(order) => order,
            None => {
                let left_nan = left.as_number().is_none_or(|n| n.is_nan());
                let right_nan = right.as_number().is_none_or(|n| n.is_nan());
                match (left_nan, right_nan) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Less,
                    _ => Ordering::Greater,
                }
            }
        }
    } else if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        left.as_string().cmp(&right.as_string())
    } else {
        Ordering::Equal
    };
    order as i64
}

fn matches(left: &Value, right: &Value) -> bool {
    let Value::String(text) = left else {
        return false;
    };
    match right {
        Value::Regex(pattern) => pattern.is_match(text),
        Value::String(source) => Pattern::new(source, "").is_ok_and(|p| p.is_match(text)),
        _ => false,
    }
}

/// Concatenates values, skipping `undefined`. The first remaining value
/// decides the result type:
///
/// - array: arrays are appended item by item, other values pushed
/// - object: objects are merged (later keys win), array items land under
///   their index, scalars are inserted as `value: value`
/// - anything else: the string forms are joined
pub fn concat(values: Vec<Value>) -> Value {
    join(values.into_iter().filter(|v| !v.is_undefined()).collect())
}

/// Like [`concat`], but `null` is skipped too, so it never decides the kind
/// of result.
pub fn concat_present(values: Vec<Value>) -> Value {
    join(values.into_iter().filter(|v| !v.is_nullish()).collect())
}

fn join(values: Vec<Value>) -> Value {
    match values.first() {
        None => Value::Undefined,
        Some(Value::Array(_)) => {
            let mut out = Vec::new();
            for value in values {
                match value {
                    Value::Array(items) => out.extend(items),
                    other => out.push(other),
                }
            }
            Value::Array(out)
        }
        Some(Value::Object(_)) => {
            let mut out = Map::new();
            for value in values {
                match value {
                    Value::Object(map) => out.extend(map),
                    Value::Array(items) => {
                        out.extend(items.into_iter().enumerate().map(|(i, v)| (i.to_string(), v)))
                    }
                    other => {
                        out.insert(other.as_string(), other);
                    }
                }
            }
            Value::Object(out)
        }
        Some(_) => Value::String(values.iter().map(Value::as_string).collect()),
    }
}

/// `{}`: one `[key, value]` pair, or an array of pairs where later keys win.
fn make_object(arg: Value) -> Value {
    let mut out = Map::new();
    if let Value::Array(items) = arg {
        if items.len() == 2 && !matches!(items[0], Value::Array(_)) {
            let mut pair = items.into_iter();
            let key = pair.next().unwrap_or_default();
            out.insert(key.as_string(), pair.next().unwrap_or_default());
        } else {
            for item in items {
                if let Value::Array(pair) = item {
                    let mut pair = pair.into_iter();
                    let key = pair.next().unwrap_or_default();
                    out.insert(key.as_string(), pair.next().unwrap_or_default());
                }
            }
        }
    }
    Value::Object(out)
}

/// `..`: inclusive, counting down when the start is past the end.
fn range(start: &Value, end: &Value) -> Value {
    let (Value::Number(start), Value::Number(end)) = (start, end) else {
        return Value::Array(Vec::new());
    };
    let (start, end) = (start.to_f64(), end.to_f64());
    if !start.is_finite() || !end.is_finite() {
        return Value::Array(Vec::new());
    }
    let mut items = Vec::new();
    let mut i = start;
    if start <= end {
        while i <= end {
            items.push(Value::from(i));
            i += 1.0;
        }
    } else {
        while i >= end {
            items.push(Value::from(i));
            i -= 1.0;
        }
    }
    Value::Array(items)
}
