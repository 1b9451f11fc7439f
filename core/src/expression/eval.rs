//! # Default Evaluator
//!
//! Interprets parsed expressions over `serde_json::Value` bindings using
//! EL-style coercion rules. Unknown identifiers and missing properties
//! evaluate to null.

use super::parser::{parse_composite, BinaryOp, Expr, Part, UnaryOp};
use super::{Bindings, EvaluationError, ExpectedType, ExpressionEvaluator};
use serde_json::{Number, Value};
use std::cmp::Ordering;

type EvalResult<T> = Result<T, String>;

/// The built-in expression evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEvaluator;

impl DefaultEvaluator {
    /// Creates the evaluator.
    pub fn new() -> Self {
        DefaultEvaluator
    }
}

impl ExpressionEvaluator for DefaultEvaluator {
    fn evaluate(
        &self,
        bindings: &dyn Bindings,
        expression: &str,
        expected: ExpectedType,
    ) -> Result<Value, EvaluationError> {
        let fail = |message: String| EvaluationError::new(expression, message);
        let parts = parse_composite(expression).map_err(fail)?;

        let value = match parts.as_slice() {
            [] => Value::String(String::new()),
            [Part::Eval(expr)] => eval(expr, bindings).map_err(fail)?,
            _ => {
                let mut text = String::new();
                for part in &parts {
                    match part {
                        Part::Text(literal) => text.push_str(literal),
                        Part::Eval(expr) => {
                            text.push_str(&to_text(&eval(expr, bindings).map_err(fail)?))
                        }
                    }
                }
                Value::String(text)
            }
        };

        Ok(match expected {
            ExpectedType::Object => value,
            ExpectedType::String => Value::String(to_text(&value)),
            ExpectedType::Boolean => Value::Bool(to_bool(&value).map_err(fail)?),
        })
    }
}

fn eval(expr: &Expr, bindings: &dyn Bindings) -> EvalResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ident(name) => Ok(bindings.get(name).cloned().unwrap_or(Value::Null)),
        Expr::Member(target, name) => {
            let target = eval(target, bindings)?;
            Ok(member(&target, name))
        }
        Expr::Index(target, index) => {
            let target = eval(target, bindings)?;
            let index = eval(index, bindings)?;
            Ok(match (&target, &index) {
                (Value::Array(items), Value::Number(n)) => n
                    .as_u64()
                    .and_then(|i| items.get(i as usize))
                    .cloned()
                    .unwrap_or(Value::Null),
                (Value::Array(items), Value::String(s)) => s
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i))
                    .cloned()
                    .unwrap_or(Value::Null),
                (_, Value::Null) => Value::Null,
                (_, key) => member(&target, &to_text(key)),
            })
        }
        Expr::Unary(op, operand) => {
            let value = eval(operand, bindings)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!to_bool(&value)?)),
                UnaryOp::Empty => Ok(Value::Bool(is_empty(&value))),
                UnaryOp::Negate => match to_number(&value)? {
                    Numeric::Int(n) => n
                        .checked_neg()
                        .map(|n| Value::Number(n.into()))
                        .ok_or_else(|| "integer overflow".to_string()),
                    Numeric::Float(f) => float(-f),
                },
            }
        }
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            if !to_bool(&eval(lhs, bindings)?)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(to_bool(&eval(rhs, bindings)?)?))
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            if to_bool(&eval(lhs, bindings)?)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(to_bool(&eval(rhs, bindings)?)?))
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = eval(lhs, bindings)?;
            let rhs = eval(rhs, bindings)?;
            binary(*op, &lhs, &rhs)
        }
        Expr::Conditional(cond, then, otherwise) => {
            if to_bool(&eval(cond, bindings)?)? {
                eval(then, bindings)
            } else {
                eval(otherwise, bindings)
            }
        }
    }
}

fn member(target: &Value, name: &str) -> Value {
    match target {
        Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(equals(lhs, rhs)?)),
        BinaryOp::Ne => Ok(Value::Bool(!equals(lhs, rhs)?)),
        BinaryOp::Lt => compare(lhs, rhs, Ordering::is_lt),
        BinaryOp::Gt => compare(lhs, rhs, Ordering::is_gt),
        BinaryOp::Le => compare(lhs, rhs, Ordering::is_le),
        BinaryOp::Ge => compare(lhs, rhs, Ordering::is_ge),
        BinaryOp::Div => float(to_number(lhs)?.as_f64() / to_number(rhs)?.as_f64()),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Rem => {
            arithmetic(op, to_number(lhs)?, to_number(rhs)?)
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators are evaluated lazily"),
    }
}

#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(n) => n as f64,
            Numeric::Float(f) => f,
        }
    }
}

fn arithmetic(op: BinaryOp, lhs: Numeric, rhs: Numeric) -> EvalResult<Value> {
    if let (Numeric::Int(a), Numeric::Int(b)) = (lhs, rhs) {
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            _ if b == 0 => return Err("division by zero".to_string()),
            _ => a.checked_rem(b),
        };
        return result
            .map(|n| Value::Number(n.into()))
            .ok_or_else(|| "integer overflow".to_string());
    }
    let (a, b) = (lhs.as_f64(), rhs.as_f64());
    float(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        _ => a % b,
    })
}

fn float(value: f64) -> EvalResult<Value> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| format!("{} is not a finite number", value))
}

fn to_number(value: &Value) -> EvalResult<Numeric> {
    match value {
        Value::Null => Ok(Numeric::Int(0)),
        Value::Number(n) => Ok(n
            .as_i64()
            .map(Numeric::Int)
            .unwrap_or_else(|| Numeric::Float(n.as_f64().unwrap_or(f64::NAN)))),
        Value::String(s) if s.trim().is_empty() => Ok(Numeric::Int(0)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Numeric::Int)
            .or_else(|_| s.trim().parse::<f64>().map(Numeric::Float))
            .map_err(|_| format!("cannot coerce '{}' to a number", s)),
        other => Err(format!("cannot coerce {} to a number", other)),
    }
}

fn to_bool(value: &Value) -> EvalResult<bool> {
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        Value::String(s) => Ok(s.eq_ignore_ascii_case("true")),
        other => Err(format!("cannot coerce {} to a boolean", other)),
    }
}

/// Converts a value to text: null is empty, strings are unquoted, other
/// scalars use their literal form and containers their JSON form.
pub(crate) fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        container => container.to_string(),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn equals(lhs: &Value, rhs: &Value) -> EvalResult<bool> {
    Ok(match (lhs, rhs) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            to_number(lhs)?.as_f64() == to_number(rhs)?.as_f64()
        }
        (Value::Bool(_), _) | (_, Value::Bool(_)) => to_bool(lhs)? == to_bool(rhs)?,
        (Value::String(_), _) | (_, Value::String(_)) => to_text(lhs) == to_text(rhs),
        _ => lhs == rhs,
    })
}

fn compare(lhs: &Value, rhs: &Value, accept: fn(Ordering) -> bool) -> EvalResult<Value> {
    let ordering = match (lhs, rhs) {
        (Value::Null, _) | (_, Value::Null) => return Ok(Value::Bool(false)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(_), _) | (_, Value::Number(_)) => to_number(lhs)?
            .as_f64()
            .partial_cmp(&to_number(rhs)?.as_f64()),
        _ => return Err(format!("cannot compare {} with {}", lhs, rhs)),
    };
    Ok(Value::Bool(ordering.is_some_and(accept)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bindings() -> serde_json::Map<String, Value> {
        match json!({
            "instance": { "id": 7, "name": "order", "tags": ["a", "b"], "active": true },
            "uri": { "page": "2" },
            "empty_list": []
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn eval_as(expr: &str, expected: ExpectedType) -> Value {
        DefaultEvaluator::new()
            .evaluate(&bindings(), expr, expected)
            .unwrap()
    }

    #[test]
    fn test_property_paths() {
        assert_eq!(eval_as("${instance.id}", ExpectedType::Object), json!(7));
        assert_eq!(eval_as("${instance.tags[1]}", ExpectedType::Object), json!("b"));
        assert_eq!(
            eval_as("${instance['name']}", ExpectedType::Object),
            json!("order")
        );
        assert_eq!(eval_as("${instance.missing}", ExpectedType::Object), Value::Null);
        assert_eq!(eval_as("${nobody.knows}", ExpectedType::Object), Value::Null);
    }

    #[test]
    fn test_composite_string() {
        assert_eq!(
            eval_as("/orders/${instance.id}/${instance.name}", ExpectedType::String),
            json!("/orders/7/order")
        );
        assert_eq!(
            eval_as("/orders/${instance.missing}", ExpectedType::String),
            json!("/orders/")
        );
        assert_eq!(eval_as("/plain", ExpectedType::String), json!("/plain"));
    }

    #[test]
    fn test_boolean_logic() {
        assert_eq!(eval_as("${instance.active}", ExpectedType::Boolean), json!(true));
        assert_eq!(
            eval_as("${not instance.active or uri.page == 2}", ExpectedType::Boolean),
            json!(true)
        );
        assert_eq!(eval_as("${empty empty_list}", ExpectedType::Boolean), json!(true));
        assert_eq!(
            eval_as("${!empty instance.tags && instance.id gt 5}", ExpectedType::Boolean),
            json!(true)
        );
        assert_eq!(eval_as("${instance.missing}", ExpectedType::Boolean), json!(false));
        assert_eq!(eval_as("${'true'}", ExpectedType::Boolean), json!(true));
    }

    #[test]
    fn test_ternary_and_arithmetic() {
        assert_eq!(
            eval_as("${instance.id > 5 ? 'big' : 'small'}", ExpectedType::Object),
            json!("big")
        );
        assert_eq!(eval_as("${(instance.id + 1) * 2}", ExpectedType::Object), json!(16));
        assert_eq!(eval_as("${-instance.id}", ExpectedType::Object), json!(-7));
        assert_eq!(eval_as("${uri.page + 1}", ExpectedType::Object), json!(3));
        assert_eq!(eval_as("${instance.id / 2}", ExpectedType::Object), json!(3.5));
    }

    #[test]
    fn test_string_comparison() {
        assert_eq!(
            eval_as("${instance.name eq 'order'}", ExpectedType::Boolean),
            json!(true)
        );
        assert_eq!(eval_as("${'a' < 'b'}", ExpectedType::Boolean), json!(true));
        assert_eq!(eval_as("${instance.missing < 1}", ExpectedType::Boolean), json!(false));
    }

    #[test]
    fn test_errors_name_the_expression() {
        let err = DefaultEvaluator::new()
            .evaluate(&bindings(), "${instance.id +}", ExpectedType::Object)
            .unwrap_err();
        assert_eq!(err.expression(), "${instance.id +}");

        let err = DefaultEvaluator::new()
            .evaluate(&bindings(), "${instance.tags}", ExpectedType::Boolean)
            .unwrap_err();
        assert!(err.message().contains("boolean"));
    }
}
