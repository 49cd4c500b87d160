//! Runtime primitive library.
//!
//! | Group     | Primitives                                                      |
//! |-----------|-----------------------------------------------------------------|
//! | integers  | `add_int` `sub_int` `mult_int` `neg_int` `add_range` `add_atom` `sub_range` `sub_atom` |
//! | compare   | `eq_int` `lt_int` `gt_int` `lteq_int` `gteq_int`                 |
//! | booleans  | `and_bool` `or_bool` `not_bool` `eq_bool`                        |
//! | vectors   | `xor_vec` `and_vec` `or_vec` `not_vec` `add_vec` `sub_vec` `eq_bits` `neq_bits` |
//! | slicing   | `vector_subrange` `vector_update_subrange` `zero_extend` `zeros` `unsigned` `length` |
//! | builtins  | `throw` `exit` `assert` `cons`                                   |
//!
//! Bit-vector ranges are `hi..lo`, counted from the least significant bit.

use num_bigint::{BigInt, BigUint};
use num_traits::ToPrimitive;

use super::value::{mask, truncate};
use super::{EvalError, Value};
use crate::anf::builtins;

type Result<T> = std::result::Result<T, EvalError>;

/// Apply a primitive, or `None` if no primitive has that name.
pub fn call(name: &str, args: &[Value]) -> Option<Result<Value>> {
    let result = match name {
        "add_int" | "add_range" | "add_atom" => ints(name, args).map(|(a, b)| Value::Int(a + b)),
        "sub_int" | "sub_range" | "sub_atom" => ints(name, args).map(|(a, b)| Value::Int(a - b)),
        "mult_int" => ints(name, args).map(|(a, b)| Value::Int(a * b)),
        "neg_int" => unary(name, args).and_then(int).map(|a| Value::Int(-a)),
        "eq_int" => ints(name, args).map(|(a, b)| Value::Bool(a == b)),
        "lt_int" => ints(name, args).map(|(a, b)| Value::Bool(a < b)),
        "gt_int" => ints(name, args).map(|(a, b)| Value::Bool(a > b)),
        "lteq_int" => ints(name, args).map(|(a, b)| Value::Bool(a <= b)),
        "gteq_int" => ints(name, args).map(|(a, b)| Value::Bool(a >= b)),

        "and_bool" => bools(name, args).map(|(a, b)| Value::Bool(a && b)),
        "or_bool" => bools(name, args).map(|(a, b)| Value::Bool(a || b)),
        "eq_bool" => bools(name, args).map(|(a, b)| Value::Bool(a == b)),
        "not_bool" => unary(name, args).and_then(boolean).map(|a| Value::Bool(!a)),

        "xor_vec" => vecs(name, args).map(|(a, b, w)| Value::Bits(a ^ b, w)),
        "and_vec" => vecs(name, args).map(|(a, b, w)| Value::Bits(a & b, w)),
        "or_vec" => vecs(name, args).map(|(a, b, w)| Value::Bits(a | b, w)),
        "add_vec" => vecs(name, args).map(|(a, b, w)| Value::Bits(truncate(a + b, w), w)),
        "sub_vec" => {
            vecs(name, args).map(|(a, b, w)| Value::Bits(truncate(a + (mask(w) + 1u8) - b, w), w))
        }
        "eq_bits" => vecs(name, args).map(|(a, b, _)| Value::Bool(a == b)),
        "neq_bits" => vecs(name, args).map(|(a, b, _)| Value::Bool(a != b)),
        "not_vec" => unary(name, args)
            .and_then(bits)
            .map(|(a, w)| Value::Bits(mask(w) ^ a, w)),

        "vector_subrange" => subrange(name, args),
        "vector_update_subrange" => update_subrange(name, args),
        "zero_extend" => arity(name, args, 2).and_then(|_| {
            let (v, _) = bits(&args[0])?;
            Ok(Value::Bits(v, width(&args[1])?))
        }),
        "zeros" => unary(name, args)
            .and_then(width)
            .map(|w| Value::Bits(BigUint::from(0u8), w)),
        "unsigned" => unary(name, args)
            .and_then(bits)
            .map(|(v, _)| Value::Int(BigInt::from(v))),
        "length" => unary(name, args)
            .and_then(bits)
            .map(|(_, w)| Value::Int(BigInt::from(w))),

        builtins::THROW => unary(name, args).and_then(|v| Err(EvalError::Thrown(v.to_string()))),
        builtins::EXIT => Err(EvalError::Exited),
        builtins::ASSERT => arity(name, args, 2).and_then(|_| {
            if boolean(&args[0])? {
                Ok(Value::Unit)
            } else {
                Err(EvalError::AssertionFailed(match &args[1] {
                    Value::Str(message) => message.clone(),
                    other => other.to_string(),
                }))
            }
        }),
        builtins::CONS => Err(EvalError::TypeMismatch {
            expected: "list".to_string(),
            found: "list cell",
        }),
        _ => return None,
    };
    Some(result)
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::Arity {
            name: name.to_string(),
            expected,
            found: args.len(),
        })
    }
}

fn unary<'v>(name: &str, args: &'v [Value]) -> Result<&'v Value> {
    arity(name, args, 1)?;
    Ok(&args[0])
}

fn mismatch(expected: &str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        expected: expected.to_string(),
        found: found.kind(),
    }
}

fn int(value: &Value) -> Result<BigInt> {
    match value {
        Value::Int(n) => Ok(n.clone()),
        other => Err(mismatch("integer", other)),
    }
}

fn boolean(value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(mismatch("bool", other)),
    }
}

fn bits(value: &Value) -> Result<(BigUint, u32)> {
    match value {
        Value::Bits(v, w) => Ok((v.clone(), *w)),
        other => Err(mismatch("bit-vector", other)),
    }
}

/// An integer argument used as a width or bit index.
fn width(value: &Value) -> Result<u32> {
    let n = int(value)?;
    n.to_u32().ok_or(EvalError::Overflow {
        value: n.to_string(),
    })
}

fn ints(name: &str, args: &[Value]) -> Result<(BigInt, BigInt)> {
    arity(name, args, 2)?;
    Ok((int(&args[0])?, int(&args[1])?))
}

fn bools(name: &str, args: &[Value]) -> Result<(bool, bool)> {
    arity(name, args, 2)?;
    Ok((boolean(&args[0])?, boolean(&args[1])?))
}

/// Two bit-vector operands and the wider of their widths.
fn vecs(name: &str, args: &[Value]) -> Result<(BigUint, BigUint, u32)> {
    arity(name, args, 2)?;
    let (a, wa) = bits(&args[0])?;
    let (b, wb) = bits(&args[1])?;
    Ok((a, b, wa.max(wb)))
}

fn range(args: &[Value], hi: usize, lo: usize, v_width: u32) -> Result<(u32, u32)> {
    let hi = width(&args[hi])?;
    let lo = width(&args[lo])?;
    if lo > hi || hi >= v_width {
        return Err(EvalError::OutOfBounds { hi, lo, width: v_width });
    }
    Ok((hi, lo))
}

/// `vector_subrange(v, hi, lo)`
fn subrange(name: &str, args: &[Value]) -> Result<Value> {
    arity(name, args, 3)?;
    let (v, w) = bits(&args[0])?;
    let (hi, lo) = range(args, 1, 2, w)?;
    let len = hi - lo + 1;
    Ok(Value::Bits(truncate(v >> lo, len), len))
}

/// `vector_update_subrange(v, hi, lo, x)`
fn update_subrange(name: &str, args: &[Value]) -> Result<Value> {
    arity(name, args, 4)?;
    let (v, w) = bits(&args[0])?;
    let (hi, lo) = range(args, 1, 2, w)?;
    let (x, _) = bits(&args[3])?;
    let len = hi - lo + 1;
    let hole = mask(len) << lo;
    let kept = v & (mask(w) ^ hole);
    Ok(Value::Bits(kept | (truncate(x, len) << lo), w))
}
