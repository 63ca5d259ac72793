//! Argument values and their validation against declared types.

use num_bigint::{BigInt, Sign};
use num_traits::{Num, One, Zero};
use revm::primitives::Address;
use serde_json::Value;

use crate::error::Mismatch;
use crate::param_type::TypeTag;

/// A single argument value.
///
/// Integers are always arbitrary precision. There is deliberately no variant
/// for machine-word integers, so a caller cannot hand in a truncated value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Int(BigInt),
    Bool(bool),
    Address(Address),
    /// Contents of `bytes` or `bytes<N>`.
    Bytes(Vec<u8>),
    String(String),
    /// Elements of `T[]` or `T[K]`.
    Array(Vec<Token>),
}

/// How closely an argument matches a parameter type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Fit {
    /// Accepted after a shape conversion, e.g. 20 raw bytes for `address`.
    Coerced = 1,
    Exact = 2,
}

impl Token {
    /// Integer token for any `uint<M>` or `int<M>` parameter; the sign is
    /// checked against the declared type when encoding.
    pub fn int(value: impl Into<BigInt>) -> Self {
        Token::Int(value.into())
    }

    /// Checks the token against `tag`, returning how well it fits.
    pub(crate) fn fit(&self, tag: &TypeTag) -> Result<Fit, Mismatch> {
        match (tag, self) {
            (TypeTag::Uint(bits), Token::Int(v)) => {
                check_range(v, *bits, false).map(|_| Fit::Exact).map_err(|r| Mismatch::new(tag, r))
            }
            (TypeTag::Int(bits), Token::Int(v)) => {
                check_range(v, *bits, true).map(|_| Fit::Exact).map_err(|r| Mismatch::new(tag, r))
            }
            (TypeTag::Bool, Token::Bool(_)) => Ok(Fit::Exact),
            (TypeTag::Address, Token::Address(_)) => Ok(Fit::Exact),
            (TypeTag::Address, Token::Bytes(b)) if b.len() == 20 => Ok(Fit::Coerced),
            (TypeTag::FixedBytes(len), Token::Bytes(b)) => {
                if b.len() == *len {
                    Ok(Fit::Exact)
                } else {
                    Err(Mismatch::new(tag, format!("got {} byte(s)", b.len())))
                }
            }
            (TypeTag::Bytes, Token::Bytes(_)) => Ok(Fit::Exact),
            (TypeTag::String, Token::String(_)) => Ok(Fit::Exact),
            (TypeTag::Array(inner), Token::Array(items)) => fit_all(inner, items, tag),
            (TypeTag::FixedArray(inner, len), Token::Array(items)) => {
                if items.len() != *len {
                    return Err(Mismatch::new(tag, format!("got {} element(s)", items.len())));
                }
                fit_all(inner, items, tag)
            }
            _ => Err(Mismatch::new(tag, format!("got {}", self.kind()))),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Token::Int(_) => "an integer",
            Token::Bool(_) => "a boolean",
            Token::Address(_) => "an address",
            Token::Bytes(_) => "a byte array",
            Token::String(_) => "a string",
            Token::Array(_) => "an array",
        }
    }

    /// Converts a host-supplied JSON value into a token for `tag`.
    ///
    /// Integers must arrive as strings (decimal or `0x` hex). A JSON number is
    /// a machine-word integer and is refused rather than widened.
    pub(crate) fn from_json(tag: &TypeTag, json: &Value) -> Result<Token, Mismatch> {
        let wrong = |what: &str| Mismatch::new(tag, format!("got {what}"));
        match tag {
            TypeTag::Uint(_) | TypeTag::Int(_) => match json {
                Value::String(s) => parse_bigint(s)
                    .map(Token::Int)
                    .ok_or_else(|| Mismatch::new(tag, format!("`{s}` is not an integer"))),
                Value::Number(_) => Err(Mismatch::new(
                    tag,
                    "got a native JSON number, integers must be passed as strings",
                )),
                other => Err(wrong(json_kind(other))),
            },
            TypeTag::Bool => json.as_bool().map(Token::Bool).ok_or_else(|| wrong(json_kind(json))),
            TypeTag::Address => {
                let bytes = json_hex(json).ok_or_else(|| wrong("a non-hex value"))?;
                if bytes.len() != 20 {
                    return Err(Mismatch::new(tag, format!("got {} byte(s)", bytes.len())));
                }
                Ok(Token::Address(Address::from_slice(&bytes)))
            }
            TypeTag::FixedBytes(_) | TypeTag::Bytes => {
                json_hex(json).map(Token::Bytes).ok_or_else(|| wrong("a non-hex value"))
            }
            TypeTag::String => match json {
                Value::String(s) => Ok(Token::String(s.clone())),
                other => Err(wrong(json_kind(other))),
            },
            TypeTag::Array(inner) | TypeTag::FixedArray(inner, _) => {
                let items = json.as_array().ok_or_else(|| wrong(json_kind(json)))?;
                items
                    .iter()
                    .map(|item| Token::from_json(inner, item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Token::Array)
            }
        }
    }
}

impl From<BigInt> for Token {
    fn from(value: BigInt) -> Self {
        Token::Int(value)
    }
}

impl From<bool> for Token {
    fn from(value: bool) -> Self {
        Token::Bool(value)
    }
}

impl From<Address> for Token {
    fn from(value: Address) -> Self {
        Token::Address(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::String(value.to_string())
    }
}

impl From<Vec<u8>> for Token {
    fn from(value: Vec<u8>) -> Self {
        Token::Bytes(value)
    }
}

fn fit_all(inner: &TypeTag, items: &[Token], outer: &TypeTag) -> Result<Fit, Mismatch> {
    let mut fit = Fit::Exact;
    for (i, item) in items.iter().enumerate() {
        let f = item
            .fit(inner)
            .map_err(|m| Mismatch::new(outer, format!("element {i}: expected {}, {}", m.expected, m.reason)))?;
        fit = fit.min(f);
    }
    Ok(fit)
}

fn check_range(value: &BigInt, bits: usize, signed: bool) -> Result<(), String> {
    let (min, max_exclusive) = if signed {
        let half = BigInt::one() << (bits - 1);
        (-half.clone(), half)
    } else {
        (BigInt::zero(), BigInt::one() << bits)
    };
    if *value < min || *value >= max_exclusive {
        return Err(format!("{value} is out of range"));
    }
    Ok(())
}

/// Parses `123`, `-123`, `0x7b` or `-0x7b`.
pub(crate) fn parse_bigint(s: &str) -> Option<BigInt> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            BigInt::from_str_radix(hex, 16).ok()?
        }
        Some(_) => return None,
        None if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            BigInt::from_str_radix(digits, 10).ok()?
        }
        None => return None,
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn json_hex(json: &Value) -> Option<Vec<u8>> {
    let s = json.as_str()?;
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    hex::decode(digits).ok()
}

fn json_kind(json: &Value) -> &'static str {
    match json {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Left-aligns `value` into a 32-byte two's complement word.
///
/// The caller has already range checked the value against its declared width.
pub(crate) fn int_word(value: &BigInt) -> [u8; 32] {
    let mut word = if value.sign() == Sign::Minus { [0xff; 32] } else { [0u8; 32] };
    let bytes = value.to_signed_bytes_be();
    let start = 32 - bytes.len().min(32);
    word[start..].copy_from_slice(&bytes[bytes.len() - (32 - start)..]);
    word
}
