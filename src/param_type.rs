//! ABI parameter types.

use std::fmt;
use std::str::FromStr;

/// One ABI parameter type, as declared in an interface description.
///
/// `Display` renders the canonical form used in method signatures, e.g.
/// `uint256`, `bytes32[]`, `address[2][]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    /// Unsigned integer with the given bit width.
    Uint(usize),
    /// Two's complement signed integer with the given bit width.
    Int(usize),
    Bool,
    Address,
    /// `bytes<N>`, 1 to 32 bytes.
    FixedBytes(usize),
    Bytes,
    String,
    /// `T[]`
    Array(Box<TypeTag>),
    /// `T[K]`
    FixedArray(Box<TypeTag>, usize),
}

impl TypeTag {
    /// Whether values of this type are stored behind an offset in the tail
    /// region rather than inline in the head.
    pub fn is_dynamic(&self) -> bool {
        match self {
            TypeTag::Bytes | TypeTag::String | TypeTag::Array(_) => true,
            TypeTag::FixedArray(inner, _) => inner.is_dynamic(),
            _ => false,
        }
    }

    /// Number of 32-byte words this type occupies in a head region.
    pub fn head_words(&self) -> usize {
        match self {
            TypeTag::FixedArray(inner, len) if !inner.is_dynamic() => inner.head_words().saturating_mul(*len),
            _ => 1,
        }
    }

    /// Canonical signature form, the same text `Display` produces.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Uint(bits) => write!(f, "uint{bits}"),
            TypeTag::Int(bits) => write!(f, "int{bits}"),
            TypeTag::Bool => f.write_str("bool"),
            TypeTag::Address => f.write_str("address"),
            TypeTag::FixedBytes(len) => write!(f, "bytes{len}"),
            TypeTag::Bytes => f.write_str("bytes"),
            TypeTag::String => f.write_str("string"),
            TypeTag::Array(inner) => write!(f, "{inner}[]"),
            TypeTag::FixedArray(inner, len) => write!(f, "{inner}[{len}]"),
        }
    }
}

/// Reason a type string was rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized type `{0}`")]
pub struct UnknownType(pub String);

/// Deepest array nesting accepted in a type string.
pub const MAX_ARRAY_DEPTH: usize = 32;

impl FromStr for TypeTag {
    type Err = UnknownType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownType(s.to_string());

        // Array suffixes bind from the right: `uint8[2][]` is a dynamic
        // array of `uint8[2]`. Dimensions are collected outermost first.
        let mut base = s;
        let mut dims = Vec::new();
        while let Some(body) = base.strip_suffix(']') {
            if dims.len() == MAX_ARRAY_DEPTH {
                return Err(unknown());
            }
            let open = body.rfind('[').ok_or_else(unknown)?;
            let dim = &body[open + 1..];
            dims.push(if dim.is_empty() { None } else { Some(parse_decimal(dim).ok_or_else(unknown)?) });
            base = &body[..open];
        }

        let elementary = parse_elementary(base).ok_or_else(unknown)?;
        Ok(dims.into_iter().rev().fold(elementary, |inner, dim| match dim {
            None => TypeTag::Array(Box::new(inner)),
            Some(len) => TypeTag::FixedArray(Box::new(inner), len),
        }))
    }
}

fn parse_elementary(s: &str) -> Option<TypeTag> {
    match s {
        "bool" => return Some(TypeTag::Bool),
        "address" => return Some(TypeTag::Address),
        "bytes" => return Some(TypeTag::Bytes),
        "string" => return Some(TypeTag::String),
        "uint" => return Some(TypeTag::Uint(256)),
        "int" => return Some(TypeTag::Int(256)),
        _ => {}
    }

    if let Some(bits) = s.strip_prefix("uint") {
        return parse_width(bits).map(TypeTag::Uint);
    }
    if let Some(bits) = s.strip_prefix("int") {
        return parse_width(bits).map(TypeTag::Int);
    }
    let len = parse_decimal(s.strip_prefix("bytes")?)?;
    (1..=32).contains(&len).then_some(TypeTag::FixedBytes(len))
}

fn parse_width(bits: &str) -> Option<usize> {
    parse_decimal(bits).filter(|bits| (8..=256).contains(bits) && bits % 8 == 0)
}

// Rejects signs, whitespace and leading zeros so that each width has exactly
// one spelling.
fn parse_decimal(s: &str) -> Option<usize> {
    if s.is_empty() || s.starts_with('0') || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
