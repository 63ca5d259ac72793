//! Call payload encoding.
//!
//! A payload is the 4-byte selector of the resolved method followed by the
//! arguments in the standard two-region layout: one head slot per argument
//! (the value itself for static types, a byte offset for dynamic ones) and a
//! tail holding the dynamic contents in declaration order.

use revm::primitives::keccak256;
use serde_json::Value;
use tracing::trace;

use crate::abi::{parse_with, InterfaceDescription, MethodRole, MethodSpec, ParseOptions};
use crate::error::AbiError;
use crate::param_type::TypeTag;
use crate::token::{int_word, Token};
use crate::utils::bytes_to_hex;

const WORD: usize = 32;

/// First four bytes of the Keccak-256 hash of a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// The functions sharing one name. Choosing among them needs the arguments,
/// see [`Overloads::select`].
#[derive(Clone, Debug)]
pub struct Overloads<'a> {
    name: String,
    candidates: Vec<&'a MethodSpec>,
}

impl<'a> Overloads<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn candidates(&self) -> &[&'a MethodSpec] {
        &self.candidates
    }

    /// The method when the name is not overloaded.
    pub fn single(&self) -> Option<&'a MethodSpec> {
        match self.candidates.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Picks the overload for `args`.
    ///
    /// Only overloads with `args.len()` inputs are considered. Among those
    /// accepting every argument, the best total fit wins and ties go to the
    /// lexicographically smallest signature, so declaration order never
    /// matters.
    pub fn select(&self, args: &[Token]) -> Result<&'a MethodSpec, AbiError> {
        self.pick(args.len(), |m| score_tokens(m, args))
    }

    fn pick(
        &self,
        arity: usize,
        score: impl Fn(&MethodSpec) -> Result<u32, AbiError>,
    ) -> Result<&'a MethodSpec, AbiError> {
        let same_arity: Vec<&'a MethodSpec> =
            self.candidates.iter().copied().filter(|m| m.inputs.len() == arity).collect();
        if same_arity.is_empty() {
            return Err(match self.single() {
                Some(m) => AbiError::ArityMismatch {
                    method: self.name.clone(),
                    expected: m.inputs.len(),
                    actual: arity,
                },
                None => AbiError::NoMatchingOverload(self.name.clone()),
            });
        }

        let mut best: Option<(u32, String, &'a MethodSpec)> = None;
        let mut last_err = None;
        for m in same_arity.iter().copied() {
            match score(m) {
                Ok(s) => {
                    let sig = m.signature();
                    let better = match &best {
                        None => true,
                        Some((bs, bsig, _)) => s > *bs || (s == *bs && sig < *bsig),
                    };
                    if better {
                        best = Some((s, sig, m));
                    }
                }
                Err(e) => last_err = Some(e),
            }
        }
        match (best, last_err) {
            (Some((_, _, m)), _) => Ok(m),
            // With a single candidate the caller learns which argument failed.
            (None, Some(e)) if same_arity.len() == 1 => Err(e),
            (None, _) => Err(AbiError::NoMatchingOverload(self.name.clone())),
        }
    }
}

/// Looks up the callable functions named `name`.
pub fn resolve<'a>(description: &'a InterfaceDescription, name: &str) -> Result<Overloads<'a>, AbiError> {
    let candidates: Vec<&MethodSpec> = description
        .methods()
        .iter()
        .filter(|m| m.role == MethodRole::Function && m.name == name)
        .collect();
    if candidates.is_empty() {
        return Err(AbiError::MethodNotFound(name.to_string()));
    }
    Ok(Overloads { name: name.to_string(), candidates })
}

impl InterfaceDescription {
    pub fn resolve(&self, name: &str) -> Result<Overloads<'_>, AbiError> {
        resolve(self, name)
    }
}

/// Encodes a call to `name` with `args`, selector included.
pub fn encode(description: &InterfaceDescription, name: &str, args: &[Token]) -> Result<Vec<u8>, AbiError> {
    let method = resolve(description, name)?.select(args)?;
    encode_call(method, args)
}

/// Encodes a call from host-supplied JSON arguments.
///
/// Each overload of matching arity converts the arguments against its own
/// parameter types; the overload is then chosen exactly as [`encode`] does.
pub fn encode_json(description: &InterfaceDescription, name: &str, args: &[Value]) -> Result<Vec<u8>, AbiError> {
    let overloads = resolve(description, name)?;
    let convert = |m: &MethodSpec| -> Result<Vec<Token>, AbiError> {
        m.inputs
            .iter()
            .zip(args)
            .enumerate()
            .map(|(i, (p, json))| Token::from_json(&p.kind, json).map_err(|e| e.at(&m.name, i)))
            .collect()
    };
    let method = overloads.pick(args.len(), |m| {
        let tokens = convert(m)?;
        score_tokens(m, &tokens)
    })?;
    encode_call(method, &convert(method)?)
}

/// Encodes constructor arguments, which carry no selector and are appended
/// to the deployment code.
pub fn encode_constructor(description: &InterfaceDescription, args: &[Token]) -> Result<Vec<u8>, AbiError> {
    let types = match description.constructor() {
        Some(ctor) => {
            check_args("constructor", ctor, args)?;
            ctor.input_types()
        }
        None if args.is_empty() => Vec::new(),
        None => {
            return Err(AbiError::ArityMismatch {
                method: "constructor".into(),
                expected: 0,
                actual: args.len(),
            })
        }
    };
    Ok(encode_tokens(&types, args))
}

/// Parses `text`, encodes the call and renders it as `0x`-prefixed hex.
pub fn generate_payload(text: &str, name: &str, args: &[Token]) -> Result<String, AbiError> {
    generate_payload_with(text, name, args, ParseOptions::default())
}

pub fn generate_payload_with(
    text: &str,
    name: &str,
    args: &[Token],
    options: ParseOptions,
) -> Result<String, AbiError> {
    let description = parse_with(text, options)?;
    let payload = encode(&description, name, args)?;
    trace!(method = name, len = payload.len(), "generated call payload");
    Ok(bytes_to_hex(&payload))
}

fn score_tokens(m: &MethodSpec, tokens: &[Token]) -> Result<u32, AbiError> {
    m.inputs
        .iter()
        .zip(tokens)
        .enumerate()
        .map(|(i, (p, t))| t.fit(&p.kind).map(|f| f as u32).map_err(|e| e.at(&m.name, i)))
        .sum()
}

fn check_args(label: &str, m: &MethodSpec, args: &[Token]) -> Result<(), AbiError> {
    if m.inputs.len() != args.len() {
        return Err(AbiError::ArityMismatch {
            method: label.to_string(),
            expected: m.inputs.len(),
            actual: args.len(),
        });
    }
    score_tokens(m, args).map(|_| ())
}

fn encode_call(method: &MethodSpec, args: &[Token]) -> Result<Vec<u8>, AbiError> {
    check_args(&method.name, method, args)?;
    let mut out = method.selector().to_vec();
    out.extend(encode_tokens(&method.input_types(), args));
    Ok(out)
}

/// Head/tail encoding of a sequence of already validated values.
fn encode_tokens(types: &[TypeTag], tokens: &[Token]) -> Vec<u8> {
    let head_len: usize = types.iter().map(|t| t.head_words() * WORD).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for (kind, token) in types.iter().zip(tokens) {
        let encoded = encode_token(kind, token);
        if kind.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend(encoded);
        } else {
            head.extend(encoded);
        }
    }
    head.extend(tail);
    head
}

fn encode_token(kind: &TypeTag, token: &Token) -> Vec<u8> {
    match (kind, token) {
        (TypeTag::Uint(_) | TypeTag::Int(_), Token::Int(v)) => int_word(v).to_vec(),
        (TypeTag::Bool, Token::Bool(b)) => usize_word(usize::from(*b)).to_vec(),
        (TypeTag::Address, Token::Address(a)) => left_pad(a.as_slice()),
        (TypeTag::Address, Token::Bytes(b)) => left_pad(b),
        (TypeTag::FixedBytes(_), Token::Bytes(b)) => right_pad(b),
        (TypeTag::Bytes, Token::Bytes(b)) => length_prefixed(b),
        (TypeTag::String, Token::String(s)) => length_prefixed(s.as_bytes()),
        (TypeTag::Array(inner), Token::Array(items)) => {
            let mut out = usize_word(items.len()).to_vec();
            out.extend(encode_tokens(&vec![(**inner).clone(); items.len()], items));
            out
        }
        (TypeTag::FixedArray(inner, _), Token::Array(items)) => {
            encode_tokens(&vec![(**inner).clone(); items.len()], items)
        }
        // Unreachable for tokens that passed `fit`.
        _ => Vec::new(),
    }
}

fn usize_word(n: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(n as u64).to_be_bytes());
    word
}

fn left_pad(bytes: &[u8]) -> Vec<u8> {
    let mut word = vec![0u8; WORD - bytes.len()];
    word.extend_from_slice(bytes);
    word
}

fn right_pad(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    out.resize(bytes.len().div_ceil(WORD) * WORD, 0);
    out
}

fn length_prefixed(bytes: &[u8]) -> Vec<u8> {
    let mut out = usize_word(bytes.len()).to_vec();
    out.extend(right_pad(bytes));
    out
}
