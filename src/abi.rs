//! Interface descriptions (JSON ABI documents).
//!
//! Parsing is strict: the document must be a JSON array of entries whose
//! fields are all known, whose `type` is one of the four supported roles and
//! whose parameter types are all recognized. Anything else is rejected with
//! [`AbiError::MalformedInterface`] and no partial description is produced.

use std::collections::BTreeSet;
use std::str::FromStr;

use revm::primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};

use crate::error::AbiError;
use crate::param_type::TypeTag;

/// Role of an entry in an interface description.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodRole {
    Function,
    Constructor,
    Event,
    Fallback,
}

/// Declared state mutability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

impl Mutability {
    /// `pure` and `view` methods never modify state.
    pub fn is_read_only(self) -> bool {
        matches!(self, Mutability::Pure | Mutability::View)
    }
}

/// A named, typed parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: TypeTag,
    /// Only meaningful for event inputs.
    pub indexed: Option<bool>,
    pub internal_type: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>, kind: TypeTag) -> Self {
        Self { name: name.into(), kind, indexed: None, internal_type: None }
    }
}

/// One callable entry (function, constructor, event or fallback).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodSpec {
    pub role: MethodRole,
    /// Empty for constructors and fallbacks.
    pub name: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    /// Absent only for events.
    pub mutability: Option<Mutability>,
    /// Only meaningful for events.
    pub anonymous: bool,
}

impl MethodSpec {
    /// Input types in declaration order.
    pub fn input_types(&self) -> Vec<TypeTag> {
        self.inputs.iter().map(|p| p.kind.clone()).collect()
    }

    /// Canonical signature, `name(T1,T2,...)`.
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|p| p.kind.canonical()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// First four bytes of the Keccak-256 hash of [`Self::signature`].
    pub fn selector(&self) -> [u8; 4] {
        crate::encoder::selector(&self.signature())
    }

    /// Full Keccak-256 hash of the signature, used as the first log topic of
    /// non-anonymous events.
    pub fn event_topic(&self) -> B256 {
        keccak256(self.signature().as_bytes())
    }

    pub fn is_read_only(&self) -> bool {
        self.mutability.is_some_and(Mutability::is_read_only)
    }
}

/// Parse-time switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    /// Derive mutability from the pre-0.4.16 `constant`/`payable` fields when
    /// `stateMutability` is absent.
    pub legacy_mutability: bool,
    /// Upper bound on the document length in bytes, 0 for no bound.
    pub max_len: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { legacy_mutability: true, max_len: 0 }
    }
}

/// An ordered set of [`MethodSpec`]s, unique by role, name and input types.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterfaceDescription {
    methods: Vec<MethodSpec>,
}

impl InterfaceDescription {
    /// Builds a description, rejecting entries of the same role that repeat a
    /// (name, input types) pair.
    pub fn new(methods: Vec<MethodSpec>) -> Result<Self, AbiError> {
        let mut seen = BTreeSet::new();
        for m in &methods {
            if !seen.insert((m.role, m.name.as_str(), m.input_types())) {
                return Err(AbiError::MalformedInterface(format!(
                    "duplicate entry `{}`",
                    m.signature()
                )));
            }
        }
        Ok(Self { methods })
    }

    pub fn methods(&self) -> &[MethodSpec] {
        &self.methods
    }

    /// Callable functions named `name`, in declaration order.
    pub fn functions<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodSpec> + 'a {
        self.methods
            .iter()
            .filter(move |m| m.role == MethodRole::Function && m.name == name)
    }

    pub fn constructor(&self) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.role == MethodRole::Constructor)
    }

    pub fn events(&self) -> impl Iterator<Item = &MethodSpec> {
        self.methods.iter().filter(|m| m.role == MethodRole::Event)
    }

    /// Canonical JSON text of this description.
    pub fn to_json(&self) -> String {
        let raw: Vec<RawEntry> = self.methods.iter().map(RawEntry::from_spec).collect();
        // Serializing plain strings, bools and vectors cannot fail.
        serde_json::to_string(&raw).unwrap_or_default()
    }
}

impl FromStr for InterfaceDescription {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_with(s, ParseOptions::default())
    }
}

/// Parses a JSON interface description with default options.
pub fn parse(text: &str) -> Result<InterfaceDescription, AbiError> {
    parse_with(text, ParseOptions::default())
}

/// Parses a JSON interface description.
pub fn parse_with(text: &str, options: ParseOptions) -> Result<InterfaceDescription, AbiError> {
    if options.max_len > 0 && text.len() > options.max_len {
        return Err(AbiError::MalformedInterface(format!(
            "document is {} bytes, limit is {}",
            text.len(),
            options.max_len
        )));
    }
    let raw: Vec<RawEntry> =
        serde_json::from_str(text).map_err(|e| AbiError::MalformedInterface(e.to_string()))?;
    let methods = raw
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            entry
                .into_spec(options)
                .map_err(|reason| AbiError::MalformedInterface(format!("entry {i}: {reason}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    InterfaceDescription::new(methods)
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawEntry {
    #[serde(rename = "type")]
    role: MethodRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inputs: Option<Vec<RawParam>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    outputs: Option<Vec<RawParam>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state_mutability: Option<Mutability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    constant: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    anonymous: Option<bool>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawParam {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    indexed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    internal_type: Option<String>,
}

impl RawParam {
    fn into_param(self) -> Result<Param, String> {
        let kind = self.kind.parse::<TypeTag>().map_err(|e| e.to_string())?;
        Ok(Param { name: self.name, kind, indexed: self.indexed, internal_type: self.internal_type })
    }

    fn from_param(p: &Param) -> Self {
        Self {
            name: p.name.clone(),
            kind: p.kind.canonical(),
            indexed: p.indexed,
            internal_type: p.internal_type.clone(),
        }
    }
}

impl RawEntry {
    fn into_spec(self, options: ParseOptions) -> Result<MethodSpec, String> {
        let role = self.role;
        let needs_name = matches!(role, MethodRole::Function | MethodRole::Event);
        let needs_inputs = role != MethodRole::Fallback;
        let needs_outputs = role == MethodRole::Function;
        let needs_mutability = role != MethodRole::Event;

        let name = match self.name {
            Some(name) if needs_name && name.is_empty() => return Err("empty `name`".into()),
            Some(name) => name,
            None if needs_name => return Err("missing `name`".into()),
            None => String::new(),
        };
        if self.inputs.is_none() && needs_inputs {
            return Err("missing `inputs`".into());
        }
        if self.outputs.is_none() && needs_outputs {
            return Err("missing `outputs`".into());
        }

        let legacy = || match (self.constant, self.payable) {
            (_, Some(true)) => Some(Mutability::Payable),
            (Some(true), _) => Some(Mutability::View),
            (Some(false), _) | (_, Some(false)) => Some(Mutability::NonPayable),
            (None, None) => None,
        };
        let mutability = match self.state_mutability {
            Some(m) => Some(m),
            None if options.legacy_mutability => legacy(),
            None => None,
        };
        if mutability.is_none() && needs_mutability {
            return Err("missing `stateMutability`".into());
        }

        let params = |raw: Option<Vec<RawParam>>| {
            raw.unwrap_or_default()
                .into_iter()
                .map(RawParam::into_param)
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(MethodSpec {
            role,
            name,
            inputs: params(self.inputs)?,
            outputs: params(self.outputs)?,
            mutability,
            anonymous: self.anonymous.unwrap_or(false),
        })
    }

    fn from_spec(m: &MethodSpec) -> Self {
        let params = |ps: &[Param]| ps.iter().map(RawParam::from_param).collect::<Vec<_>>();
        Self {
            role: m.role,
            name: (!m.name.is_empty()).then(|| m.name.clone()),
            inputs: (m.role != MethodRole::Fallback || !m.inputs.is_empty())
                .then(|| params(&m.inputs)),
            outputs: (m.role == MethodRole::Function || !m.outputs.is_empty())
                .then(|| params(&m.outputs)),
            state_mutability: m.mutability,
            constant: None,
            payable: None,
            anonymous: (m.role == MethodRole::Event).then_some(m.anonymous),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_STORAGE: &str = r#"[{"constant":false,"inputs":[{"name":"x","type":"uint256"}],"name":"set","outputs":[],"payable":false,"stateMutability":"nonpayable","type":"function"},{"constant":true,"inputs":[],"name":"get","outputs":[{"name":"","type":"uint256"}],"payable":false,"stateMutability":"view","type":"function"},{"inputs":[],"payable":false,"stateMutability":"nonpayable","type":"constructor"}]"#;

    #[test]
    fn parses_simple_storage() {
        let abi = parse(SIMPLE_STORAGE).expect("valid abi");
        assert_eq!(abi.methods().len(), 3);
        let set = abi.functions("set").next().expect("set");
        assert_eq!(set.signature(), "set(uint256)");
        assert_eq!(set.mutability, Some(Mutability::NonPayable));
        let get = abi.functions("get").next().expect("get");
        assert!(get.is_read_only());
        assert_eq!(get.outputs[0].kind, TypeTag::Uint(256));
        assert!(abi.constructor().is_some());
    }

    #[test]
    fn canonical_text_parses_back_to_the_same_description() {
        let abi = parse(SIMPLE_STORAGE).expect("valid abi");
        let text = abi.to_json();
        assert!(!text.contains("constant"));
        assert_eq!(parse(&text).expect("canonical text"), abi);
    }

    #[test]
    fn legacy_mutability_fields() {
        let text = r#"[{"constant":true,"inputs":[],"name":"get","outputs":[],"type":"function"},
                       {"payable":true,"inputs":[],"name":"pay","outputs":[],"type":"function"}]"#;
        let abi = parse(text).expect("legacy abi");
        assert_eq!(abi.methods()[0].mutability, Some(Mutability::View));
        assert_eq!(abi.methods()[1].mutability, Some(Mutability::Payable));

        let strict = ParseOptions { legacy_mutability: false, ..Default::default() };
        assert!(matches!(parse_with(text, strict), Err(AbiError::MalformedInterface(_))));
    }

    #[test]
    fn rejects_malformed_documents() {
        let cases = [
            "SimpleStorageABI:asdf",
            "{}",
            r#"[{"inputs":[],"name":"f","outputs":[],"stateMutability":"view"}]"#,
            r#"[{"type":"receive","stateMutability":"payable"}]"#,
            r#"[{"type":"function","name":"f","outputs":[],"stateMutability":"view"}]"#,
            r#"[{"type":"function","name":"f","inputs":[],"stateMutability":"view"}]"#,
            r#"[{"type":"function","name":"f","inputs":[],"outputs":[]}]"#,
            r#"[{"type":"function","inputs":[],"outputs":[],"stateMutability":"view"}]"#,
            r#"[{"type":"function","name":"f","inputs":[{"name":"a","type":"uint7"}],"outputs":[],"stateMutability":"view"}]"#,
            r#"[{"type":"function","name":"f","inputs":[],"outputs":[],"stateMutability":"view","gas":100}]"#,
            r#"[{"type":"function","name":"f","inputs":[],"outputs":[],"stateMutability":"sometimes"}]"#,
        ];
        for text in cases {
            assert!(
                matches!(parse(text), Err(AbiError::MalformedInterface(_))),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_duplicate_signatures() {
        let text = r#"[
            {"type":"function","name":"f","inputs":[{"name":"a","type":"uint"}],"outputs":[],"stateMutability":"view"},
            {"type":"function","name":"f","inputs":[{"name":"b","type":"uint256"}],"outputs":[],"stateMutability":"pure"}
        ]"#;
        let err = parse(text).unwrap_err();
        assert_eq!(err, AbiError::MalformedInterface("duplicate entry `f(uint256)`".into()));
    }

    #[test]
    fn same_signature_in_different_roles() {
        let text = r#"[
            {"type":"constructor","inputs":[],"stateMutability":"nonpayable"},
            {"type":"fallback","stateMutability":"payable"}
        ]"#;
        let abi = parse(text).expect("constructor and fallback");
        assert_eq!(abi.methods().len(), 2);
        assert!(abi.constructor().is_some());

        let text = r#"[
            {"type":"event","name":"Ping","anonymous":false,"inputs":[{"name":"n","type":"uint256","indexed":false}]},
            {"type":"function","name":"Ping","inputs":[{"name":"n","type":"uint256"}],"outputs":[],"stateMutability":"nonpayable"}
        ]"#;
        let abi = parse(text).expect("event and function sharing a signature");
        assert_eq!(abi.events().count(), 1);
        assert_eq!(abi.functions("Ping").count(), 1);
        assert_eq!(parse(&abi.to_json()).expect("round trip"), abi);

        let text = r#"[
            {"type":"event","name":"Ping","inputs":[{"name":"n","type":"uint256"}]},
            {"type":"event","name":"Ping","inputs":[{"name":"m","type":"uint"}]}
        ]"#;
        let err = parse(text).unwrap_err();
        assert_eq!(err, AbiError::MalformedInterface("duplicate entry `Ping(uint256)`".into()));
    }

    #[test]
    fn overloads_by_type_are_allowed() {
        let text = r#"[
            {"type":"function","name":"f","inputs":[{"name":"a","type":"uint256"}],"outputs":[],"stateMutability":"view"},
            {"type":"function","name":"f","inputs":[{"name":"a","type":"string"}],"outputs":[],"stateMutability":"view"}
        ]"#;
        assert_eq!(parse(text).expect("overloads").functions("f").count(), 2);
    }

    #[test]
    fn events_keep_indexed_and_anonymous() {
        let text = r#"[{"type":"event","name":"Transfer","anonymous":false,"inputs":[
            {"name":"from","type":"address","indexed":true},
            {"name":"to","type":"address","indexed":true},
            {"name":"value","type":"uint256","indexed":false}]}]"#;
        let abi = parse(text).expect("event abi");
        let transfer = abi.events().next().expect("event");
        assert_eq!(transfer.mutability, None);
        assert_eq!(transfer.inputs[0].indexed, Some(true));
        assert_eq!(
            hex::encode(transfer.event_topic()),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert_eq!(parse(&abi.to_json()).expect("round trip"), abi);
    }

    #[test]
    fn size_limit() {
        let opts = ParseOptions { max_len: 16, ..Default::default() };
        assert!(matches!(parse_with(SIMPLE_STORAGE, opts), Err(AbiError::MalformedInterface(_))));
    }
}
