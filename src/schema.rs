// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

use std::convert::TryFrom;
use std::fmt;

use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SchemaError};

pub(crate) const OPT_PREFIX: char = '-';
pub(crate) const LONG_OPT_PREFIX: &str = "--";
pub(crate) const VALUE_SEPARATOR: char = '=';

const TYPE_NAMES: &str = "\"string\", \"int\", \"number\", \"bool\"";

/// The type a parameter value must have.
///
/// Raw command-line values are always strings; they are converted to a
/// [Value] of the matching kind when accepted.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(try_from = "RawType")]
pub enum TypeSpec {
    /// Any string.
    String,
    /// A signed 64-bit integer.
    Int,
    /// A finite floating point number.
    Number,
    /// `true` or `false`. Bool parameters are flags which are set when
    /// specified.
    Bool,
    /// One of an explicit list of literal values.
    Enum(Vec<String>),
}

impl Default for TypeSpec {
    fn default() -> Self {
        TypeSpec::String
    }
}

impl TypeSpec {
    /// Create an enumerated type from the allowed values.
    pub fn choices<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeSpec::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Convert a raw command-line value, returning [None] if it does not
    /// satisfy the type.
    pub fn coerce(&self, raw: &str) -> Option<Value> {
        match self {
            TypeSpec::String => Some(Value::String(raw.into())),
            TypeSpec::Int => raw.parse::<i64>().ok().map(Value::Int),
            TypeSpec::Number => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Value::Number),
            TypeSpec::Bool => match raw {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            TypeSpec::Enum(choices) => choices
                .iter()
                .any(|c| c == raw)
                .then(|| Value::String(raw.into())),
        }
    }

    /// Check an already typed value (such as a default) against the type.
    ///
    /// Integers are widened for [TypeSpec::Number]. On mismatch the value
    /// is handed back.
    pub fn admit(&self, value: Value) -> std::result::Result<Value, Value> {
        match (self, value) {
            (TypeSpec::String, Value::String(s)) => Ok(Value::String(s)),
            (TypeSpec::Int, Value::Int(n)) => Ok(Value::Int(n)),
            (TypeSpec::Number, Value::Int(n)) => Ok(Value::Number(n as f64)),
            (TypeSpec::Number, Value::Number(n)) if n.is_finite() => Ok(Value::Number(n)),
            (TypeSpec::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
            (TypeSpec::Enum(choices), Value::String(s)) if choices.contains(&s) => {
                Ok(Value::String(s))
            }
            (_, value) => Err(value),
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeSpec::String => write!(f, "string"),
            TypeSpec::Int => write!(f, "int"),
            TypeSpec::Number => write!(f, "number"),
            TypeSpec::Bool => write!(f, "bool"),
            TypeSpec::Enum(choices) => write!(f, "choice ({})", choices.join("|")),
        }
    }
}

/// Type as written in a schema document.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawType {
    Name(String),
    Choices(Vec<String>),
}

impl TryFrom<RawType> for TypeSpec {
    type Error = String;

    fn try_from(raw: RawType) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawType::Name(name) => match name.as_str() {
                "string" => Ok(TypeSpec::String),
                "int" => Ok(TypeSpec::Int),
                "number" | "num" => Ok(TypeSpec::Number),
                "bool" => Ok(TypeSpec::Bool),
                _ => Err(format!(
                    "type can only be one of {}, or a list enumerating valid values (found {:?})",
                    TYPE_NAMES, name
                )),
            },
            RawType::Choices(choices) => Ok(TypeSpec::Enum(choices)),
        }
    }
}

/// A single typed value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Value of a [TypeSpec::Bool] parameter.
    Bool(bool),
    /// Value of a [TypeSpec::Int] parameter.
    Int(i64),
    /// Value of a [TypeSpec::Number] parameter.
    Number(f64),
    /// Value of a [TypeSpec::String] or [TypeSpec::Enum] parameter.
    String(String),
}

impl Value {
    /// The string, for string and enumerated parameters.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer, for int parameters.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The number, for number parameters.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The flag state, for bool parameters.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// The value(s) collected for one parameter.
///
/// Multi parameters always collect [Collected::Many], even for a single
/// value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Collected {
    /// Value of a non-multi parameter.
    One(Value),
    /// Values of a multi parameter, in command-line order.
    Many(Vec<Value>),
}

impl Collected {
    /// All values as a slice (of length one for [Collected::One]).
    pub fn values(&self) -> &[Value] {
        match self {
            Collected::One(value) => std::slice::from_ref(value),
            Collected::Many(values) => values,
        }
    }

    /// The first value, if any.
    pub fn first(&self) -> Option<&Value> {
        self.values().first()
    }
}

impl fmt::Display for Collected {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let values: Vec<String> = self.values().iter().map(ToString::to_string).collect();

        write!(f, "{}", values.join(", "))
    }
}

/// Definition of a parameter as given by the caller.
///
/// Every field is optional; missing fields are given their defaults when
/// the schema is validated (see [Schema::validate]).
///
/// Definitions can be built in code:
///
/// ```rust
/// use declargs::{ParameterDefinition, TypeSpec};
///
/// let jobs = ParameterDefinition::new()
///     .long("jobs")
///     .short('j')
///     .kind(TypeSpec::Int)
///     .optional()
///     .default_value(4)
///     .description("number of workers");
/// ```
///
/// ... or read from a schema document (see [Schema::from_json]), in which
/// case the keys are `longName`, `shortName`, `unflagged`, `type`,
/// `required`, `multi`, `default` and `description`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ParameterDefinition {
    /// Name used as `--name`.
    #[serde(alias = "longname")]
    pub long_name: Option<String>,
    /// Single character used as `-n`.
    #[serde(alias = "shortname")]
    pub short_name: Option<String>,
    /// Set if the parameter takes positional values rather than being a
    /// flag. Only the first and last parameters may be unflagged.
    pub unflagged: Option<bool>,
    /// Value type (default: [TypeSpec::String]).
    #[serde(rename = "type")]
    pub kind: Option<TypeSpec>,
    /// Set if a value must be given (default: `true`).
    pub required: Option<bool>,
    /// Set if more than one value may be given (default: `false`).
    pub multi: Option<bool>,
    /// Value(s) used when none is given. Only valid for optional parameters.
    pub default: Option<Collected>,
    /// Description of the parameter.
    pub description: Option<String>,
}

impl ParameterDefinition {
    /// Create a new (flag) parameter definition.
    pub fn new() -> Self {
        ParameterDefinition::default()
    }

    /// Create a definition for a parameter that takes positional values.
    pub fn unflagged() -> Self {
        ParameterDefinition {
            unflagged: Some(true),
            ..Default::default()
        }
    }

    /// Specify the long name (without the leading `--`).
    pub fn long(self, long: &str) -> Self {
        ParameterDefinition {
            long_name: Some(long.into()),
            ..self
        }
    }

    /// Specify the short name.
    pub fn short(self, short: char) -> Self {
        ParameterDefinition {
            short_name: Some(short.to_string()),
            ..self
        }
    }

    /// Specify the value type.
    pub fn kind(self, kind: TypeSpec) -> Self {
        ParameterDefinition {
            kind: Some(kind),
            ..self
        }
    }

    /// Specify whether the parameter must be given.
    pub fn required(self, required: bool) -> Self {
        ParameterDefinition {
            required: Some(required),
            ..self
        }
    }

    /// Shorthand for `required(false)`.
    pub fn optional(self) -> Self {
        self.required(false)
    }

    /// Allow the parameter to be given more than once.
    pub fn multi(self) -> Self {
        ParameterDefinition {
            multi: Some(true),
            ..self
        }
    }

    /// Specify the value used when none is given.
    pub fn default_value<V: Into<Value>>(self, value: V) -> Self {
        ParameterDefinition {
            default: Some(Collected::One(value.into())),
            ..self
        }
    }

    /// Specify the values used when none are given (multi parameters only).
    pub fn default_values<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        ParameterDefinition {
            default: Some(Collected::Many(values.into_iter().map(Into::into).collect())),
            ..self
        }
    }

    /// Specify the description.
    pub fn description(self, description: &str) -> Self {
        ParameterDefinition {
            description: Some(description.into()),
            ..self
        }
    }
}

/// Where a parameter takes its values from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Position {
    /// Named by a long or short flag.
    Flag,
    /// Unflagged values at the start of the command-line.
    Head,
    /// Unflagged values at the end of the command-line.
    Tail,
}

/// A validated parameter with all defaults filled in.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    name: String,
    long_name: Option<String>,
    short_name: Option<char>,
    position: Position,
    kind: TypeSpec,
    required: bool,
    multi: bool,
    default: Option<Collected>,
    description: Option<String>,
}

impl Parameter {
    /// Name the parameter's values are stored under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Long flag name (without the leading `--`).
    pub fn long_name(&self) -> Option<&str> {
        self.long_name.as_deref()
    }

    /// Short flag name.
    pub fn short_name(&self) -> Option<char> {
        self.short_name
    }

    /// Where the parameter takes its values from.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Value type.
    pub fn kind(&self) -> &TypeSpec {
        &self.kind
    }

    /// Set if a value must be given.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Set if more than one value may be given.
    pub fn is_multi(&self) -> bool {
        self.multi
    }

    /// Value(s) installed when none is given.
    pub fn default(&self) -> Option<&Collected> {
        self.default.as_ref()
    }

    /// Description of the parameter.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns true for bool flags, which are set by name alone.
    pub fn is_switch(&self) -> bool {
        self.kind == TypeSpec::Bool
    }

    /// Name used to refer to the parameter in error messages.
    pub fn display_name(&self) -> String {
        if let Some(long) = &self.long_name {
            return format!("{}{}", LONG_OPT_PREFIX, long);
        }

        if let Some(short) = self.short_name {
            return format!("{}{}", OPT_PREFIX, short);
        }

        match self.position {
            Position::Tail => "trailing unflagged".into(),
            _ => "unflagged".into(),
        }
    }
}

// The top-level object of a schema document, as ordered (name, definition)
// pairs. Repeated keys are kept so that validation reports them.
struct Document(Vec<(String, serde_json::Value)>);

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = Document;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of parameter definitions")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Document, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));

                while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
                    entries.push(entry);
                }

                Ok(Document(entries))
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

/// A validated, ordered set of parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    params: IndexMap<String, Parameter>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl Schema {
    /// Check the parameter definitions and fill in missing fields.
    ///
    /// Definition order matters: only the first and the last definition
    /// may be unflagged. If both are, the first (head) takes unflagged
    /// values before the last (tail) is considered.
    ///
    /// # Errors
    ///
    /// Returns the first rule the definitions break.
    pub fn validate<I, K>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, ParameterDefinition)>,
        K: Into<String>,
    {
        let definitions: Vec<(String, ParameterDefinition)> = definitions
            .into_iter()
            .map(|(name, def)| (name.into(), def))
            .collect();

        if definitions.is_empty() {
            return Err(SchemaError::Empty);
        }

        let last = definitions.len() - 1;

        let mut schema = Schema {
            params: IndexMap::with_capacity(definitions.len()),
            head: None,
            tail: None,
        };

        for (i, (name, def)) in definitions.into_iter().enumerate() {
            if schema.params.contains_key(&name) {
                return Err(SchemaError::DuplicateName(name));
            }

            let named = def.long_name.is_some() || def.short_name.is_some();

            let position = if def.unflagged.unwrap_or(false) {
                if i != 0 && i != last {
                    return Err(SchemaError::InteriorUnflagged(name));
                }

                if named {
                    return Err(SchemaError::UnflaggedWithName(name));
                }

                if i == 0 {
                    Position::Head
                } else {
                    Position::Tail
                }
            } else if !named {
                return Err(SchemaError::MissingName(name));
            } else {
                Position::Flag
            };

            let param = normalize(name, def, position)?;

            schema.check_flags_unique(&param)?;

            match position {
                Position::Head => schema.head = Some(i),
                Position::Tail => schema.tail = Some(i),
                Position::Flag => (),
            }

            schema.params.insert(param.name.clone(), param);
        }

        debug!(
            parameters = schema.params.len(),
            head = ?schema.head().map(Parameter::name),
            tail = ?schema.tail().map(Parameter::name),
            "schema validated"
        );

        Ok(schema)
    }

    /// Read and validate a schema document.
    ///
    /// The document is a JSON object mapping parameter names to
    /// definitions. Key order is the schema order.
    ///
    /// ```rust
    /// use declargs::Schema;
    ///
    /// let schema = Schema::from_json(r#"{
    ///     "out":   { "longName": "out", "shortName": "o" },
    ///     "files": { "unflagged": true, "multi": true, "required": false }
    /// }"#).unwrap();
    ///
    /// assert!(schema.tail().is_some());
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Document =
            serde_json::from_str(json).map_err(|e| SchemaError::Document(e.to_string()))?;

        let definitions = document
            .0
            .into_iter()
            .map(
                |(name, raw)| match serde_json::from_value::<ParameterDefinition>(raw) {
                    Ok(def) => Ok((name, def)),
                    Err(e) => Err(SchemaError::Malformed {
                        name,
                        reason: e.to_string(),
                    }),
                },
            )
            .collect::<Result<Vec<_>>>()?;

        Schema::validate(definitions)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Always false for a validated schema.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameters in schema order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.params.get_index_of(name)
    }

    /// The unflagged parameter at the start, if any.
    pub fn head(&self) -> Option<&Parameter> {
        self.head.and_then(|i| self.params.get_index(i)).map(|(_, p)| p)
    }

    /// The unflagged parameter at the end, if any.
    pub fn tail(&self) -> Option<&Parameter> {
        self.tail.and_then(|i| self.params.get_index(i)).map(|(_, p)| p)
    }

    /// Find the parameter for `--long`.
    pub fn find_long(&self, long: &str) -> Option<&Parameter> {
        self.iter().find(|p| p.long_name.as_deref() == Some(long))
    }

    /// Find the parameter for `-c`.
    pub fn find_short(&self, short: char) -> Option<&Parameter> {
        self.iter().find(|p| p.short_name == Some(short))
    }

    fn check_flags_unique(&self, param: &Parameter) -> Result<()> {
        if let Some(long) = param.long_name() {
            if self.find_long(long).is_some() {
                return Err(SchemaError::DuplicateFlag {
                    name: param.name.clone(),
                    flag: format!("{}{}", LONG_OPT_PREFIX, long),
                });
            }
        }

        if let Some(short) = param.short_name {
            if self.find_short(short).is_some() {
                return Err(SchemaError::DuplicateFlag {
                    name: param.name.clone(),
                    flag: format!("{}{}", OPT_PREFIX, short),
                });
            }
        }

        Ok(())
    }
}

/// Field level checks for a single definition.
fn normalize(name: String, def: ParameterDefinition, position: Position) -> Result<Parameter> {
    let long_name = match def.long_name {
        Some(long)
            if long.is_empty()
                || long.starts_with(OPT_PREFIX)
                || long.contains(|c: char| c == VALUE_SEPARATOR || c.is_whitespace()) =>
        {
            return Err(SchemaError::InvalidLongName { name, value: long });
        }
        long => long,
    };

    let short_name = match def.short_name {
        Some(short) => {
            let mut chars = short.chars();

            match (chars.next(), chars.next()) {
                (Some(c), None) if c != OPT_PREFIX && !c.is_whitespace() => Some(c),
                _ => return Err(SchemaError::InvalidShortName { name, value: short }),
            }
        }
        None => None,
    };

    let kind = def.kind.unwrap_or_default();
    let required = def.required.unwrap_or(true);
    let multi = def.multi.unwrap_or(false);

    if let TypeSpec::Enum(choices) = &kind {
        if choices.is_empty() {
            return Err(SchemaError::EmptyChoices(name));
        }
    }

    if kind == TypeSpec::Bool {
        if position != Position::Flag {
            return Err(SchemaError::BoolUnflagged(name));
        }

        if multi {
            return Err(SchemaError::BoolMulti(name));
        }
    }

    let default = match def.default {
        Some(_) if required => return Err(SchemaError::DefaultOnRequired(name)),
        Some(default) => Some(normalize_default(&name, &kind, multi, default)?),
        None => None,
    };

    Ok(Parameter {
        name,
        long_name,
        short_name,
        position,
        kind,
        required,
        multi,
        default,
        description: def.description,
    })
}

fn normalize_default(
    name: &str,
    kind: &TypeSpec,
    multi: bool,
    default: Collected,
) -> Result<Collected> {
    let admit = |value: Value| {
        kind.admit(value)
            .map_err(|value| SchemaError::DefaultTypeMismatch {
                name: name.into(),
                value: value.to_string(),
                expected: kind.to_string(),
            })
    };

    match default {
        Collected::One(value) if multi => Ok(Collected::Many(vec![admit(value)?])),
        Collected::One(value) => Ok(Collected::One(admit(value)?)),
        Collected::Many(_) if !multi => Err(SchemaError::DefaultListNotMulti(name.into())),
        Collected::Many(values) => values
            .into_iter()
            .map(admit)
            .collect::<Result<Vec<_>>>()
            .map(Collected::Many),
    }
}
