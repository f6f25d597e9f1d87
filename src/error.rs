// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

use thiserror::Error;

/// Errors found when a schema is validated.
///
/// These are programmer errors: no parser is created.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum SchemaError {
    //------------------------------
    // Structural errors
    //------------------------------
    /// No parameters means nothing can be parsed.
    #[error("schema has no parameters")]
    Empty,

    /// Two schema entries share a parameter name.
    #[error("parameter {0:?} is defined more than once")]
    DuplicateName(String),

    /// Unflagged parameters may only be the first or last entry.
    #[error("parameter {0:?}: unflagged parameters are only allowed at the beginning or end")]
    InteriorUnflagged(String),

    /// An unflagged parameter cannot also be named.
    #[error("parameter {0:?}: neither a long nor a short name may be given if a parameter is unflagged")]
    UnflaggedWithName(String),

    /// A flag parameter needs a name to be found by.
    #[error("parameter {0:?}: either a long or a short name must be given unless a parameter is unflagged")]
    MissingName(String),

    /// Two flag parameters would be selected by the same flag.
    #[error("parameter {name:?}: flag {flag:?} is already used by another parameter")]
    DuplicateFlag {
        /// Offending parameter.
        name: String,
        /// The flag as typed on the command-line.
        flag: String,
    },

    //------------------------------
    // Field errors
    //------------------------------
    /// Long names are words: no dashes at the start, no `=` and no spaces.
    #[error("parameter {name:?}: invalid long name {value:?}")]
    InvalidLongName {
        /// Offending parameter.
        name: String,
        /// Rejected long name.
        value: String,
    },

    /// Short names are a single character other than `-`.
    #[error("parameter {name:?}: short name {value:?} must be a single character other than '-'")]
    InvalidShortName {
        /// Offending parameter.
        name: String,
        /// Rejected short name.
        value: String,
    },

    /// An enumerated type allows no values at all.
    #[error("parameter {0:?}: an enumerated type needs at least one value")]
    EmptyChoices(String),

    /// Bool parameters are flags.
    #[error("parameter {0:?}: a bool parameter cannot be unflagged")]
    BoolUnflagged(String),

    /// Bool parameters are either set or not.
    #[error("parameter {0:?}: a bool parameter cannot be multi")]
    BoolMulti(String),

    /// A default is pointless for a required parameter.
    #[error("parameter {0:?}: a required parameter cannot have a default")]
    DefaultOnRequired(String),

    /// Only multi parameters may default to a list.
    #[error("parameter {0:?}: a list default needs a multi parameter")]
    DefaultListNotMulti(String),

    /// Default values must satisfy the parameter type.
    #[error("parameter {name:?}: default value {value} is not a valid {expected}")]
    DefaultTypeMismatch {
        /// Offending parameter.
        name: String,
        /// Rejected default value.
        value: String,
        /// The parameter type.
        expected: String,
    },

    /// The definition could not be read (unknown keys, wrong field types, ...).
    #[error("parameter {name:?}: {reason}")]
    Malformed {
        /// Offending parameter.
        name: String,
        /// What the decoder complained about.
        reason: String,
    },

    /// The schema document as a whole could not be read.
    #[error("invalid schema document: {0}")]
    Document(String),
}

/// A problem with the command-line.
///
/// These are user errors. They are collected in a
/// [ParseResult](crate::ParseResult) rather than returned, so the user
/// sees all of them in one run.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ParseError {
    /// Flag that no parameter answers to.
    #[error("unknown parameter {0}")]
    UnknownParameter(String),

    /// Short flags cannot be combined (`-d -v` rather than `-dv`).
    #[error("option bundling not supported: {0}")]
    NoBundling(String),

    /// The value does not satisfy the parameter type.
    #[error("value {value:?} is not a valid {expected} for parameter {param}")]
    InvalidType {
        /// Presentation name of the parameter.
        param: String,
        /// Rejected value.
        value: String,
        /// The parameter type.
        expected: String,
    },

    /// A second value for a non-multi parameter.
    #[error("multiple values given for non-repeatable parameter {0}")]
    MultipleValues(String),

    /// A flag that takes a value was not given one.
    #[error("missing value for parameter {0}")]
    MissingValue(String),

    /// Unflagged argument that belongs to neither the head nor the tail.
    #[error("unflagged argument {0:?} could not be placed")]
    Stray(String),

    /// Trailing unflagged arguments with no tail parameter to take them.
    #[error("{0} trailing unflagged argument(s) dropped")]
    DroppedTrailing(usize),

    /// A required parameter got no value.
    #[error("missing required parameter {0}")]
    MissingRequired(String),
}

/// Convenience type that allows a function to be defined as returning a
/// [Result], but which only requires the success type to be specified,
/// defaulting the error type to [SchemaError].
pub type Result<T, E = SchemaError> = std::result::Result<T, E>;
