// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

#![deny(missing_docs)]
#![forbid(unsafe_code)]

//! Declarative, schema-driven command-line argument parsing.
//!
//! You describe the parameters your program accepts; the parser checks the
//! description once, then classifies, type checks and collects the values
//! from a command-line, gathering _all_ the problems it finds rather than
//! stopping at the first one.
//!
//! ---
//!
//! Table of contents:
//!
//! * [Overview](#overview)
//! * [Quickstart](#quickstart)
//! * [Schema documents](#schema-documents)
//! * [Details](#details)
//! * [Terminology](#terminology)
//! * [Schema rules](#schema-rules)
//! * [Placing unflagged values](#placing-unflagged-values)
//! * [Errors](#errors)
//!
//! ---
//!
//! # Overview
//!
//! There are two steps:
//!
//! 1. Create a [Parser] from an _ordered_ list of named
//!    [ParameterDefinition]s. An invalid schema is a programmer error, so
//!    this fails straight away with a [SchemaError].
//! 1. Call [Parser::parse()] with the command-line. This never fails: it
//!    returns a [ParseResult] holding the values collected and a list of
//!    [ParseError]s. It is up to the caller to decide what to do if the
//!    list is not empty (normally: show the errors and exit).
//!
//! The parser never prints anything and never exits the program.
//!
//! # Quickstart
//!
//! ```rust
//! use declargs::{Collected, ParameterDefinition, Parser, TypeSpec, Value};
//!
//! let parser = Parser::new(vec![
//!     ("out", ParameterDefinition::new().long("out").short('o')),
//!     (
//!         "jobs",
//!         ParameterDefinition::new()
//!             .long("jobs")
//!             .kind(TypeSpec::Int)
//!             .optional()
//!             .default_value(1),
//!     ),
//!     ("files", ParameterDefinition::unflagged().multi().optional()),
//! ])
//! .unwrap();
//!
//! let result = parser.parse(&["--out", "result.txt", "a.txt", "b.txt"]);
//!
//! assert!(result.is_ok());
//! assert_eq!(result.get("out"), Some(&Collected::One("result.txt".into())));
//! assert_eq!(result.get("jobs"), Some(&Collected::One(Value::Int(1))));
//! assert_eq!(
//!     result.get("files"),
//!     Some(&Collected::Many(vec!["a.txt".into(), "b.txt".into()]))
//! );
//!
//! let result = parser.parse(&["--jobs", "lots", "a.txt"]);
//!
//! assert_eq!(
//!     result.error_messages(),
//!     vec![
//!         "value \"lots\" is not a valid int for parameter --jobs",
//!         "missing required parameter --out",
//!     ]
//! );
//! ```
//!
//! For further examples, try out the programs in the `demos/` directory:
//!
//! ```bash
//! $ cargo run --example simple -- --out result.txt -v a.txt b.txt
//! $ cargo run --example head-and-tail -- src --mode copy dest1 dest2
//! $ cargo run --example json-schema -- -n 3 --ratio 0.5 one two
//! $ cargo run --example error-report -- stray --jobs x --out a --out b
//! ```
//!
//! # Schema documents
//!
//! The schema can also be read from JSON (see [Schema::from_json]). The
//! order of the keys is the order of the parameters:
//!
//! ```rust
//! use declargs::Parser;
//!
//! let parser = Parser::from_json(r#"{
//!     "out":   { "longName": "out", "type": "string" },
//!     "mode":  { "longName": "mode", "type": ["fast", "slow"], "required": false, "default": "slow" },
//!     "files": { "unflagged": true, "multi": true, "required": false }
//! }"#).unwrap();
//!
//! assert!(parser.parse(&["--out", "x", "--mode", "fast"]).is_ok());
//! ```
//!
//! Unknown keys in a definition are rejected.
//!
//! # Details
//!
//! ## Terminology
//!
//! - A "flag" is a parameter introduced by name: a long flag (`--name`) or
//!   a short flag (`-n`).
//! - A "switch" is a flag of type [TypeSpec::Bool]. It takes no value: it
//!   is set to `true` by being given.
//! - An "unflagged" parameter takes positional values instead of being
//!   named. It may only be the first (head) or last (tail) parameter.
//! - A "multi" parameter may be given more than once; its values are
//!   collected in order as [Collected::Many].
//!
//! Arguments are classified as follows (see [detect_flag()]):
//!
//! ```text
//! --name, --name=value    # long flag
//! -n                      # short flag
//! -, value                # unflagged
//! --                      # end of options: everything after is unflagged
//! ```
//!
//! A flag that takes a value uses the next argument as its value, whatever
//! it looks like (`--offset -3`), or an inline value (`--name=value`).
//! Short flags cannot be bundled (`-ab`).
//!
//! ## Schema rules
//!
//! - There must be at least one parameter.
//! - Only the first and last parameters may be unflagged, and unflagged
//!   parameters have neither a long nor a short name.
//! - Other parameters need a long name, a short name, or both. Short names
//!   are a single character.
//! - Bool parameters cannot be unflagged or multi.
//! - Required parameters (the default) cannot have a default value; any
//!   default must satisfy the type, and only multi parameters may default
//!   to a list.
//!
//! Missing fields default to: type `string`, required, not multi.
//!
//! ## Placing unflagged values
//!
//! - Unflagged values go to the head parameter while it has room: all of
//!   them if it is multi, otherwise only the first. Flags in between do
//!   not matter (`prog -v in.txt` fills the head).
//! - Once the head is full (or if there is none), the contiguous run of
//!   unflagged values that ends the command-line goes to the tail
//!   parameter.
//! - If the head is multi, it takes everything and the tail gets nothing.
//! - Any other unflagged value is an error.
//!
//! ## Errors
//!
//! A [ParseError] is recorded for:
//!
//! - unknown flags,
//! - values of the wrong type,
//! - a second value for a parameter that is not multi,
//! - a flag with no value,
//! - unflagged values that fit nowhere,
//! - missing required parameters.
//!
//! Parameters that were not given but have a default are given the default.

mod error;
mod parser;
mod schema;

pub use error::{ParseError, Result, SchemaError};

pub use parser::{detect_flag, get_args, ParseResult, Parser, TokenKind};

pub use schema::{Collected, Parameter, ParameterDefinition, Position, Schema, TypeSpec, Value};
