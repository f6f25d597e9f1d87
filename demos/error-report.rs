// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

/// An example showing that all problems are reported in one run, and how a
/// caller can react to particular kinds of error.
use declargs::{ParameterDefinition, ParseError, Parser, Result, TypeSpec};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let parser = Parser::new(vec![
        ("out", ParameterDefinition::new().long("out")),
        (
            "jobs",
            ParameterDefinition::new()
                .long("jobs")
                .kind(TypeSpec::Int)
                .optional(),
        ),
        ("files", ParameterDefinition::unflagged().multi().optional()),
    ])?
    .name("error-report");

    let result = parser.parse_env();

    let mut show_usage = false;

    for error in result.errors() {
        eprintln!("ERROR: {}", error);

        if let ParseError::UnknownParameter(_) | ParseError::MissingRequired(_) = error {
            show_usage = true;
        }
    }

    if show_usage {
        parser
            .generate_help(&mut std::io::stderr())
            .unwrap_or_else(|e| eprintln!("ERROR: {}", e));
    }

    println!("INFO: {} value(s), {} error(s)", result.values().len(), result.errors().len());

    Ok(())
}
