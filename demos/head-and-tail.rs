// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

/// An example with unflagged values at both ends of the command-line: one
/// source first, any number of destinations last.
use declargs::{ParameterDefinition, Parser, Result, TypeSpec};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let parser = Parser::new(vec![
        ("source", ParameterDefinition::unflagged()),
        (
            "mode",
            ParameterDefinition::new()
                .long("mode")
                .short('m')
                .kind(TypeSpec::choices(vec!["copy", "move", "link"]))
                .optional()
                .default_value("copy"),
        ),
        ("dests", ParameterDefinition::unflagged().multi()),
    ])?;

    let result = parser.parse_env();

    match result.into_result() {
        Ok(values) => {
            for (name, value) in values {
                println!("INFO: {}: {}", name, value);
            }
        }
        Err(errors) => {
            for error in errors {
                eprintln!("ERROR: {}", error);
            }

            // Note: the source takes the first unflagged value, wherever
            // it is ("--mode copy a b c" and "a b --mode copy c" both copy
            // "a"). Only the values that end the command-line go to the
            // destinations, so "a b --mode copy c" reports "b" as stray.
            std::process::exit(1);
        }
    }

    Ok(())
}
