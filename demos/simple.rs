// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

/// A simple example showing flags, a switch and trailing unflagged values.
use declargs::{Collected, ParameterDefinition, Parser, TypeSpec, Value};
use std::process::exit;
use tracing_subscriber::EnvFilter;

fn main() {
    // Set RUST_LOG=declargs=debug to see how each argument is handled.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let parser = Parser::new(vec![
        (
            "out",
            ParameterDefinition::new()
                .long("out")
                .short('o')
                .description("file to write"),
        ),
        (
            "verbose",
            ParameterDefinition::new()
                .long("verbose")
                .short('v')
                .kind(TypeSpec::Bool)
                .optional(),
        ),
        (
            "help",
            ParameterDefinition::new()
                .long("help")
                .short('h')
                .kind(TypeSpec::Bool)
                .optional()
                .description("show this text"),
        ),
        (
            "files",
            ParameterDefinition::unflagged()
                .multi()
                .optional()
                .description("files to read"),
        ),
    ])
    .unwrap_or_else(|e| {
        eprintln!("ERROR: bad schema: {}", e);
        exit(2);
    })
    .name("simple")
    .summary("Shows how values are collected.");

    let result = parser.parse_env();

    let help = result
        .get("help")
        .and_then(Collected::first)
        .and_then(Value::as_bool);

    if help == Some(true) {
        parser
            .generate_help(&mut std::io::stdout())
            .unwrap_or_else(|e| eprintln!("ERROR: {}", e));
        return;
    }

    for error in result.errors() {
        eprintln!("ERROR: {}", error);
    }

    for (name, value) in result.values() {
        println!("INFO: {}: {}", name, value);
    }

    if !result.is_ok() {
        exit(1);
    }
}
