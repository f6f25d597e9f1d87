// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

/// An example reading the schema from a JSON document and printing the
/// values collected as JSON.
use declargs::{Parser, Result};
use tracing_subscriber::EnvFilter;

const SCHEMA: &str = r#"{
    "count":  { "shortName": "n", "type": "int", "required": false, "default": 1,
                "description": "number of repeats" },
    "ratio":  { "longName": "ratio", "type": "number", "required": false },
    "quiet":  { "longName": "quiet", "shortName": "q", "type": "bool", "required": false },
    "words":  { "unflagged": true, "multi": true, "description": "words to print" }
}"#;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let parser = Parser::from_json(SCHEMA)?.name("json-schema");

    let result = parser.parse_env();

    if !result.is_ok() {
        for msg in result.error_messages() {
            eprintln!("ERROR: {}", msg);
        }

        parser
            .generate_help(&mut std::io::stderr())
            .unwrap_or_else(|e| eprintln!("ERROR: {}", e));

        std::process::exit(1);
    }

    match serde_json::to_string_pretty(result.values()) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("ERROR: {}", e),
    }

    Ok(())
}
