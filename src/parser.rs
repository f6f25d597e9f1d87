// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

use std::env;
use std::fmt;
use std::io::{self, Write};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::{ParseError, Result};
use crate::schema::{
    Collected, Parameter, ParameterDefinition, Position, Schema, LONG_OPT_PREFIX, OPT_PREFIX,
    VALUE_SEPARATOR,
};

/// Special argument that is silently consumed and used to denote the end of
/// all options; all arguments that follow are considered to be unflagged
/// (even if they start with `-`!)
///
/// See: `getopt(3)`.
const END_OF_OPTIONS: &str = "--";

/// Value stored for a bool flag given by name alone.
const SWITCH_ON: &str = "true";

/// String to show in usage if a parameter is required
const REQUIRED_STR: &str = " (required)";

const USAGE_PREFIX_SPACES: &str = "    ";

/// How a single command-line argument looks.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    /// Starts with `--`.
    Long,
    /// Starts with a single `-` followed by something other than `-`.
    Short,
    /// Anything else (including a lone `-`).
    Unflagged,
}

/// Classify a command-line argument.
///
/// ```rust
/// use declargs::{detect_flag, TokenKind};
///
/// assert_eq!(detect_flag("--out"), TokenKind::Long);
/// assert_eq!(detect_flag("-o"), TokenKind::Short);
/// assert_eq!(detect_flag("-"), TokenKind::Unflagged);
/// assert_eq!(detect_flag("out.txt"), TokenKind::Unflagged);
/// ```
pub fn detect_flag(arg: &str) -> TokenKind {
    let mut chars = arg.chars();

    match (chars.next(), chars.next()) {
        (Some(OPT_PREFIX), Some(OPT_PREFIX)) => TokenKind::Long,
        (Some(OPT_PREFIX), Some(_)) => TokenKind::Short,
        _ => TokenKind::Unflagged,
    }
}

#[derive(Clone, Copy, Debug)]
enum Token<'a> {
    EndOfOptions,
    Long(&'a str),
    Short(&'a str),
    Unflagged(&'a str),
}

fn tokenize<S: AsRef<str>>(cli_args: &[S]) -> Vec<Token<'_>> {
    let mut end_of_options = false;

    cli_args
        .iter()
        .map(|arg| {
            let arg = arg.as_ref();

            if end_of_options {
                return Token::Unflagged(arg);
            }

            if arg == END_OF_OPTIONS {
                end_of_options = true;
                return Token::EndOfOptions;
            }

            match detect_flag(arg) {
                TokenKind::Long => Token::Long(arg),
                TokenKind::Short => Token::Short(arg),
                TokenKind::Unflagged => Token::Unflagged(arg),
            }
        })
        .collect()
}

/// Index of the first token of the contiguous run of unflagged tokens at
/// the end of the command-line (`tokens.len()` if there is no such run).
///
/// The end of options marker does not break the run.
fn trailing_run_start(tokens: &[Token]) -> usize {
    let mut start = tokens.len();

    for (i, token) in tokens.iter().enumerate().rev() {
        match token {
            Token::Unflagged(_) => start = i,
            Token::EndOfOptions => continue,
            _ => break,
        }
    }

    start
}

/// The outcome of a single parse.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParseResult {
    values: IndexMap<String, Collected>,
    errors: Vec<ParseError>,
}

impl ParseResult {
    /// Collected values by parameter name, in schema order.
    ///
    /// Only parameters that were given a value (or have a default) appear.
    pub fn values(&self) -> &IndexMap<String, Collected> {
        &self.values
    }

    /// Problems found, in the order they were found.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Returns true if no problems were found.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Value(s) for the named parameter.
    pub fn get(&self, name: &str) -> Option<&Collected> {
        self.values.get(name)
    }

    /// Human-readable error messages.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Convert into the values, or all of the errors if there were any.
    pub fn into_result(self) -> std::result::Result<IndexMap<String, Collected>, Vec<ParseError>> {
        if self.errors.is_empty() {
            Ok(self.values)
        } else {
            Err(self.errors)
        }
    }
}

/// Per-parse state.
struct Collector<'s> {
    schema: &'s Schema,
    values: IndexMap<String, Collected>,
    errors: Vec<ParseError>,
}

impl<'s> Collector<'s> {
    fn new(schema: &'s Schema) -> Self {
        Collector {
            schema,
            values: IndexMap::new(),
            errors: Vec::new(),
        }
    }

    fn error(&mut self, error: ParseError) {
        debug!(%error, "argument rejected");

        self.errors.push(error);
    }

    /// Type check and store a value. Returns false if the value was
    /// rejected.
    fn accept_value(&mut self, param: &Parameter, raw: &str) -> bool {
        if !param.is_multi() && self.values.contains_key(param.name()) {
            self.error(ParseError::MultipleValues(param.display_name()));
            return false;
        }

        let value = match param.kind().coerce(raw) {
            Some(value) => value,
            None => {
                self.error(ParseError::InvalidType {
                    param: param.display_name(),
                    value: raw.into(),
                    expected: param.kind().to_string(),
                });
                return false;
            }
        };

        trace!(parameter = param.name(), %value, "value accepted");

        match self.values.get_mut(param.name()) {
            Some(Collected::Many(values)) => values.push(value),
            _ => {
                let collected = if param.is_multi() {
                    Collected::Many(vec![value])
                } else {
                    Collected::One(value)
                };

                self.values.insert(param.name().into(), collected);
            }
        }

        true
    }

    /// Install defaults, check required parameters were given and put the
    /// values into schema order.
    fn finish(mut self) -> ParseResult {
        let schema = self.schema;

        for param in schema.iter() {
            if self.values.contains_key(param.name()) {
                continue;
            }

            if let Some(default) = param.default() {
                self.values.insert(param.name().into(), default.clone());
            } else if param.is_required() {
                self.error(ParseError::MissingRequired(param.display_name()));
            }
        }

        self.values
            .sort_by(|a, _, b, _| schema.index_of(a).cmp(&schema.index_of(b)));

        ParseResult {
            values: self.values,
            errors: self.errors,
        }
    }
}

/// Get a list of all command-line arguments specified to the program with
/// the program name (the first argument) removed.
///
/// # Note
///
/// Used with [Parser::parse()]. However, this isn't usually
/// required: just call [Parser::parse_env()].
pub fn get_args() -> Vec<String> {
    env::args().skip(1).collect()
}

/// The parser: a validated schema plus details used for the usage
/// statement.
///
/// A parser is immutable once created. Every parse returns a fresh
/// [ParseResult], so a single parser can be shared freely.
#[derive(Clone, Debug, PartialEq)]
pub struct Parser {
    name: String,
    version: String,
    summary: String,
    notes: String,
    schema: Schema,
}

impl Parser {
    /// Create a parser from an ordered list of parameter definitions.
    ///
    /// # Errors
    ///
    /// Fails if the definitions do not form a valid schema
    /// (see [Schema::validate]).
    pub fn new<I, K>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, ParameterDefinition)>,
        K: Into<String>,
    {
        Schema::validate(definitions).map(Parser::with_schema)
    }

    /// Create a parser from a schema document (see [Schema::from_json]).
    pub fn from_json(json: &str) -> Result<Self> {
        Schema::from_json(json).map(Parser::with_schema)
    }

    /// Create a parser for an already validated schema.
    pub fn with_schema(schema: Schema) -> Self {
        Parser {
            name: String::new(),
            version: String::new(),
            summary: String::new(),
            notes: String::new(),
            schema,
        }
    }

    /// Specify the name of the program.
    pub fn name(self, name: &str) -> Self {
        Parser {
            name: name.into(),
            ..self
        }
    }

    /// Specify the version of the program.
    pub fn version(self, version: &str) -> Self {
        Parser {
            version: version.into(),
            ..self
        }
    }

    /// Specify brief explanatory text for the program.
    pub fn summary(self, summary: &str) -> Self {
        Parser {
            summary: summary.into(),
            ..self
        }
    }

    /// Specify notes for the program.
    pub fn notes(self, notes: &str) -> Self {
        Parser {
            notes: notes.into(),
            ..self
        }
    }

    /// The validated schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Parse a set of command line arguments (without the program name).
    ///
    /// Parsing never stops early: every problem found is recorded in the
    /// returned [ParseResult] and the remaining arguments are still
    /// handled.
    ///
    /// # Argument syntax
    ///
    /// - `--name=value` gives a value inline.
    /// - `--name value` and `-n value` take the next argument as the
    ///   value, even if it starts with a dash (so `--offset -3` works).
    /// - Bool flags take no value: `--name` and `-n` set them to `true`.
    ///   `--name=false` is also accepted.
    /// - `--` ends option handling: everything after it is unflagged.
    /// - Unflagged arguments go to the head parameter while it has room
    ///   (one value, or any number if it is multi), wherever they appear.
    ///   Once the head is full, unflagged arguments that end the
    ///   command-line go to the tail parameter. Anything else is an error.
    pub fn parse<S: AsRef<str>>(&self, cli_args: &[S]) -> ParseResult {
        let tokens = tokenize(cli_args);
        let tail_start = trailing_run_start(&tokens);

        debug!(
            arguments = tokens.len(),
            trailing = tokens[tail_start..].len(),
            "parsing"
        );

        let head = self.schema.head();
        let tail = self.schema.tail();

        let mut collector = Collector::new(&self.schema);

        // The flag whose value is expected next.
        let mut gathering: Option<&Parameter> = None;

        let mut head_taken = 0;
        let mut tail_dropped = false;

        for (i, token) in tokens.iter().enumerate() {
            trace!(index = i, ?token, "argument");

            if let Some(param) = gathering.take() {
                match *token {
                    Token::EndOfOptions => {
                        collector.error(ParseError::MissingValue(param.display_name()))
                    }
                    Token::Long(arg) | Token::Short(arg) | Token::Unflagged(arg) => {
                        collector.accept_value(param, arg);
                        continue;
                    }
                }
            }

            match *token {
                Token::EndOfOptions => (),
                Token::Long(arg) => {
                    gathering = self.long_flag(&mut collector, arg);
                }
                Token::Short(arg) => {
                    gathering = self.short_flag(&mut collector, arg);
                }
                Token::Unflagged(arg) => {
                    let head_open = head.map_or(false, |p| p.is_multi() || head_taken == 0);

                    if let (true, Some(param)) = (head_open, head) {
                        head_taken += 1;
                        collector.accept_value(param, arg);
                    } else if i >= tail_start {
                        if let Some(param) = tail {
                            collector.accept_value(param, arg);
                        } else if !tail_dropped {
                            tail_dropped = true;

                            let dropped = tokens[i..]
                                .iter()
                                .filter(|t| matches!(t, Token::Unflagged(_)))
                                .count();

                            collector.error(ParseError::DroppedTrailing(dropped));
                        }
                    } else {
                        collector.error(ParseError::Stray(arg.into()));
                    }
                }
            }
        }

        // There shouldn't be any half-handled flags left
        if let Some(param) = gathering {
            collector.error(ParseError::MissingValue(param.display_name()));
        }

        let result = collector.finish();

        debug!(
            values = result.values.len(),
            errors = result.errors.len(),
            "parsed"
        );

        result
    }

    /// Simplest interface to the parser: parse the program's own
    /// arguments.
    pub fn parse_env(&self) -> ParseResult {
        self.parse(&get_args())
    }

    /// Handle `--name` or `--name=value`, returning the parameter if its
    /// value is the next argument.
    fn long_flag(&self, collector: &mut Collector, arg: &str) -> Option<&Parameter> {
        let body = &arg[LONG_OPT_PREFIX.len()..];

        let (long, inline) = match body.find(VALUE_SEPARATOR) {
            Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
            None => (body, None),
        };

        let param = match self.schema.find_long(long) {
            Some(param) => param,
            None => {
                collector.error(ParseError::UnknownParameter(format!(
                    "{}{}",
                    LONG_OPT_PREFIX, long
                )));
                return None;
            }
        };

        match inline {
            Some(value) => {
                collector.accept_value(param, value);
                None
            }
            None if param.is_switch() => {
                collector.accept_value(param, SWITCH_ON);
                None
            }
            None => Some(param),
        }
    }

    /// Handle `-n`, returning the parameter if its value is the next
    /// argument.
    fn short_flag(&self, collector: &mut Collector, arg: &str) -> Option<&Parameter> {
        let mut chars = arg.chars().skip(1);

        let short = match (chars.next(), chars.next()) {
            (Some(short), None) => short,
            _ => {
                collector.error(ParseError::NoBundling(arg.into()));
                return None;
            }
        };

        let param = match self.schema.find_short(short) {
            Some(param) => param,
            None => {
                collector.error(ParseError::UnknownParameter(arg.into()));
                return None;
            }
        };

        if param.is_switch() {
            collector.accept_value(param, SWITCH_ON);
            return None;
        }

        Some(param)
    }

    /// Generate a help/usage statement from the schema.
    ///
    /// The parser never calls this itself: the caller decides when
    /// usage should be shown.
    pub fn generate_help<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut lines = Vec::<String>::new();

        let name: String = if self.name.is_empty() {
            env::args().next().unwrap_or_default()
        } else {
            self.name.clone()
        };

        let line = format!("NAME:\n{}{}\n", USAGE_PREFIX_SPACES, name);
        lines.push(line);

        if !self.version.is_empty() {
            let line = format!("VERSION:\n{}{}\n", USAGE_PREFIX_SPACES, self.version);
            lines.push(line);
        }

        if !self.summary.is_empty() {
            let line = format!("SUMMARY:\n{}{}\n", USAGE_PREFIX_SPACES, self.summary.trim());
            lines.push(line);
        }

        let (switches, options): (Vec<&Parameter>, Vec<&Parameter>) = self
            .schema
            .iter()
            .filter(|p| p.position() == Position::Flag)
            .partition(|p| p.is_switch());

        let positional: Vec<&Parameter> = self
            .schema
            .iter()
            .filter(|p| p.position() != Position::Flag)
            .collect();

        //------------------------------------------------------------

        lines.push("USAGE:".into());

        let mut usage = format!("{}{}", USAGE_PREFIX_SPACES, name);

        if let Some(head) = self.schema.head() {
            usage.push(' ');
            usage.push_str(&positional_usage(head));
        }

        if !switches.is_empty() {
            usage.push_str(" [FLAGS]");
        }

        if !options.is_empty() {
            usage.push_str(" [OPTIONS]");
        }

        if let Some(tail) = self.schema.tail() {
            usage.push(' ');
            usage.push_str(&positional_usage(tail));
        }

        usage.push('\n');
        lines.push(usage);

        //------------------------------------------------------------

        if !switches.is_empty() {
            lines.push("FLAGS:".into());

            for param in switches {
                lines.push(format!("{}{}", USAGE_PREFIX_SPACES, param));
            }
        }

        if !options.is_empty() {
            lines.push("\nOPTIONS:".into());

            for param in options {
                lines.push(format!("{}{}", USAGE_PREFIX_SPACES, param));
            }
        }

        if !positional.is_empty() {
            lines.push("\nPOSITIONAL ARGUMENTS:".into());

            for param in positional {
                lines.push(format!("{}{}", USAGE_PREFIX_SPACES, param));
            }
        }

        //------------------------------------------------------------

        if !self.notes.is_empty() {
            let line = format!("\nNOTES:\n\n{}", self.notes.trim());
            lines.push(line);
        }

        // Join all the lines together, remove white space at either and and
        // finally append a single newline.
        let mut final_lines = lines.join("\n").trim().to_string();
        final_lines.push('\n');

        writeln!(writer, "{}", final_lines)
    }
}

/// `<name>`, `[name]`, `<name>...` or `[name]...`
fn positional_usage(param: &Parameter) -> String {
    let repeat = if param.is_multi() { "..." } else { "" };

    if param.is_required() {
        format!("<{}>{}", param.name(), repeat)
    } else {
        format!("[{}]{}", param.name(), repeat)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = match (self.long_name(), self.short_name()) {
            (Some(long), Some(short)) => {
                format!("{}{}, {}{}", LONG_OPT_PREFIX, long, OPT_PREFIX, short)
            }
            (Some(long), None) => format!("{}{}", LONG_OPT_PREFIX, long),
            (None, Some(short)) => format!("{}{}", OPT_PREFIX, short),
            (None, None) => positional_usage(self),
        };

        let value = if self.is_switch() {
            "".into()
        } else {
            format!(" <{}>", self.kind())
        };

        let repeat = if self.is_multi() && self.position() == Position::Flag {
            "..."
        } else {
            ""
        };

        let required = if self.is_required() { REQUIRED_STR } else { "" };

        let default: String = match self.default() {
            Some(default) => format!(" [default: {}]", default),
            _ => "".into(),
        };

        let help: String = match self.description() {
            Some(help) => format!(" # {}", help),
            _ => "".into(),
        };

        write!(
            f,
            "{}{}{}{}{}{}",
            names, value, repeat, required, default, help
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::schema::{TypeSpec, Value};
    use regex::Regex;
    use std::sync::{Arc, Mutex};

    /// Writer that stores all data written to it.
    #[derive(Default, Clone)]
    struct BufWriter(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for BufWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.0.lock().unwrap().flush()
        }
    }

    impl ToString for BufWriter {
        fn to_string(&self) -> String {
            let output = self.0.lock().unwrap();

            String::from_utf8((*output).clone()).unwrap()
        }
    }

    fn s(value: &str) -> Value {
        Value::String(value.into())
    }

    fn one(value: &str) -> Collected {
        Collected::One(s(value))
    }

    fn many(values: &[&str]) -> Collected {
        Collected::Many(values.iter().map(|v| s(v)).collect())
    }

    /// `--out <string>` (required), `--jobs, -j <int>`, `--verbose, -v`,
    /// `--mode <fast|slow>` and trailing `files`.
    fn build_parser() -> Parser {
        Parser::new(vec![
            ("out", ParameterDefinition::new().long("out").short('o')),
            (
                "jobs",
                ParameterDefinition::new()
                    .long("jobs")
                    .short('j')
                    .kind(TypeSpec::Int)
                    .optional(),
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
                "mode",
                ParameterDefinition::new()
                    .long("mode")
                    .kind(TypeSpec::choices(vec!["fast", "slow"]))
                    .optional()
                    .default_value("slow"),
            ),
            (
                "files",
                ParameterDefinition::unflagged().multi().optional(),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_detect_flag() {
        #[derive(Debug)]
        struct TestData<'a> {
            arg: &'a str,
            kind: TokenKind,
        }

        let tests = &[
            TestData {
                arg: "",
                kind: TokenKind::Unflagged,
            },
            TestData {
                arg: "-",
                kind: TokenKind::Unflagged,
            },
            TestData {
                arg: "--",
                kind: TokenKind::Long,
            },
            TestData {
                arg: "---",
                kind: TokenKind::Long,
            },
            TestData {
                arg: "--out",
                kind: TokenKind::Long,
            },
            TestData {
                arg: "--out=x",
                kind: TokenKind::Long,
            },
            TestData {
                arg: "-o",
                kind: TokenKind::Short,
            },
            TestData {
                arg: "-abc",
                kind: TokenKind::Short,
            },
            TestData {
                arg: "-5",
                kind: TokenKind::Short,
            },
            TestData {
                arg: " -o",
                kind: TokenKind::Unflagged,
            },
            TestData {
                arg: "a-b",
                kind: TokenKind::Unflagged,
            },
            TestData {
                arg: "人",
                kind: TokenKind::Unflagged,
            },
        ];

        for (i, d) in tests.iter().enumerate() {
            let msg = format!("test[{}]: {:?}", i, d);

            assert_eq!(detect_flag(d.arg), d.kind, "{}", msg);
        }
    }

    #[test]
    fn test_trailing_run_start() {
        #[derive(Debug)]
        struct TestData<'a> {
            cli_args: Vec<&'a str>,
            start: usize,
        }

        let tests = &[
            TestData {
                cli_args: vec![],
                start: 0,
            },
            TestData {
                cli_args: vec!["a", "b"],
                start: 0,
            },
            TestData {
                cli_args: vec!["--out", "x", "a", "b"],
                start: 1,
            },
            TestData {
                cli_args: vec!["a", "--out", "x", "-v"],
                start: 4,
            },
            TestData {
                cli_args: vec!["-v", "--", "-a", "b"],
                start: 2,
            },
            TestData {
                cli_args: vec!["-v", "a", "--"],
                start: 1,
            },
        ];

        for (i, d) in tests.iter().enumerate() {
            let msg = format!("test[{}]: {:?}", i, d);

            let tokens = tokenize(&d.cli_args);

            assert_eq!(trailing_run_start(&tokens), d.start, "{}", msg);
        }
    }

    #[test]
    fn test_parse_flags_and_tail() {
        let parser = Parser::new(vec![
            ("out", ParameterDefinition::new().long("out")),
            (
                "files",
                ParameterDefinition::unflagged().multi().optional(),
            ),
        ])
        .unwrap();

        let result = parser.parse(&["--out", "result.txt", "a.txt", "b.txt"]);

        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(result.get("out"), Some(&one("result.txt")));
        assert_eq!(result.get("files"), Some(&many(&["a.txt", "b.txt"])));
        assert_eq!(result.values().len(), 2);
    }

    #[test]
    fn test_parse_with_args() {
        #[derive(Debug)]
        struct TestData<'a> {
            cli_args: Vec<&'a str>,
            values: Vec<(&'a str, Collected)>,
            errors: Vec<ParseError>,
        }

        let parser = build_parser();

        let tests = vec![
            TestData {
                cli_args: vec![],
                values: vec![("mode", one("slow"))],
                errors: vec![ParseError::MissingRequired("--out".into())],
            },
            TestData {
                cli_args: vec!["--out", "x"],
                values: vec![("out", one("x")), ("mode", one("slow"))],
                errors: vec![],
            },
            TestData {
                cli_args: vec!["--out=x"],
                values: vec![("out", one("x")), ("mode", one("slow"))],
                errors: vec![],
            },
            TestData {
                // Only the first separator splits.
                cli_args: vec!["--out=a=b"],
                values: vec![("out", one("a=b")), ("mode", one("slow"))],
                errors: vec![],
            },
            TestData {
                cli_args: vec!["--out="],
                values: vec![("out", one("")), ("mode", one("slow"))],
                errors: vec![],
            },
            TestData {
                cli_args: vec!["-o", "x", "-j", "3", "--mode", "fast"],
                values: vec![
                    ("out", one("x")),
                    ("jobs", Collected::One(Value::Int(3))),
                    ("mode", one("fast")),
                ],
                errors: vec![],
            },
            TestData {
                // Flag values may start with a dash.
                cli_args: vec!["-o", "-x", "--jobs", "-3"],
                values: vec![
                    ("out", one("-x")),
                    ("jobs", Collected::One(Value::Int(-3))),
                    ("mode", one("slow")),
                ],
                errors: vec![],
            },
            TestData {
                cli_args: vec!["-v", "-o", "x"],
                values: vec![
                    ("out", one("x")),
                    ("verbose", Collected::One(Value::Bool(true))),
                    ("mode", one("slow")),
                ],
                errors: vec![],
            },
            TestData {
                // Bool flags don't consume the next argument.
                cli_args: vec!["-o", "x", "--verbose", "a"],
                values: vec![
                    ("out", one("x")),
                    ("verbose", Collected::One(Value::Bool(true))),
                    ("mode", one("slow")),
                    ("files", many(&["a"])),
                ],
                errors: vec![],
            },
            TestData {
                cli_args: vec!["-o", "x", "--verbose=false"],
                values: vec![
                    ("out", one("x")),
                    ("verbose", Collected::One(Value::Bool(false))),
                    ("mode", one("slow")),
                ],
                errors: vec![],
            },
            TestData {
                cli_args: vec!["-o", "x", "--verbose=yes"],
                values: vec![("out", one("x")), ("mode", one("slow"))],
                errors: vec![ParseError::InvalidType {
                    param: "--verbose".into(),
                    value: "yes".into(),
                    expected: "bool".into(),
                }],
            },
            TestData {
                cli_args: vec!["-o", "x", "-v", "-v"],
                values: vec![
                    ("out", one("x")),
                    ("verbose", Collected::One(Value::Bool(true))),
                    ("mode", one("slow")),
                ],
                errors: vec![ParseError::MultipleValues("--verbose".into())],
            },
            //------------------------------
            // Unknown flags
            TestData {
                cli_args: vec!["-o", "x", "--colour", "red"],
                values: vec![
                    ("out", one("x")),
                    ("mode", one("slow")),
                    ("files", many(&["red"])),
                ],
                errors: vec![ParseError::UnknownParameter("--colour".into())],
            },
            TestData {
                cli_args: vec!["--colour=red", "-o", "x"],
                values: vec![("out", one("x")), ("mode", one("slow"))],
                errors: vec![ParseError::UnknownParameter("--colour".into())],
            },
            TestData {
                cli_args: vec!["-y", "-o", "x"],
                values: vec![("out", one("x")), ("mode", one("slow"))],
                errors: vec![ParseError::UnknownParameter("-y".into())],
            },
            TestData {
                cli_args: vec!["-vo", "x"],
                values: vec![("mode", one("slow")), ("files", many(&["x"]))],
                errors: vec![
                    ParseError::NoBundling("-vo".into()),
                    ParseError::MissingRequired("--out".into()),
                ],
            },
            //------------------------------
            // Missing flag values
            TestData {
                cli_args: vec!["--out"],
                values: vec![("mode", one("slow"))],
                errors: vec![
                    ParseError::MissingValue("--out".into()),
                    ParseError::MissingRequired("--out".into()),
                ],
            },
            TestData {
                cli_args: vec!["--out", "--", "a"],
                values: vec![("mode", one("slow")), ("files", many(&["a"]))],
                errors: vec![
                    ParseError::MissingValue("--out".into()),
                    ParseError::MissingRequired("--out".into()),
                ],
            },
            //------------------------------
            // Types
            TestData {
                cli_args: vec!["-j", "many", "-o", "x"],
                values: vec![("out", one("x")), ("mode", one("slow"))],
                errors: vec![ParseError::InvalidType {
                    param: "--jobs".into(),
                    value: "many".into(),
                    expected: "int".into(),
                }],
            },
            TestData {
                cli_args: vec!["--mode", "medium", "-o", "x"],
                values: vec![("out", one("x")), ("mode", one("slow"))],
                errors: vec![ParseError::InvalidType {
                    param: "--mode".into(),
                    value: "medium".into(),
                    expected: "choice (fast|slow)".into(),
                }],
            },
            //------------------------------
            // Unflagged placement
            TestData {
                cli_args: vec!["-o", "x", "--", "-a", "--b"],
                values: vec![
                    ("out", one("x")),
                    ("mode", one("slow")),
                    ("files", many(&["-a", "--b"])),
                ],
                errors: vec![],
            },
            TestData {
                cli_args: vec!["-o", "x", "-", "b"],
                values: vec![
                    ("out", one("x")),
                    ("mode", one("slow")),
                    ("files", many(&["-", "b"])),
                ],
                errors: vec![],
            },
            TestData {
                cli_args: vec!["stray", "-o", "x", "a"],
                values: vec![
                    ("out", one("x")),
                    ("mode", one("slow")),
                    ("files", many(&["a"])),
                ],
                errors: vec![ParseError::Stray("stray".into())],
            },
            TestData {
                cli_args: vec!["-o", "x", "one", "-v", "two"],
                values: vec![
                    ("out", one("x")),
                    ("verbose", Collected::One(Value::Bool(true))),
                    ("mode", one("slow")),
                    ("files", many(&["two"])),
                ],
                errors: vec![ParseError::Stray("one".into())],
            },
        ];

        for (i, d) in tests.into_iter().enumerate() {
            let msg = format!("test[{}]: {:?}", i, d);

            let result = parser.parse(&d.cli_args);

            let msg = format!("{}, result: {:?}", msg, result);

            let values: Vec<(&str, Collected)> = result
                .values()
                .iter()
                .map(|(k, v)| (k.as_str(), v.clone()))
                .collect();

            assert_eq!(values, d.values, "{}", msg);
            assert_eq!(result.errors(), d.errors.as_slice(), "{}", msg);
        }
    }

    #[test]
    fn test_head_and_tail() {
        #[derive(Debug)]
        struct TestData<'a> {
            head_multi: bool,
            tail_multi: bool,
            cli_args: Vec<&'a str>,
            head: Option<Collected>,
            tail: Option<Collected>,
            errors: Vec<ParseError>,
        }

        let tests = vec![
            TestData {
                // The head is greedier.
                head_multi: true,
                tail_multi: true,
                cli_args: vec!["a", "b", "c"],
                head: Some(many(&["a", "b", "c"])),
                tail: None,
                errors: vec![],
            },
            TestData {
                head_multi: false,
                tail_multi: true,
                cli_args: vec!["a", "b", "c"],
                head: Some(one("a")),
                tail: Some(many(&["b", "c"])),
                errors: vec![],
            },
            TestData {
                head_multi: false,
                tail_multi: false,
                cli_args: vec!["a", "b"],
                head: Some(one("a")),
                tail: Some(one("b")),
                errors: vec![],
            },
            TestData {
                head_multi: false,
                tail_multi: false,
                cli_args: vec!["a", "b", "c"],
                head: Some(one("a")),
                tail: Some(one("b")),
                errors: vec![ParseError::MultipleValues("trailing unflagged".into())],
            },
            TestData {
                // Flags don't close the head.
                head_multi: true,
                tail_multi: true,
                cli_args: vec!["a", "b", "-v", "c", "d"],
                head: Some(many(&["a", "b", "c", "d"])),
                tail: None,
                errors: vec![],
            },
            TestData {
                head_multi: true,
                tail_multi: true,
                cli_args: vec!["-v", "a"],
                head: Some(many(&["a"])),
                tail: None,
                errors: vec![],
            },
            TestData {
                head_multi: false,
                tail_multi: false,
                cli_args: vec!["-v", "in.txt"],
                head: Some(one("in.txt")),
                tail: None,
                errors: vec![],
            },
            TestData {
                head_multi: false,
                tail_multi: true,
                cli_args: vec!["-v", "a", "b", "c"],
                head: Some(one("a")),
                tail: Some(many(&["b", "c"])),
                errors: vec![],
            },
            TestData {
                head_multi: true,
                tail_multi: true,
                cli_args: vec!["a", "-v", "b", "-v", "c"],
                head: Some(many(&["a", "b", "c"])),
                tail: None,
                errors: vec![ParseError::MultipleValues("--verbose".into())],
            },
            TestData {
                // Full head: a value between flags has nowhere to go.
                head_multi: false,
                tail_multi: true,
                cli_args: vec!["a", "b", "-v", "c"],
                head: Some(one("a")),
                tail: Some(many(&["c"])),
                errors: vec![ParseError::Stray("b".into())],
            },
            TestData {
                head_multi: true,
                tail_multi: true,
                cli_args: vec!["--", "-a", "-b"],
                head: Some(many(&["-a", "-b"])),
                tail: None,
                errors: vec![],
            },
        ];

        for (i, d) in tests.into_iter().enumerate() {
            let msg = format!("test[{}]: {:?}", i, d);

            let mut first = ParameterDefinition::unflagged().optional();
            let mut last = ParameterDefinition::unflagged().optional();

            if d.head_multi {
                first = first.multi();
            }

            if d.tail_multi {
                last = last.multi();
            }

            let parser = Parser::new(vec![
                ("first", first),
                (
                    "verbose",
                    ParameterDefinition::new()
                        .long("verbose")
                        .short('v')
                        .kind(TypeSpec::Bool)
                        .optional(),
                ),
                ("last", last),
            ])
            .unwrap();

            let result = parser.parse(&d.cli_args);

            let msg = format!("{}, result: {:?}", msg, result);

            assert_eq!(result.get("first"), d.head.as_ref(), "{}", msg);
            assert_eq!(result.get("last"), d.tail.as_ref(), "{}", msg);
            assert_eq!(result.errors(), d.errors.as_slice(), "{}", msg);
        }
    }

    #[test]
    fn test_dropped_trailing() {
        let parser = Parser::new(vec![
            ("input", ParameterDefinition::unflagged()),
            (
                "verbose",
                ParameterDefinition::new()
                    .short('v')
                    .kind(TypeSpec::Bool)
                    .optional(),
            ),
        ])
        .unwrap();

        let result = parser.parse(&["in.txt", "-v", "a", "b", "c"]);

        assert_eq!(result.get("input"), Some(&one("in.txt")));
        assert_eq!(result.errors(), &[ParseError::DroppedTrailing(3)]);
        assert_eq!(
            result.error_messages(),
            vec!["3 trailing unflagged argument(s) dropped".to_string()]
        );

        // The head holds one value, the rest have nowhere to go.
        let result = parser.parse(&["a", "b"]);

        assert_eq!(result.get("input"), Some(&one("a")));
        assert_eq!(result.errors(), &[ParseError::DroppedTrailing(1)]);

        // An empty head takes values after flags.
        let result = parser.parse(&["-v", "in.txt"]);

        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(result.get("input"), Some(&one("in.txt")));
        assert_eq!(
            result.get("verbose"),
            Some(&Collected::One(Value::Bool(true)))
        );

        // Not trailing, so stray.
        let result = parser.parse(&["a", "-v", "b", "-v"]);

        assert_eq!(
            result.errors(),
            &[
                ParseError::Stray("b".into()),
                ParseError::MultipleValues("-v".into()),
            ]
        );
    }

    #[test]
    fn test_non_repeatable_collision() {
        let parser = build_parser();

        let result = parser.parse(&["--out", "first", "--out", "second"]);

        assert_eq!(result.get("out"), Some(&one("first")));
        assert_eq!(
            result.errors(),
            &[ParseError::MultipleValues("--out".into())]
        );
        assert_eq!(
            result.error_messages(),
            vec!["multiple values given for non-repeatable parameter --out".to_string()]
        );
    }

    #[test]
    fn test_type_rejection_is_not_fatal() {
        let parser = build_parser();

        let result = parser.parse(&["-j", "2", "-j", "x", "-o", "out", "a", "b"]);

        assert_eq!(result.get("jobs"), Some(&Collected::One(Value::Int(2))));
        assert_eq!(result.get("out"), Some(&one("out")));
        assert_eq!(result.get("files"), Some(&many(&["a", "b"])));

        // The repeat is reported, not the type.
        assert_eq!(
            result.errors(),
            &[ParseError::MultipleValues("--jobs".into())]
        );

        let result = parser.parse(&["-j", "x", "-o", "out", "a"]);

        assert_eq!(result.get("jobs"), None);
        assert_eq!(result.get("files"), Some(&many(&["a"])));
        assert_eq!(result.errors().len(), 1);
        assert_eq!(
            result.error_messages(),
            vec!["value \"x\" is not a valid int for parameter --jobs".to_string()]
        );
    }

    #[test]
    fn test_multi_flag() {
        let parser = Parser::new(vec![
            (
                "define",
                ParameterDefinition::new()
                    .short('D')
                    .multi()
                    .optional()
                    .default_values(vec!["DEBUG=0"]),
            ),
            (
                "level",
                ParameterDefinition::new()
                    .long("level")
                    .kind(TypeSpec::Number)
                    .multi()
                    .optional(),
            ),
        ])
        .unwrap();

        let result = parser.parse(&["-D", "A=1", "--level", "0.5", "-D", "B", "--level=2"]);

        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(result.get("define"), Some(&many(&["A=1", "B"])));
        assert_eq!(
            result.get("level"),
            Some(&Collected::Many(vec![Value::Number(0.5), Value::Number(2.0)]))
        );

        let result = parser.parse::<&str>(&[]);

        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(result.get("define"), Some(&many(&["DEBUG=0"])));
        assert_eq!(result.get("level"), None);

        // A badly typed repeat keeps the values already collected.
        let result = parser.parse(&["--level", "0.5", "--level", "x"]);

        assert_eq!(
            result.get("level"),
            Some(&Collected::Many(vec![Value::Number(0.5)]))
        );
        assert_eq!(
            result.errors(),
            &[ParseError::InvalidType {
                param: "--level".into(),
                value: "x".into(),
                expected: "number".into(),
            }]
        );
    }

    #[test]
    fn test_missing_required() {
        let parser = Parser::new(vec![
            ("input", ParameterDefinition::unflagged()),
            ("out", ParameterDefinition::new().short('o')),
            ("files", ParameterDefinition::unflagged().multi()),
        ])
        .unwrap();

        let result = parser.parse(&["in", "-o", "x"]);

        assert_eq!(
            result.errors(),
            &[ParseError::MissingRequired("trailing unflagged".into())]
        );

        let result = parser.parse(&["-o", "x", "a"]);

        // The empty head takes "a" before the tail is considered.
        assert_eq!(
            result.errors(),
            &[ParseError::MissingRequired("trailing unflagged".into())]
        );
        assert_eq!(result.get("input"), Some(&one("a")));
        assert_eq!(result.get("files"), None);

        let result = parser.parse(&["in", "a"]);

        assert_eq!(
            result.errors(),
            &[ParseError::MissingRequired("-o".into())]
        );
    }

    #[test]
    fn test_reset_between_parses() {
        let parser = build_parser();

        let first = parser.parse(&["-o", "x", "-o", "y", "-q", "a"]);
        assert_eq!(first.errors().len(), 2);
        assert_eq!(first.get("files"), Some(&many(&["a"])));

        let second = parser.parse(&["--out", "z"]);
        assert!(second.is_ok(), "{:?}", second);
        assert_eq!(second.get("out"), Some(&one("z")));
        assert_eq!(second.get("files"), None);

        // First result is untouched.
        assert_eq!(first.get("out"), Some(&one("x")));
        assert_eq!(first.errors().len(), 2);
    }

    #[test]
    fn test_into_result() {
        let parser = build_parser();

        let values = parser.parse(&["-o", "x"]).into_result().unwrap();
        assert_eq!(values.get("out"), Some(&one("x")));

        let errors = parser.parse(&["-q"]).into_result().unwrap_err();
        assert_eq!(
            errors,
            vec![
                ParseError::UnknownParameter("-q".into()),
                ParseError::MissingRequired("--out".into()),
            ]
        );
    }

    #[test]
    fn test_parser_from_json() {
        let parser = Parser::from_json(
            r#"{
                "out": { "longName": "out", "type": "string" },
                "files": { "unflagged": true, "type": "string", "multi": true, "required": false }
            }"#,
        )
        .unwrap();

        let result = parser.parse(&["--out", "result.txt", "a.txt", "b.txt"]);

        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(
            serde_json::to_string(result.values()).unwrap(),
            r#"{"out":"result.txt","files":["a.txt","b.txt"]}"#
        );
    }

    #[test]
    fn test_parser_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<Parser>();
        assert_send_sync::<ParseResult>();

        let parser = Arc::new(build_parser());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let parser = Arc::clone(&parser);

                std::thread::spawn(move || {
                    let out = format!("out-{}", i);
                    let result = parser.parse(&["-o", out.as_str()]);

                    (out, result)
                })
            })
            .collect();

        for handle in handles {
            let (out, result) = handle.join().unwrap();

            assert!(result.is_ok(), "{:?}", result);
            assert_eq!(result.get("out"), Some(&one(&out)));
        }
    }

    #[test]
    fn test_parameter_display() {
        #[derive(Debug)]
        struct TestData<'a> {
            definition: ParameterDefinition,
            display: &'a str,
        }

        let tests = vec![
            TestData {
                definition: ParameterDefinition::new().long("out"),
                display: "--out <string> (required)",
            },
            TestData {
                definition: ParameterDefinition::new().long("out").short('o').optional(),
                display: "--out, -o <string>",
            },
            TestData {
                definition: ParameterDefinition::new()
                    .short('v')
                    .kind(TypeSpec::Bool)
                    .optional()
                    .description("be chatty"),
                display: "-v # be chatty",
            },
            TestData {
                definition: ParameterDefinition::new()
                    .long("jobs")
                    .kind(TypeSpec::Int)
                    .optional()
                    .default_value(4),
                display: "--jobs <int> [default: 4]",
            },
            TestData {
                definition: ParameterDefinition::new()
                    .short('D')
                    .multi()
                    .optional()
                    .description("define"),
                display: "-D <string>... # define",
            },
            TestData {
                definition: ParameterDefinition::unflagged().multi(),
                display: "<param>... <string> (required)",
            },
            TestData {
                definition: ParameterDefinition::unflagged()
                    .kind(TypeSpec::choices(vec!["a", "b"]))
                    .optional()
                    .default_value("a"),
                display: "[param] <choice (a|b)> [default: \"a\"]",
            },
        ];

        for (i, d) in tests.into_iter().enumerate() {
            let msg = format!("test[{}]: {:?}", i, d);

            let schema = Schema::validate(vec![("param", d.definition)]).unwrap();
            let param = schema.get("param").unwrap();

            assert_eq!(param.to_string(), d.display, "{}", msg);
        }
    }

    #[test]
    fn test_generate_help() {
        let parser = build_parser()
            .name("mytool")
            .version("1.2.3")
            .summary("does things")
            .notes("some notes");

        let mut writer = BufWriter::default();
        parser.generate_help(&mut writer).unwrap();

        let output = writer.to_string();

        let patterns = &[
            r"(?m)^NAME:\n    mytool$",
            r"(?m)^VERSION:\n    1\.2\.3$",
            r"(?m)^SUMMARY:\n    does things$",
            r"(?m)^USAGE:\n    mytool \[FLAGS\] \[OPTIONS\] \[files\]\.\.\.$",
            r"(?m)^FLAGS:\n    --verbose, -v$",
            r"(?m)^OPTIONS:\n    --out, -o <string> \(required\)$",
            r"(?m)^    --jobs, -j <int>$",
            r#"(?m)^    --mode <choice \(fast\|slow\)> \[default: "slow"\]$"#,
            r"(?m)^POSITIONAL ARGUMENTS:\n    \[files\]\.\.\. <string>$",
            r"(?m)^NOTES:\n\nsome notes$",
        ];

        for (i, pattern) in patterns.iter().enumerate() {
            let re = Regex::new(pattern).unwrap();

            assert!(
                re.is_match(&output),
                "test[{}]: pattern: {:?}, output: {:?}",
                i,
                pattern,
                output
            );
        }

        // Head parameters come before the flags.
        let parser = Parser::new(vec![
            ("input", ParameterDefinition::unflagged()),
            ("out", ParameterDefinition::new().short('o').optional()),
        ])
        .unwrap()
        .name("tool");

        let mut writer = BufWriter::default();
        parser.generate_help(&mut writer).unwrap();

        let output = writer.to_string();

        let re = Regex::new(r"(?m)^    tool <input> \[OPTIONS\]$").unwrap();
        assert!(re.is_match(&output), "output: {:?}", output);
        assert!(!output.contains("FLAGS:"), "output: {:?}", output);
        assert!(!output.contains("VERSION:"), "output: {:?}", output);
    }

    #[test]
    fn test_get_args() {
        let args = get_args();

        assert_eq!(args.len(), env::args().count() - 1);
    }
}
