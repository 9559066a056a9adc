//! Compile driver.
//!
//! A grammar implements [`Frontend`] and gets a complete command line tool
//! from [`main_with`]:
//!
//! ```text
//! mygrammar [-c] [-o <output>] [--config <json>] [-v...] <input>
//! ```
//!
//! The input is parsed into a tree, wrapped in the document node and saved
//! next to the input with a `.yyast` extension unless `-o` says otherwise.

use anyhow::Context;
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use log::LevelFilter;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::builder::AstBuilder;
use crate::config::BuilderConfig;
use crate::error::{self, Error};
use crate::node::{Node, Value};
use crate::writer;

/// Extension of saved trees.
pub const OUTPUT_EXTENSION: &str = "yyast";

/// Exit status for bad input.
pub const EXIT_INPUT_ERROR: i32 = 1;

/// Exit status for internal consistency errors, `EX_SOFTWARE`.
pub const EXIT_INTERNAL_ERROR: i32 = 70;

/// A parser that drives an [`AstBuilder`].
pub trait Frontend {
    /// Parse `source`, feeding every token to `builder`, and return the root
    /// of the tree.
    fn parse(&mut self, source: &[u8], builder: &mut AstBuilder) -> error::Result<Value>;
}

/// Command line arguments of a compiler built on [`main_with`].
#[derive(Parser, Debug)]
#[command(about = "Parse a source file into a yyast tree")]
pub struct CompileArgs {
    /// Input file to parse
    pub input: PathBuf,

    /// Output file (default: the input with a .yyast extension)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Compile the input, the only supported mode
    #[arg(short = 'c', long = "compile")]
    pub compile: bool,

    /// JSON file with builder settings
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    #[allow(missing_docs)]
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,
}

/// Parse `source` with `frontend` and wrap the result in the document node.
pub fn compile_source<F: Frontend + ?Sized>(
    frontend: &mut F,
    source: &[u8],
    input_name: &str,
    config: BuilderConfig,
) -> error::Result<Node> {
    let mut builder = AstBuilder::for_input(config, input_name);
    let root = frontend.parse(source, &mut builder)?;
    builder.document(root)
}

/// The input path with its extension replaced by `.yyast`.
pub fn default_output(input: &Path) -> PathBuf {
    input.with_extension(OUTPUT_EXTENSION)
}

/// Load builder settings from a JSON file, or use the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<BuilderConfig> {
    let Some(path) = path else {
        return Ok(BuilderConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    BuilderConfig::from_json_str(&json)
        .with_context(|| format!("Invalid builder configuration in {}", path.display()))
}

/// Compile `input` and save the tree, returning where it was written.
pub fn compile_file<F: Frontend + ?Sized>(
    frontend: &mut F,
    input: &Path,
    output: Option<&Path>,
    config: BuilderConfig,
) -> anyhow::Result<PathBuf> {
    let source = std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let input_name = input.to_string_lossy();
    let document = compile_source(frontend, &source, &input_name, config)?;

    let output = output.map_or_else(|| default_output(input), Path::to_path_buf);
    writer::save(&output, &document).with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(output)
}

/// Run a compile for already parsed arguments.
pub fn run<F: Frontend + ?Sized>(frontend: &mut F, args: &CompileArgs) -> anyhow::Result<PathBuf> {
    let config = load_config(args.config.as_deref())?;
    compile_file(frontend, &args.input, args.output.as_deref(), config)
}

/// Exit status for a failed compile.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<Error>() {
        Some(err) if err.is_internal() => EXIT_INTERNAL_ERROR,
        _ => EXIT_INPUT_ERROR,
    }
}

/// Install the `env_logger` backend at `level`.
pub fn init_logger(level: LevelFilter) {
    env_logger::Builder::new()
        .format(|buf, record| writeln!(buf, "{}:\n{}", record.level(), record.args()))
        .filter_level(level)
        .target(env_logger::fmt::Target::Stderr)
        .init();
}

/// Parse the command line, compile and exit.
pub fn main_with<F: Frontend>(mut frontend: F) -> ! {
    let args = CompileArgs::parse();
    init_logger(args.verbose.log_level_filter());

    match run(&mut frontend, &args) {
        Ok(output) => {
            log::debug!("compiled {} into {}", args.input.display(), output.display());
            std::process::exit(0)
        }
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_code(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Words;

    impl Frontend for Words {
        fn parse(&mut self, source: &[u8], builder: &mut AstBuilder) -> error::Result<Value> {
            let mut words = Vec::new();
            for word in source.split(|b| b.is_ascii_whitespace()) {
                builder.advance(word);
                builder.advance(b" ");
                if !word.is_empty() {
                    words.push(builder.identifier(word)?);
                }
            }
            builder.branch("words", words)
        }
    }

    struct Broken;

    impl Frontend for Broken {
        fn parse(&mut self, source: &[u8], builder: &mut AstBuilder) -> error::Result<Value> {
            let count = builder.count(source);
            builder.branch("bad", [count])
        }
    }

    #[test]
    fn test_default_output() {
        assert_eq!(default_output(Path::new("src/calc.y")), PathBuf::from("src/calc.yyast"));
        assert_eq!(default_output(Path::new("calc")), PathBuf::from("calc.yyast"));
    }

    #[test]
    fn test_compile_source() {
        let document = compile_source(&mut Words, b"a bb", "words.txt", BuilderConfig::default()).unwrap();
        assert_eq!(document.name().to_string(), "yyast");
    }

    #[test]
    fn test_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        std::fs::write(&input, "x").unwrap();

        let err = compile_file(&mut Broken, &input, None, BuilderConfig::default()).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_INTERNAL_ERROR);

        let missing = dir.path().join("missing.txt");
        let err = compile_file(&mut Words, &missing, None, BuilderConfig::default()).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_INPUT_ERROR);
    }

    #[test]
    fn test_load_config() {
        assert_eq!(load_config(None).unwrap(), BuilderConfig::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"tab_width": 4}"#).unwrap();
        assert_eq!(load_config(Some(path.as_path())).unwrap().tab_width, 4);

        std::fs::write(&path, "not json").unwrap();
        assert!(load_config(Some(path.as_path())).is_err());
    }

    #[test]
    fn test_args() {
        let args = CompileArgs::parse_from(["calc", "-c", "-o", "out.yyast", "in.y"]);
        assert!(args.compile);
        assert_eq!(args.input, PathBuf::from("in.y"));
        assert_eq!(args.output, Some(PathBuf::from("out.yyast")));
        assert_eq!(args.verbose.log_level_filter(), LevelFilter::Warn);
    }
}
