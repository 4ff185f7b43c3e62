//! `apidesign`: command-line front end for declarative API designs.
//!
//! Provides three subcommands working on JSON design documents:
//!
//! - **`validate`**: run the engine and report every design error.
//! - **`render`**: print a summary of the design, or one media type.
//! - **`project`**: materialize one view of a media type.
//!
//! All subcommands read the document from a file path or from stdin (`-`).
//! Exit codes: 0 on success, 1 when the design has errors, 2 when the input
//! cannot be read or parsed, or a requested definition does not exist.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use apidesign::render::{render_design, render_media_type};
use apidesign::{DesignDocument, EngineConfig, ExampleGenerator, Registry};
use clap::{Args, Parser, Subcommand};

/// apidesign: declarative API design engine
///
/// Validate, render, and project API designs.
#[derive(Parser)]
#[command(name = "apidesign", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct EngineArgs {
    /// Seed for generated examples.
    #[arg(long, global = true, env = "APIDESIGN_EXAMPLE_SEED", value_name = "SEED")]
    seed: Option<String>,

    /// Do not generate missing examples during finalize.
    #[arg(long, global = true)]
    no_examples: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the engine over a design document and report every error.
    ///
    /// Exits 0 if the design is valid, 1 otherwise.
    ///
    /// Pass `-` as FILE to read from stdin.
    Validate {
        /// Path to a JSON design document, or `-` for stdin.
        file: PathBuf,
    },

    /// Render a design, or one of its media types, as human-readable text.
    Render {
        /// Path to a JSON design document, or `-` for stdin.
        file: PathBuf,

        /// Render only this media type (any spelling of its identifier).
        #[arg(short = 'm', long, value_name = "IDENTIFIER")]
        media_type: Option<String>,
    },

    /// Project a media type onto one of its views and render the result.
    ///
    /// Examples:
    ///   apidesign project cellar.json -m application/vnd.bottle -v tiny
    ///   apidesign project - -m application/vnd.bottle -v default --example < cellar.json
    Project {
        /// Path to a JSON design document, or `-` for stdin.
        file: PathBuf,

        /// Identifier of the media type to project.
        #[arg(short = 'm', long, value_name = "IDENTIFIER")]
        media_type: String,

        /// View to project onto.
        #[arg(short = 'v', long, default_value = "default", value_name = "NAME")]
        view: String,

        /// Also print a generated example of the projected shape as JSON.
        #[arg(long)]
        example: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apidesign=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = engine_config(&cli.engine);

    match cli.command {
        Command::Validate { file } => {
            let reg = run_design(&file, config);
            let named = reg.declared().len();
            println!(
                "valid: {} definition{}, {} resource{}",
                named,
                if named == 1 { "" } else { "s" },
                reg.resources().len(),
                if reg.resources().len() == 1 { "" } else { "s" },
            );
        }

        Command::Render { file, media_type } => {
            let reg = run_design(&file, config);
            match media_type {
                Some(identifier) => {
                    let id = find_media_type(&reg, &identifier);
                    print!("{}", render_media_type(&reg, id));
                }
                None => print!("{}", render_design(&reg)),
            }
        }

        Command::Project {
            file,
            media_type,
            view,
            example,
        } => {
            let seed = config.example_seed.clone();
            let depth = config.max_example_depth;
            let mut reg = run_design(&file, config);
            let id = find_media_type(&reg, &media_type);
            let projection = reg
                .project(id, &view)
                .unwrap_or_else(|e| fatal(&format!("cannot project {media_type:?}: {e}")));

            print!("{}", render_media_type(&reg, projection.media_type));
            if let Some(links) = projection.links {
                println!();
                print!("{}", render_media_type(&reg, links));
            }

            if example {
                let att = reg.named(projection.media_type).attribute();
                let value = ExampleGenerator::new(&seed, depth)
                    .generate(&reg, att)
                    .unwrap_or(serde_json::Value::Null);
                let json = serde_json::to_string_pretty(&value)
                    .unwrap_or_else(|e| fatal(&format!("failed to encode example: {e}")));
                println!();
                println!("{}", json);
            }
        }
    }
}

/// Environment first, then command-line overrides.
fn engine_config(args: &EngineArgs) -> EngineConfig {
    let mut config = EngineConfig::from_env();
    if let Some(seed) = &args.seed {
        config = config.with_seed(seed.clone());
    }
    if args.no_examples {
        config = config.without_examples();
    }
    config
}

/// Load the document at `path` and run the engine over it. Design errors
/// are printed one per line and exit with code 1.
fn run_design(path: &PathBuf, config: EngineConfig) -> Registry {
    let json = read_input(path);
    let document = DesignDocument::from_json(&json)
        .unwrap_or_else(|e| fatal(&format!("failed to parse design document: {}", e)));

    tracing::debug!(path = %path.display(), "loaded design document");

    let mut reg = Registry::with_config(config);
    document.load(&mut reg);
    if let Err(errors) = reg.run() {
        for error in &errors {
            eprintln!("error: {}", error);
        }
        eprintln!(
            "{} error{}",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        );
        process::exit(1);
    }
    reg
}

fn find_media_type(reg: &Registry, identifier: &str) -> apidesign::TypeId {
    reg.find_media_type(identifier)
        .unwrap_or_else(|| fatal(&format!("unknown media type {:?}", identifier)))
}

/// Read the full contents of a file, or stdin when the path is `"-"`.
fn read_input(path: &PathBuf) -> String {
    if path.to_str() == Some("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {}", e)));
        buf
    } else {
        fs::read_to_string(path).unwrap_or_else(|e| {
            fatal(&format!("failed to read {}: {}", path.display(), e))
        })
    }
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("apidesign: {}", msg);
    process::exit(2);
}
