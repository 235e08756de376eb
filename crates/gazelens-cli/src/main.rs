//! gazelens: run filter pipelines headless and emit the equivalent
//! OpenCV script.
//!
//! Builds a pipeline from a JSON definition and/or `--step` flags, runs
//! it against an image, writes the processed image, and prints (or
//! writes) the script that reproduces the pipeline with OpenCV.
//!
//! # Usage
//!
//! ```text
//! gazelens photo.png --step grayscale --step threshold:thresh=90 \
//!     --step findContours --output contours.png --syntax python
//! gazelens --list
//! RUST_LOG=debug gazelens photo.png --pipeline pipeline.json --json
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod definition;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use gazelens_export::CodeOptions;
use gazelens_pipeline::{Catalog, Direction, Syntax};
use gazelens_studio::{Notice, Session, encode_png};

use crate::definition::{PipelineDefinition, parse_step};

/// Run gazelens filter pipelines and generate OpenCV code.
///
/// Steps from `--pipeline` come first, then each `--step` in order.
#[derive(Parser)]
#[command(name = "gazelens", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: Option<PathBuf>,

    /// List the available operations and their parameters.
    #[arg(long)]
    list: bool,

    /// JSON pipeline definition file.
    #[arg(long, value_name = "FILE")]
    pipeline: Option<PathBuf>,

    /// Append a step: `id[:name=value,...]`. Repeatable.
    #[arg(long = "step", value_name = "STEP")]
    steps: Vec<String>,

    /// Flip the execution direction.
    #[arg(long)]
    reverse: bool,

    /// Write the processed image as PNG.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Syntax of the generated script.
    #[arg(long, value_enum, default_value_t = SyntaxArg::Python)]
    syntax: SyntaxArg,

    /// Write the generated script to a file instead of stdout.
    #[arg(long, value_name = "FILE")]
    code: Option<PathBuf>,

    /// Include library install instructions in the script.
    #[arg(long)]
    install: bool,

    /// Python: save the result to `image_path_destination`.
    #[arg(long)]
    save_image: bool,

    /// Python: notebook install and inline display.
    #[arg(long)]
    colab: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

/// Script syntax selection.
#[derive(Clone, Copy, ValueEnum)]
enum SyntaxArg {
    /// OpenCV.js.
    Javascript,
    /// Python with `cv2`.
    Python,
}

impl From<SyntaxArg> for Syntax {
    fn from(arg: SyntaxArg) -> Self {
        match arg {
            SyntaxArg::Javascript => Self::Javascript,
            SyntaxArg::Python => Self::Python,
        }
    }
}

/// Collect the pipeline described by `--pipeline`, `--step`, and
/// `--reverse`.
fn definition_from_cli(cli: &Cli) -> Result<PipelineDefinition, String> {
    let mut definition = match cli.pipeline {
        Some(ref path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
            PipelineDefinition::from_json(&json)?
        }
        None => PipelineDefinition::default(),
    };
    for arg in &cli.steps {
        definition.steps.push(parse_step(arg)?);
    }
    if cli.reverse {
        definition.direction = definition.direction.flipped();
    }
    Ok(definition)
}

/// Replay `definition` into `session` as user actions.
fn build(session: &mut Session, definition: &PipelineDefinition) -> Result<(), String> {
    for step in &definition.steps {
        let (key, _) = session
            .add(&step.operation)
            .map_err(|e| Notice::from_error(&e).message)?;
        for (name, value) in step.params.iter() {
            session
                .set_param(key, name, value.clone())
                .map_err(|e| format!("{}: {e}", step.operation))?;
        }
    }
    if definition.direction == Direction::Reversed {
        session.reverse();
    }
    Ok(())
}

/// Print the catalog.
fn print_catalog(catalog: &Catalog) {
    println!("{:<14} {:<22} {}", "Id", "Name", "Parameters");
    println!("{}", "-".repeat(72));
    for descriptor in catalog.iter() {
        let params: Vec<String> = descriptor
            .schema()
            .iter()
            .map(|(name, spec)| match spec.default_value() {
                Some(value) => format!("{name}={value}"),
                None => name.to_string(),
            })
            .collect();
        println!(
            "{:<14} {:<22} {}",
            descriptor.id(),
            descriptor.display_name(),
            params.join(", "),
        );
        if !descriptor.dependencies().is_empty() {
            println!("{:<14} requires: {}", "", descriptor.dependencies().join(", "));
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut session = Session::default();

    if cli.list {
        print_catalog(session.catalog());
        if cli.image_path.is_none() && cli.steps.is_empty() && cli.pipeline.is_none() {
            return ExitCode::SUCCESS;
        }
    }

    let definition = match definition_from_cli(&cli) {
        Ok(d) => d,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    log::debug!(
        "pipeline definition: {} steps, {:?}",
        definition.steps.len(),
        definition.direction,
    );

    session.set_code_options(CodeOptions {
        install_library: cli.install,
        save_image: cli.save_image,
        display_in_colab: cli.colab,
    });
    session.set_syntax(cli.syntax.into());

    if let Err(msg) = build(&mut session, &definition) {
        eprintln!("{msg}");
        return ExitCode::FAILURE;
    }

    let refresh = match cli.image_path {
        Some(ref path) => {
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    eprintln!("Error reading {}: {e}", path.display());
                    return ExitCode::FAILURE;
                }
            };
            eprintln!("Image: {} ({} bytes)", path.display(), bytes.len());
            match session.load_image(&bytes) {
                Ok(refresh) => Some(refresh),
                Err(e) => {
                    eprintln!("{}", Notice::from_error(&e));
                    return ExitCode::FAILURE;
                }
            }
        }
        None => None,
    };

    let code = session.code(session.syntax());
    match cli.code {
        Some(ref path) => match std::fs::write(path, &code) {
            Ok(()) => eprintln!("Script written to {} ({} bytes)", path.display(), code.len()),
            Err(e) => {
                eprintln!("Error writing script to {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None if !cli.json => print!("{code}"),
        None => {}
    }

    let Some(refresh) = refresh else {
        return ExitCode::SUCCESS;
    };
    if let Some(notice) = refresh.notice() {
        eprintln!("{notice}");
        return ExitCode::FAILURE;
    }

    if let Some(report) = refresh.report {
        if cli.json {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing report: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            eprintln!("{}", report.report());
        }
    }

    if let Some(ref out_path) = cli.output
        && let Some(rendered) = session.rendered()
    {
        let png = match encode_png(rendered.image.image()) {
            Ok(png) => png,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        };
        match std::fs::write(out_path, &png) {
            Ok(()) => eprintln!("Image written to {} ({} bytes)", out_path.display(), png.len()),
            Err(e) => {
                eprintln!("Error writing image to {}: {e}", out_path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
