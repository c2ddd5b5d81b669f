use std::{fs, path::PathBuf};

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use protodesc::Compiler;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// The source file(s) to compile.
    #[arg(value_name = "PROTO_FILES", required = true)]
    files: Vec<String>,
    /// A directory in which to search for imports.
    #[arg(
        short = 'I',
        long = "include",
        visible_alias = "proto_path",
        value_name = "PATH",
        default_value = "."
    )]
    includes: Vec<PathBuf>,
    /// The output path to write the encoded file descriptor set to.
    #[arg(
        short = 'o',
        long = "output",
        visible_alias = "descriptor_set_out",
        value_name = "PATH"
    )]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    miette::set_panic_hook();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut compiler = Compiler::new(args.includes)?;
    for file in &args.files {
        compiler.add_file(file)?;
    }

    let encoded = compiler.encode_file_descriptor_set()?;
    if let Some(output) = args.output {
        fs::write(output, encoded).into_diagnostic()?;
    }

    Ok(())
}
