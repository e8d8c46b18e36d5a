use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use pasvm::{error::CompileError, output_path, Compiler};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
	/// Pascal source file
	source: PathBuf,
	/// Defaults to the source path with a `.vm` extension
	#[arg(short, long)]
	output: Option<PathBuf>,
}

fn main() -> ExitCode {
	env_logger::init();
	let args = Args::parse();
	let output = args.output.unwrap_or_else(|| output_path(&args.source));

	let mut compiler = Compiler::default();
	let result = compiler.compile_file(&args.source, &output);
	for warning in &compiler.warnings {
		eprintln!("{warning}");
	}
	match result {
		Ok(()) => {
			println!("Success! {}", output.display());
			ExitCode::SUCCESS
		}
		Err(error) => {
			report(&error);
			ExitCode::FAILURE
		}
	}
}

fn report(error: &CompileError) {
	match error {
		CompileError::Syntax(errors) => errors.iter().for_each(|e| eprintln!("{e}")),
		CompileError::Semantic(errors) => errors.iter().for_each(|e| eprintln!("{e}")),
		CompileError::Generation(_) | CompileError::Io { .. } => {}
	}
	eprintln!("{error}");
}
