//! Compiles a small Pascal dialect to EWVM stack machine code.
//!
//! The pipeline runs four passes, each consuming the whole output of the one
//! before it:
//!
//! 1. `lexer::tokenize` turns source text into tokens, skipping (and
//!    reporting) characters it does not recognize.
//! 2. `parser::parse` builds a `Program`, recovering from syntax errors at
//!    statement boundaries so that all of them are reported together.
//! 3. `analyzer::analyze` checks scopes and types and records the type of
//!    every expression.
//! 4. `vm_gen::generate` emits instructions, using the recorded types to
//!    pick integer, real or string opcodes.
pub mod analyzer;
pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod types;
pub mod vm_gen;

use std::path::{Path, PathBuf};

use error::{CompileError, LexicalError};
use vm_gen::Instruction;

/// Runs the pipeline. Lexical errors never stop compilation; they collect in
/// `warnings` whatever the outcome of the later passes.
#[derive(Debug, Default)]
pub struct Compiler {
	pub warnings: Vec<LexicalError>,
}

impl Compiler {
	pub fn compile(&mut self, source: &str) -> Result<Vec<Instruction>, CompileError> {
		let tokens = lexer::tokenize(source);
		log::debug!(
			"lexed {} tokens, {} illegal characters",
			tokens.symbol.len(),
			tokens.errors.len()
		);
		self.warnings.extend(tokens.errors);
		let program = parser::parse(tokens.symbol).map_err(CompileError::Syntax)?;
		let analysis = analyzer::analyze(&program);
		if !analysis.is_ok() {
			return Err(CompileError::Semantic(analysis.errors));
		}
		Ok(vm_gen::generate(&program, &analysis)?)
	}

	/// Compiles `source` and writes the listing to `output`. Nothing is
	/// written when compilation fails.
	pub fn compile_file(&mut self, source: &Path, output: &Path) -> Result<(), CompileError> {
		let text = std::fs::read_to_string(source).map_err(|error| CompileError::Io {
			path: source.to_path_buf(),
			source: error,
		})?;
		let code = self.compile(&text)?;
		std::fs::write(output, vm_gen::render(&code)).map_err(|error| CompileError::Io {
			path: output.to_path_buf(),
			source: error,
		})
	}
}

/// Compiles source text straight to its instruction listing.
pub fn compile(source: &str) -> Result<String, CompileError> {
	let code = Compiler::default().compile(source)?;
	Ok(vm_gen::render(&code))
}

/// `prog.pas` becomes `prog.vm`; a path without an extension gains one.
pub fn output_path(source: &Path) -> PathBuf {
	source.with_extension("vm")
}

#[cfg(test)]
mod test {
	#[allow(unused_imports)]
	use super::*;

	#[test]
	fn output_paths() {
		assert_eq!(output_path(Path::new("dir/prog.pas")), PathBuf::from("dir/prog.vm"));
		assert_eq!(output_path(Path::new("prog")), PathBuf::from("prog.vm"));
	}
}
