//! Diagnostics produced by each stage of the pipeline.
use std::path::PathBuf;

use crate::types::Type;

/// The lexer skips the offending text and carries on.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LexicalError {
	#[error("illegal character '{ch}' at line {line}")]
	IllegalCharacter { ch: char, line: usize },
	/// The literal is dropped rather than clamped
	#[error("number {literal} out of range at line {line}")]
	NumberOutOfRange { literal: String, line: usize },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SyntaxError {
	#[error("syntax error at token {token} (kind {kind}) at line {line}")]
	UnexpectedToken {
		token: String,
		kind: &'static str,
		line: usize,
	},
	#[error("unexpected end of input")]
	UnexpectedEof,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
	#[error("semantic error: variable '{name}' already declared in this scope (line {line})")]
	Redeclaration { name: String, line: usize },
	#[error("semantic error: subprogram '{name}' already defined (line {line})")]
	RoutineRedefinition { name: String, line: usize },
	#[error("semantic error: '{name}' is reserved for generated labels (line {line})")]
	ReservedName { name: String, line: usize },
	#[error("semantic error: array bounds {min}..{max} are reversed (line {line})")]
	ReversedBounds { min: i64, max: i64, line: usize },
	#[error("semantic error: array bounds {min}..{max} hold too many elements (line {line})")]
	ArraySize { min: i64, max: i64, line: usize },
	#[error("semantic error: array elements must be scalar (line {line})")]
	NestedArray { line: usize },
	#[error("semantic error: '{name}' cannot be passed or returned as an array (line {line})")]
	ArrayInSignature { name: String, line: usize },
	#[error("semantic error: variable '{name}' not declared (line {line})")]
	UndeclaredVariable { name: String, line: usize },
	#[error("semantic error: function/procedure '{name}' not declared (line {line})")]
	UndeclaredRoutine { name: String, line: usize },
	#[error("semantic error: procedure '{name}' does not return a value (line {line})")]
	ProcedureAsValue { name: String, line: usize },
	#[error("semantic error: incompatible assignment {found} -> {expected} (line {line})")]
	AssignMismatch {
		expected: Type,
		found: Type,
		line: usize,
	},
	#[error("semantic error: whole arrays cannot be assigned (line {line})")]
	ArrayAssignment { line: usize },
	#[error("semantic error: characters of string '{name}' are read-only (line {line})")]
	StringElementStore { name: String, line: usize },
	#[error("semantic error: {statement} condition must be BOOLEAN, not {found} (line {line})")]
	NonBooleanCondition {
		statement: &'static str,
		found: Type,
		line: usize,
	},
	#[error("semantic error: FOR control variable '{name}' must be INTEGER (line {line})")]
	ForVariableType { name: String, line: usize },
	#[error("semantic error: FOR {bound} bound must be INTEGER, not {found} (line {line})")]
	ForBoundType {
		bound: &'static str,
		found: Type,
		line: usize,
	},
	#[error("semantic error: operator '{op}' requires numbers, not {lhs} and {rhs} (line {line})")]
	NonNumericOperands {
		op: &'static str,
		lhs: Type,
		rhs: Type,
		line: usize,
	},
	#[error("semantic error: DIV/MOD require INTEGER operands (line {line})")]
	NonIntegerDivision { line: usize },
	#[error("semantic error: concatenation requires both operands STRING (line {line})")]
	Concatenation { line: usize },
	#[error("semantic error: invalid comparison {lhs} vs {rhs} (line {line})")]
	InvalidComparison { lhs: Type, rhs: Type, line: usize },
	#[error("semantic error: logical operator '{op}' requires BOOLEAN operands (line {line})")]
	NonBooleanLogic { op: &'static str, line: usize },
	#[error("semantic error: unary '{op}' requires {expected}, not {found} (line {line})")]
	UnaryOperand {
		op: &'static str,
		expected: &'static str,
		found: Type,
		line: usize,
	},
	#[error("semantic error: array/string index must be INTEGER, not {found} (line {line})")]
	IndexType { found: Type, line: usize },
	#[error("semantic error: '{name}' is not an array or string (line {line})")]
	NotIndexable { name: String, line: usize },
	#[error("semantic error: LENGTH requires STRING or ARRAY, not {found} (line {line})")]
	LengthArgument { found: Type, line: usize },
	#[error("semantic error: '{name}' expects {expected} arguments, got {found} (line {line})")]
	Arity {
		name: String,
		expected: usize,
		found: usize,
		line: usize,
	},
	#[error("semantic error: argument {position} of '{name}': expected {expected}, got {found} (line {line})")]
	ArgumentType {
		name: String,
		position: usize,
		expected: Type,
		found: Type,
		line: usize,
	},
	#[error("semantic error: cannot read a value of type {found} (line {line})")]
	UnreadableTarget { found: Type, line: usize },
	#[error("semantic error: cannot write a value of type {found} (line {line})")]
	UnwritableValue { found: Type, line: usize },
}

/// A tree reached the generator in a state semantic analysis should have
/// rejected. Generation stops at the first one.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
	#[error("internal error: unresolved symbol '{name}' (line {line})")]
	UnresolvedSymbol { name: String, line: usize },
	#[error("internal error: unresolved subprogram '{name}' (line {line})")]
	UnresolvedRoutine { name: String, line: usize },
	#[error("internal error: '{name}' cannot be stored into (line {line})")]
	InvalidTarget { name: String, line: usize },
	#[error("internal error: storage exceeds the addressable range (line {line})")]
	StorageOverflow { line: usize },
	#[error("internal error: expression at line {line} has no inferred type")]
	MissingType { line: usize },
}

#[derive(thiserror::Error, Debug)]
pub enum CompileError {
	#[error("Generated {} syntax errors", .0.len())]
	Syntax(Vec<SyntaxError>),
	#[error("Generated {} semantic errors", .0.len())]
	Semantic(Vec<SemanticError>),
	#[error(transparent)]
	Generation(#[from] GenerationError),
	#[error("{}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}
