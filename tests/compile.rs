use pasvm::{
	compile,
	error::{CompileError, LexicalError, SemanticError, SyntaxError},
	Compiler,
};

fn lines(source: &str) -> Vec<String> {
	match compile(source) {
		Ok(listing) => listing.lines().map(str::to_string).collect(),
		Err(error) => panic!("compilation failed: {error:?}"),
	}
}

fn semantic_errors(source: &str) -> Vec<SemanticError> {
	match compile(source) {
		Err(CompileError::Semantic(errors)) => errors,
		other => panic!("expected semantic errors, got {other:?}"),
	}
}

fn labels(listing: &[String]) -> Vec<&str> {
	listing
		.iter()
		.filter_map(|line| line.strip_suffix(':'))
		.filter(|label| *label != "main")
		.collect()
}

#[test]
fn straight_line_program() {
	assert_eq!(
		compile("program P; var x: integer; begin x := 1 + 2; writeln(x); end.").unwrap(),
		"\tJUMP main
main:
\tSTART
\tPUSHN 1
\tPUSHI 1
\tPUSHI 2
\tADD
\tSTOREG 0
\tPUSHG 0
\tWRITEI
\tWRITELN
\tSTOP
"
	);
}

#[test]
fn if_else_uses_two_labels() {
	let listing = lines("program P; begin if true then writeln(1) else writeln(2); end.");
	assert_eq!(labels(&listing), ["label1", "label2"]);
	let jz = listing.iter().position(|l| l == "\tJZ label1").unwrap();
	let else_branch = listing.iter().position(|l| l == "label1:").unwrap();
	let jump = listing.iter().position(|l| l == "\tJUMP label2").unwrap();
	// a true condition runs the then branch and jumps over writeln(2)
	assert!(jz < jump && jump < else_branch);
	assert_eq!(listing[else_branch + 1], "\tPUSHI 2");
}

#[test]
fn for_loop_directions() {
	let up = lines("program P; var i: integer; begin for i := 1 to 3 do writeln(i); end.");
	assert!(up.iter().any(|l| l == "\tINFEQ"));
	assert!(up.iter().any(|l| l == "\tADD"));
	assert_eq!(labels(&up).len(), 2);

	let down = lines("program P; var i: integer; begin for i := 3 downto 1 do writeln(i); end.");
	assert!(down.iter().any(|l| l == "\tSUPEQ"));
	assert!(down.iter().any(|l| l == "\tSUB"));
	assert!(!down.iter().any(|l| l == "\tINFEQ" || l == "\tADD"));
}

#[test]
fn array_elements_are_offset_from_the_lower_bound() {
	for (lo, hi, i) in [(1, 5, 1), (1, 5, 5), (-3, 3, 0), (10, 20, 15), (0, 2, 9)] {
		let source = format!(
			"program P; var x, y: integer; a: array[{lo}..{hi}] of integer; begin a[{i}] := 1 end."
		);
		let listing = lines(&source);
		// x and y come first, so the array starts at address 2
		assert_eq!(
			listing[4..],
			[
				"\tPUSHGP".to_string(),
				"\tPUSHI 2".to_string(),
				"\tPADD".to_string(),
				format!("\tPUSHI {i}"),
				format!("\tPUSHI {lo}"),
				"\tSUB".to_string(),
				"\tPUSHI 1".to_string(),
				"\tSTOREN".to_string(),
				"\tSTOP".to_string(),
			]
		);
		assert_eq!(listing[3], format!("\tPUSHN {}", 2 + hi - lo + 1));
	}
}

#[test]
fn parameter_and_local_offsets() {
	let listing = lines(
		r"
program P;
procedure p(a, b: integer; c, d: real);
var x, y, z: integer;
begin
	x := a; y := b; z := 0;
	writeln(c, d)
end;
begin
	p(1, 2, 3.5, 4)
end.
",
	);
	let body: Vec<&str> = listing.iter().map(String::as_str).collect();
	let start = body.iter().position(|l| *l == "p:").unwrap();
	assert_eq!(
		body[start..start + 14],
		[
			"p:",
			"\tPUSHN 3",
			"\tPUSHL -4",
			"\tSTOREL 0",
			"\tPUSHL -3",
			"\tSTOREL 1",
			"\tPUSHI 0",
			"\tSTOREL 2",
			"\tPUSHL -2",
			"\tWRITEF",
			"\tPUSHL -1",
			"\tWRITEF",
			"\tWRITELN",
			"\tRETURN",
		]
	);
	assert!(body.ends_with(&[
		"\tPUSHI 1",
		"\tPUSHI 2",
		"\tPUSHF 3.5",
		"\tPUSHI 4",
		"\tITOF",
		"\tPUSHA p",
		"\tCALL",
		"\tPOP 4",
		"\tSTOP",
	]));
}

#[test]
fn recursive_function() {
	let listing = lines(
		r"
program Factorial;
var n: integer;
function fact(k: integer): integer;
begin
	if k <= 1 then fact := 1
	else fact := k * fact(k - 1)
end;
begin
	readln(n);
	writeln('fact = ', fact(n))
end.
",
	);
	assert!(listing.contains(&"fact:".to_string()));
	assert!(listing.contains(&"\tSTOREL -2".to_string()));
	assert_eq!(listing.iter().filter(|l| *l == "\tPUSHA fact").count(), 2);
	assert!(listing.contains(&"\tPUSHS \"fact = \"".to_string()));
}

#[test]
fn widening_is_one_way() {
	assert!(compile("program P; var r: real; i: integer; begin r := i end.").is_ok());
	assert_eq!(
		semantic_errors("program P; var r: real; i: integer; begin i := r end."),
		vec![SemanticError::AssignMismatch {
			expected: pasvm::types::Type::Integer,
			found: pasvm::types::Type::Real,
			line: 1
		}]
	);
}

#[test]
fn redeclaration_is_reported_once() {
	let errors = semantic_errors(
		r"
program P;
var x: integer;
    x: string;
begin
	x := 1
end.
",
	);
	assert_eq!(
		errors,
		vec![SemanticError::Redeclaration {
			name: "x".into(),
			line: 4
		}]
	);
}

#[test]
fn undeclared_function_is_reported_once() {
	let errors = semantic_errors("program P; var x: integer; begin x := missing(1) + 1 end.");
	assert_eq!(
		errors,
		vec![SemanticError::UndeclaredRoutine {
			name: "missing".into(),
			line: 1
		}]
	);
}

#[test]
fn reserved_words_in_any_case() {
	let listing = lines("PROGRAM P; VAR Flag: Boolean; BEGIN Flag := TRUE; WriteLn(Flag) END.");
	assert!(listing.contains(&"\tPUSHI 1".to_string()));
	assert!(listing.contains(&"\tWRITEI".to_string()));
}

#[test]
fn doubled_quotes_in_strings() {
	let listing = lines("program P; begin writeln('it''s') end.");
	assert!(listing.contains(&"\tPUSHS \"it's\"".to_string()));
}

#[test]
fn syntax_errors_fail_the_run() {
	match compile("program P; begin x := ; end.") {
		Err(CompileError::Syntax(errors)) => {
			assert_eq!(
				errors,
				vec![SyntaxError::UnexpectedToken {
					token: ";".into(),
					kind: ";",
					line: 1
				}]
			)
		}
		other => panic!("expected a syntax error, got {other:?}"),
	}
	assert!(matches!(
		compile("program P; begin"),
		Err(CompileError::Syntax(_))
	));
}

#[test]
fn illegal_characters_are_warnings() {
	let mut compiler = Compiler::default();
	let code = compiler.compile("program P;\nbegin ? writeln(1)\nend.");
	assert!(code.is_ok());
	assert_eq!(compiler.warnings.len(), 1);
	assert_eq!(compiler.warnings[0].to_string(), "illegal character '?' at line 2");
}

#[test]
fn oversized_arrays_are_rejected() {
	assert_eq!(
		semantic_errors(
			"program P; var a: array[0..9223372036854775807] of integer; begin a[1] := 1 end."
		),
		vec![SemanticError::ArraySize {
			min: 0,
			max: i64::MAX,
			line: 1
		}]
	);
}

#[test]
fn subprograms_cannot_shadow_control_flow_labels() {
	assert_eq!(
		semantic_errors(
			"program P; procedure label1; begin end; begin if true then label1 else label1 end."
		),
		vec![SemanticError::ReservedName {
			name: "label1".into(),
			line: 1
		}]
	);
}

#[test]
fn huge_literals_are_dropped_with_a_warning() {
	let mut compiler = Compiler::default();
	let result = compiler.compile("program P; var x: integer; begin x := 99999999999999999999 end.");
	assert!(matches!(result, Err(CompileError::Syntax(_))));
	assert_eq!(
		compiler.warnings,
		vec![LexicalError::NumberOutOfRange {
			literal: "99999999999999999999".into(),
			line: 1
		}]
	);
}

#[test]
fn not_inside_a_comparison() {
	let listing = lines("program P; var b, c, d: boolean; begin b := c = not d end.");
	assert_eq!(
		listing[4..],
		["\tPUSHG 1", "\tPUSHG 2", "\tNOT", "\tEQUAL", "\tSTOREG 0", "\tSTOP"]
	);
}
