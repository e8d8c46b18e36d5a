use std::{
	fs,
	path::PathBuf,
	process::{Command, Output},
};

fn scratch_dir(name: &str) -> PathBuf {
	let dir = std::env::temp_dir().join(format!("pasvm-{}-{name}", std::process::id()));
	fs::create_dir_all(&dir).expect("failed to create scratch directory");
	dir
}

fn run_compiler(args: &[&std::ffi::OsStr]) -> Output {
	Command::new(env!("CARGO_BIN_EXE_pasvm"))
		.args(args)
		.output()
		.expect("failed to spawn pasvm")
}

#[test]
fn writes_listing_next_to_source() {
	let dir = scratch_dir("success");
	let source = dir.join("hello.pas");
	fs::write(&source, "program Hello; begin writeln('hello') end.").unwrap();

	let out = run_compiler(&[source.as_os_str()]);
	assert!(
		out.status.success(),
		"compiler failed.\nstderr:\n{}",
		String::from_utf8_lossy(&out.stderr)
	);
	let listing = dir.join("hello.vm");
	assert!(String::from_utf8_lossy(&out.stdout).starts_with("Success!"));
	assert_eq!(
		fs::read_to_string(&listing).unwrap(),
		"\tJUMP main\nmain:\n\tSTART\n\tPUSHS \"hello\"\n\tWRITES\n\tWRITELN\n\tSTOP\n"
	);
	fs::remove_dir_all(dir).ok();
}

#[test]
fn explicit_output_path() {
	let dir = scratch_dir("output");
	let source = dir.join("prog.pas");
	let output = dir.join("out.txt");
	fs::write(&source, "program P; begin end.").unwrap();

	let out = run_compiler(&[source.as_os_str(), std::ffi::OsStr::new("-o"), output.as_os_str()]);
	assert!(out.status.success());
	assert!(output.exists());
	assert!(!dir.join("prog.vm").exists());
	fs::remove_dir_all(dir).ok();
}

#[test]
fn semantic_errors_exit_with_one() {
	let dir = scratch_dir("semantic");
	let source = dir.join("bad.pas");
	fs::write(&source, "program P; var x: integer; begin x := 'text' end.").unwrap();

	let out = run_compiler(&[source.as_os_str()]);
	assert_eq!(out.status.code(), Some(1));
	assert!(!dir.join("bad.vm").exists());
	let stderr = String::from_utf8_lossy(&out.stderr);
	assert!(stderr.contains("semantic error: incompatible assignment STRING -> INTEGER (line 1)"));
	fs::remove_dir_all(dir).ok();
}

#[test]
fn syntax_errors_exit_with_one() {
	let dir = scratch_dir("syntax");
	let source = dir.join("bad.pas");
	fs::write(&source, "program P;\nbegin\n  writeln(1\nend.").unwrap();

	let out = run_compiler(&[source.as_os_str()]);
	assert_eq!(out.status.code(), Some(1));
	assert!(!dir.join("bad.vm").exists());
	assert!(String::from_utf8_lossy(&out.stderr).contains("syntax error at token end"));
	fs::remove_dir_all(dir).ok();
}

#[test]
fn missing_source_exits_with_one() {
	let dir = scratch_dir("missing");
	let out = run_compiler(&[dir.join("nope.pas").as_os_str()]);
	assert_eq!(out.status.code(), Some(1));
	fs::remove_dir_all(dir).ok();
}
