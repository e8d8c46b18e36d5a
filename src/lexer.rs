//! Lexical Analyzer
//!
//! `Lexer` is a lazy iterator over the source; call `lexer::tokenize` to
//! collect the whole stream along with any illegal characters that were
//! skipped on the way.
use std::{fmt, iter::Peekable, str::Chars};

use crate::error::LexicalError;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
	Keyword(Reserved),

	Identifier(String),
	Integer(i64),
	Real(f64),
	Str(String),
	Boolean(bool),

	// Brackets
	LeftParenthesis,
	RightParenthesis,
	LeftSquare,
	RightSquare,

	// Punctuation
	Semicolon,
	Comma,
	Colon,
	Dot,
	DotDot,

	// Operators
	Assign,
	Plus,
	Minus,
	Star,
	Slash,
	Equal,
	NotEqual,
	Less,
	LessEqual,
	Greater,
	GreaterEqual,

	Eof,
}

impl Token {
	/// Name of the token class, as reported in syntax errors.
	pub fn kind(&self) -> &'static str {
		match self {
			Token::Keyword(reserved) => reserved.name(),
			Token::Identifier(_) => "ID",
			Token::Integer(_) => "NUMBER",
			Token::Real(_) => "REAL_NUMBER",
			Token::Str(_) => "STRING_LITERAL",
			Token::Boolean(true) => "TRUE",
			Token::Boolean(false) => "FALSE",
			Token::Assign => "ASSIGN",
			Token::Equal => "EQUALS",
			Token::NotEqual => "NOT_EQUALS",
			Token::Less => "LESS_THAN",
			Token::LessEqual => "LESS_THAN_OR_EQUAL_TO",
			Token::Greater => "GREATER_THAN",
			Token::GreaterEqual => "GREATER_THAN_OR_EQUAL_TO",
			Token::DotDot => "RANGE",
			Token::Eof => "EOF",
			Token::LeftParenthesis => "(",
			Token::RightParenthesis => ")",
			Token::LeftSquare => "[",
			Token::RightSquare => "]",
			Token::Semicolon => ";",
			Token::Comma => ",",
			Token::Colon => ":",
			Token::Dot => ".",
			Token::Plus => "+",
			Token::Minus => "-",
			Token::Star => "*",
			Token::Slash => "/",
		}
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Token::Keyword(reserved) => write!(f, "{}", reserved.name().to_lowercase()),
			Token::Identifier(name) => write!(f, "{name}"),
			Token::Integer(value) => write!(f, "{value}"),
			Token::Real(value) => write!(f, "{value:?}"),
			Token::Str(value) => write!(f, "'{}'", value.replace('\'', "''")),
			Token::Boolean(value) => write!(f, "{value}"),
			Token::LeftParenthesis => write!(f, "("),
			Token::RightParenthesis => write!(f, ")"),
			Token::LeftSquare => write!(f, "["),
			Token::RightSquare => write!(f, "]"),
			Token::Semicolon => write!(f, ";"),
			Token::Comma => write!(f, ","),
			Token::Colon => write!(f, ":"),
			Token::Dot => write!(f, "."),
			Token::DotDot => write!(f, ".."),
			Token::Assign => write!(f, ":="),
			Token::Plus => write!(f, "+"),
			Token::Minus => write!(f, "-"),
			Token::Star => write!(f, "*"),
			Token::Slash => write!(f, "/"),
			Token::Equal => write!(f, "="),
			Token::NotEqual => write!(f, "<>"),
			Token::Less => write!(f, "<"),
			Token::LessEqual => write!(f, "<="),
			Token::Greater => write!(f, ">"),
			Token::GreaterEqual => write!(f, ">="),
			Token::Eof => write!(f, "end of input"),
		}
	}
}

/// Tuple struct of `Token` and the corresponding `line_number: usize`
#[derive(Clone, Debug, PartialEq)]
pub struct Symbol(pub Token, pub usize);
impl Symbol {
	pub fn token(&self) -> &Token {
		&self.0
	}
	pub fn line(&self) -> usize {
		self.1
	}
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct LexerOutput {
	pub symbol: Vec<Symbol>,
	pub errors: Vec<LexicalError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reserved {
	Program,
	Procedure,
	Function,
	Var,
	Array,
	Of,
	Begin,
	End,
	Readln,
	Read,
	Writeln,
	Write,
	If,
	Then,
	Else,
	While,
	Downto,
	For,
	To,
	Do,
	Div,
	Mod,
	Not,
	And,
	Or,
	String,
	Char,
	Boolean,
	Real,
	Integer,
	Length,
}

impl Reserved {
	pub fn name(self) -> &'static str {
		use Reserved::*;
		match self {
			Program => "PROGRAM",
			Procedure => "PROCEDURE",
			Function => "FUNCTION",
			Var => "VAR",
			Array => "ARRAY",
			Of => "OF",
			Begin => "BEGIN",
			End => "END",
			Readln => "READLN",
			Read => "READ",
			Writeln => "WRITELN",
			Write => "WRITE",
			If => "IF",
			Then => "THEN",
			Else => "ELSE",
			While => "WHILE",
			Downto => "DOWNTO",
			For => "FOR",
			To => "TO",
			Do => "DO",
			Div => "DIV",
			Mod => "MOD",
			Not => "NOT",
			And => "AND",
			Or => "OR",
			String => "STRING",
			Char => "CHAR",
			Boolean => "BOOLEAN",
			Real => "REAL",
			Integer => "INTEGER",
			Length => "LENGTH",
		}
	}
}

/// Streams tokens out of a source string. Cloning a lexer restarts nothing;
/// it forks the scan from the current position.
#[derive(Clone, Debug)]
pub struct Lexer<'a> {
	stream_iter: Peekable<Chars<'a>>,
	line_number: usize,
	done: bool,
}

impl<'a> Lexer<'a> {
	pub fn new(input_stream: &'a str) -> Self {
		Self {
			stream_iter: input_stream.chars().peekable(),
			line_number: 1,
			done: false,
		}
	}

	/// Looks for `close` ahead of the cursor without consuming anything. On a
	/// hit, returns the scanner positioned after `close` and the text between.
	fn scan_until(&self, close: &str) -> Option<(Peekable<Chars<'a>>, String)> {
		let mut lookahead = self.stream_iter.clone();
		let mut body = String::new();
		loop {
			body.push(lookahead.next()?);
			if body.ends_with(close) {
				body.truncate(body.len() - close.len());
				return Some((lookahead, body));
			}
		}
	}

	/// Skips a `{ ... }` or `(* ... *)` comment whose opener was just consumed.
	fn comment(&mut self, close: &str) -> bool {
		match self.scan_until(close) {
			Some((rest, body)) => {
				self.line_number += body.matches('\n').count();
				self.stream_iter = rest;
				true
			}
			None => false,
		}
	}

	/// Body of a quoted literal whose opening quote was just consumed; `''`
	/// collapses to a single quote.
	fn string(&mut self) -> Option<String> {
		let mut lookahead = self.stream_iter.clone();
		let mut literal_buffer = String::new();
		loop {
			match lookahead.next()? {
				'\'' if lookahead.peek() == Some(&'\'') => {
					lookahead.next();
					literal_buffer.push('\'');
				}
				'\'' => break,
				char => literal_buffer.push(char),
			}
		}
		self.line_number += literal_buffer.matches('\n').count();
		self.stream_iter = lookahead;
		Some(literal_buffer)
	}

	fn number(&mut self, first: char) -> Result<Token, LexicalError> {
		let mut const_buffer = first.to_string();
		while let Some(char) = self.stream_iter.next_if(char::is_ascii_digit) {
			const_buffer.push(char);
		}
		// A real needs digits on both sides of the point, so `1..5` stays a range
		let mut lookahead = self.stream_iter.clone();
		if lookahead.next() == Some('.') && lookahead.peek().is_some_and(char::is_ascii_digit) {
			self.stream_iter.next();
			const_buffer.push('.');
			while let Some(char) = self.stream_iter.next_if(char::is_ascii_digit) {
				const_buffer.push(char);
			}
			return match const_buffer.parse::<f64>() {
				Ok(value) if value.is_finite() => Ok(Token::Real(value)),
				_ => Err(self.out_of_range(const_buffer)),
			};
		}
		const_buffer
			.parse()
			.map(Token::Integer)
			.map_err(|_| self.out_of_range(const_buffer))
	}

	fn out_of_range(&self, literal: String) -> LexicalError {
		LexicalError::NumberOutOfRange {
			literal,
			line: self.line_number,
		}
	}

	fn word(&mut self, first: char) -> Token {
		let mut ident_buffer = first.to_string();
		while let Some(char) = self
			.stream_iter
			.next_if(|&i| i.is_ascii_alphanumeric() || i == '_')
		{
			ident_buffer.push(char);
		}
		keywords(&ident_buffer).unwrap_or(Token::Identifier(ident_buffer))
	}
}

impl Iterator for Lexer<'_> {
	type Item = Result<Symbol, LexicalError>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done {
			return None;
		}
		while let Some(current) = self.stream_iter.next() {
			if current == '\n' {
				self.line_number += 1;
				continue;
			}
			if current.is_whitespace() {
				continue;
			}
			let line_number = self.line_number;
			let illegal = Err(LexicalError::IllegalCharacter {
				ch: current,
				line: line_number,
			});
			let matched_token = match current {
				'{' => {
					if self.comment("}") {
						continue;
					}
					return Some(illegal);
				}
				'(' => {
					if self.stream_iter.peek() == Some(&'*') {
						let mut opened = self.clone();
						opened.stream_iter.next();
						if opened.comment("*)") {
							*self = opened;
							continue;
						}
					}
					Token::LeftParenthesis
				}
				'\'' => match self.string() {
					Some(literal) => Token::Str(literal),
					None => return Some(illegal),
				},
				char if char.is_ascii_digit() => match self.number(char) {
					Ok(token) => token,
					Err(error) => return Some(Err(error)),
				},
				char if char.is_ascii_alphabetic() || char == '_' => self.word(char),
				':' => {
					if self.stream_iter.next_if_eq(&'=').is_some() {
						Token::Assign
					} else {
						Token::Colon
					}
				}
				'<' => {
					if self.stream_iter.next_if_eq(&'=').is_some() {
						Token::LessEqual
					} else if self.stream_iter.next_if_eq(&'>').is_some() {
						Token::NotEqual
					} else {
						Token::Less
					}
				}
				'>' => {
					if self.stream_iter.next_if_eq(&'=').is_some() {
						Token::GreaterEqual
					} else {
						Token::Greater
					}
				}
				'!' => {
					if self.stream_iter.next_if_eq(&'=').is_some() {
						Token::NotEqual
					} else {
						return Some(illegal);
					}
				}
				'.' => {
					if self.stream_iter.next_if_eq(&'.').is_some() {
						Token::DotDot
					} else {
						Token::Dot
					}
				}
				'=' => Token::Equal,
				'+' => Token::Plus,
				'-' => Token::Minus,
				'*' => Token::Star,
				'/' => Token::Slash,
				',' => Token::Comma,
				';' => Token::Semicolon,
				')' => Token::RightParenthesis,
				'[' => Token::LeftSquare,
				']' => Token::RightSquare,
				_ => return Some(illegal),
			};
			return Some(Ok(Symbol(matched_token, line_number)));
		}
		self.done = true;
		Some(Ok(Symbol(Token::Eof, self.line_number)))
	}
}

pub fn tokenize(input_stream: &str) -> LexerOutput {
	let mut output = LexerOutput::default();
	for item in Lexer::new(input_stream) {
		match item {
			Ok(symbol) => output.symbol.push(symbol),
			Err(error) => {
				log::debug!("skipping {error}");
				output.errors.push(error)
			}
		}
	}
	output
}

fn keywords(id: &str) -> Option<Token> {
	use Reserved::*;
	let reserved = match id.to_lowercase().as_str() {
		"true" => return Some(Token::Boolean(true)),
		"false" => return Some(Token::Boolean(false)),
		"program" => Program,
		"procedure" => Procedure,
		"function" => Function,
		"var" => Var,
		"array" => Array,
		"of" => Of,
		"begin" => Begin,
		"end" => End,
		"readln" => Readln,
		"read" => Read,
		"writeln" => Writeln,
		"write" => Write,
		"if" => If,
		"then" => Then,
		"else" => Else,
		"while" => While,
		"downto" => Downto,
		"for" => For,
		"to" => To,
		"do" => Do,
		"div" => Div,
		"mod" => Mod,
		"not" => Not,
		"and" => And,
		"or" => Or,
		"string" => String,
		"char" => Char,
		"boolean" => Boolean,
		"real" => Real,
		"integer" => Integer,
		"length" => Length,
		_ => return None,
	};
	Some(Token::Keyword(reserved))
}
