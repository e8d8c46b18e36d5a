//! Grammar:
/*
	<Program>		-> program Ident ; <VarSection> <Subprogram>* <VarSection> <Compound> .
	<VarSection>	-> var (<IdentList> : <Type> ;)+
					|  ε
	<Subprogram>	-> procedure Ident <Params> ; <VarSection> <Compound> ;
					|  function Ident <Params> : <Type> ; <VarSection> <Compound> ;
	<Params>		-> ( <IdentList> : <Type> (; <IdentList> : <Type>)* )
					|  ( )
					|  ε
	<Type>			-> integer | real | boolean | char | string
					|  array [ Int .. Int ] of <Type>
	<Compound>		-> begin <Stmt> (; <Stmt>)* end
	<Stmt>			-> <LValue> := <Expr>
					|  Ident | Ident ( <ExprList> )
					|  <Compound>
					|  if <Expr> then <Stmt> (else <Stmt>)?
					|  while <Expr> do <Stmt>
					|  for Ident := <Expr> (to | downto) <Expr> do <Stmt>
					|  (read | readln) ( <LValue> (, <LValue>)* ) | readln
					|  (write | writeln) ( <ExprList> ) | writeln
					|  ε
	<Expr>			-> <And> (or <And>)*
	<And>			-> <Not> (and <Not>)*
	<Not>			-> not <Not> | <Relation>
	<Relation>		-> <Simple> (<RelOp> <Simple>)*
	<Simple>		-> <Term> ((+ | -) <Term>)*
	<Term>			-> <Factor> ((* | / | div | mod) <Factor>)*
	<Factor>		-> (- | + | not) <Factor> | <Primary>
	<Primary>		-> Int | Real | String | true | false | ( <Expr> )
					|  length ( <Expr> ) | Ident | Ident [ <Expr> ] | Ident ( <ExprList> )
*/

use crate::{
	ast::*,
	error::SyntaxError,
	lexer::{Reserved, Symbol, Token},
};

/// Builds the tree for a whole program. Statement-level syntax errors are
/// recovered from so that every one of them is reported, but any error at all
/// means no tree.
pub fn parse(mut symbols: Vec<Symbol>) -> Result<Program, Vec<SyntaxError>> {
	if symbols.last().map(Symbol::token) != Some(&Token::Eof) {
		let line = symbols.last().map_or(1, Symbol::line);
		symbols.push(Symbol(Token::Eof, line));
	}
	let mut parser = Parser {
		symbols,
		position: 0,
		next_id: 0,
		errors: Vec::new(),
	};
	match parser.program() {
		Ok(program) if parser.errors.is_empty() => {
			log::debug!(
				"parsed '{}': {} globals, {} subprograms",
				program.name,
				program.globals.len(),
				program.subprograms.len()
			);
			Ok(program)
		}
		Ok(_) => Err(parser.errors),
		Err(error) => {
			parser.errors.push(error);
			Err(parser.errors)
		}
	}
}

type ParseResult<T> = Result<T, SyntaxError>;

struct Parser {
	symbols: Vec<Symbol>,
	position: usize,
	next_id: usize,
	errors: Vec<SyntaxError>,
}

impl Parser {
	#[inline]
	fn peek(&self) -> &Token {
		self.symbols[self.position].token()
	}
	#[inline]
	fn line(&self) -> usize {
		self.symbols[self.position].line()
	}
	/// Consumes the current symbol. `Eof` is never consumed.
	fn advance(&mut self) -> Symbol {
		let symbol = self.symbols[self.position].clone();
		if symbol.0 != Token::Eof {
			self.position += 1;
		}
		symbol
	}
	#[inline]
	fn next_eq(&mut self, needle: &Token) -> bool {
		if self.peek() == needle {
			self.advance();
			true
		} else {
			false
		}
	}
	#[inline]
	fn next_keyword(&mut self, reserved: Reserved) -> bool {
		self.next_eq(&Token::Keyword(reserved))
	}
	fn unexpected(&self) -> SyntaxError {
		match &self.symbols[self.position] {
			Symbol(Token::Eof, _) => SyntaxError::UnexpectedEof,
			Symbol(token, line) => SyntaxError::UnexpectedToken {
				token: token.to_string(),
				kind: token.kind(),
				line: *line,
			},
		}
	}
	fn expect(&mut self, needle: &Token) -> ParseResult<()> {
		if self.next_eq(needle) {
			Ok(())
		} else {
			Err(self.unexpected())
		}
	}
	fn expect_keyword(&mut self, reserved: Reserved) -> ParseResult<()> {
		self.expect(&Token::Keyword(reserved))
	}
	fn identifier(&mut self) -> ParseResult<(Ident, usize)> {
		if !matches!(self.peek(), Token::Identifier(_)) {
			return Err(self.unexpected());
		}
		match self.advance() {
			Symbol(Token::Identifier(name), line) => Ok((name, line)),
			_ => Err(self.unexpected()),
		}
	}
	fn node(&mut self, line: usize, kind: ExprKind) -> Expr {
		self.next_id += 1;
		Expr {
			id: ExprId(self.next_id - 1),
			line,
			kind,
		}
	}
	fn fresh_id(&mut self) -> ExprId {
		self.next_id += 1;
		ExprId(self.next_id - 1)
	}

	/// Skips to the next statement boundary: a `;` or `end`, left unconsumed.
	fn synchronize(&mut self) {
		while !matches!(
			self.peek(),
			Token::Semicolon | Token::Keyword(Reserved::End) | Token::Eof
		) {
			self.advance();
		}
	}
	/// Skips past the `;` ending a declaration, stopping early at anything that
	/// starts the next section.
	fn synchronize_declaration(&mut self) {
		use Reserved::*;
		loop {
			match self.peek() {
				Token::Semicolon => {
					self.advance();
					return;
				}
				Token::Eof
				| Token::Keyword(Begin)
				| Token::Keyword(Procedure)
				| Token::Keyword(Function)
				| Token::Keyword(Var) => return,
				_ => {
					self.advance();
				}
			}
		}
	}

	fn program(&mut self) -> ParseResult<Program> {
		self.expect_keyword(Reserved::Program)?;
		let (name, _) = self.identifier()?;
		self.expect(&Token::Semicolon)?;
		let mut globals = self.var_section()?;
		let mut subprograms = Vec::new();
		while matches!(
			self.peek(),
			Token::Keyword(Reserved::Procedure | Reserved::Function)
		) {
			subprograms.push(self.subprogram()?);
		}
		globals.append(&mut self.var_section()?);
		let body = self.compound()?;
		self.expect(&Token::Dot)?;
		self.expect(&Token::Eof)?;
		Ok(Program {
			name,
			globals,
			subprograms,
			body,
		})
	}

	fn var_section(&mut self) -> ParseResult<Vec<VarDecl>> {
		let mut decls = Vec::new();
		if !self.next_keyword(Reserved::Var) {
			return Ok(decls);
		}
		loop {
			match self.declaration() {
				Ok(mut group) => decls.append(&mut group),
				Err(SyntaxError::UnexpectedEof) => return Err(SyntaxError::UnexpectedEof),
				Err(error) => {
					self.errors.push(error);
					self.synchronize_declaration();
				}
			}
			if !matches!(self.peek(), Token::Identifier(_)) {
				return Ok(decls);
			}
		}
	}

	fn declaration(&mut self) -> ParseResult<Vec<VarDecl>> {
		let names = self.identifier_list()?;
		self.expect(&Token::Colon)?;
		let ty = self.type_spec()?;
		self.expect(&Token::Semicolon)?;
		Ok(names
			.into_iter()
			.map(|(name, line)| VarDecl {
				name,
				ty: ty.clone(),
				line,
			})
			.collect())
	}

	fn identifier_list(&mut self) -> ParseResult<Vec<(Ident, usize)>> {
		let mut names = vec![self.identifier()?];
		while self.next_eq(&Token::Comma) {
			names.push(self.identifier()?);
		}
		Ok(names)
	}

	fn type_spec(&mut self) -> ParseResult<TypeSpec> {
		use Reserved::*;
		let ty = match self.peek() {
			Token::Keyword(Integer) => TypeSpec::Integer,
			Token::Keyword(Real) => TypeSpec::Real,
			Token::Keyword(Boolean) => TypeSpec::Boolean,
			Token::Keyword(Char) => TypeSpec::Char,
			Token::Keyword(String) => TypeSpec::String,
			Token::Keyword(Array) => {
				self.advance();
				self.expect(&Token::LeftSquare)?;
				let min = self.bound()?;
				self.expect(&Token::DotDot)?;
				let max = self.bound()?;
				self.expect(&Token::RightSquare)?;
				self.expect_keyword(Of)?;
				let base = Box::new(self.type_spec()?);
				return Ok(TypeSpec::Array { min, max, base });
			}
			_ => return Err(self.unexpected()),
		};
		self.advance();
		Ok(ty)
	}

	fn bound(&mut self) -> ParseResult<i64> {
		let negative = self.next_eq(&Token::Minus);
		match self.peek() {
			Token::Integer(value) => {
				let value = *value;
				self.advance();
				Ok(if negative { -value } else { value })
			}
			_ => Err(self.unexpected()),
		}
	}

	fn subprogram(&mut self) -> ParseResult<Subprogram> {
		let line = self.line();
		let is_function = self.next_keyword(Reserved::Function);
		if !is_function {
			self.expect_keyword(Reserved::Procedure)?;
		}
		let (name, _) = self.identifier()?;
		let mut params = Vec::new();
		if self.next_eq(&Token::LeftParenthesis) && !self.next_eq(&Token::RightParenthesis) {
			loop {
				let names = self.identifier_list()?;
				self.expect(&Token::Colon)?;
				let ty = self.type_spec()?;
				params.extend(names.into_iter().map(|(name, line)| VarDecl {
					name,
					ty: ty.clone(),
					line,
				}));
				if !self.next_eq(&Token::Semicolon) {
					break;
				}
			}
			self.expect(&Token::RightParenthesis)?;
		}
		let return_type = if is_function {
			self.expect(&Token::Colon)?;
			Some(self.type_spec()?)
		} else {
			None
		};
		self.expect(&Token::Semicolon)?;
		let locals = self.var_section()?;
		let body = self.compound()?;
		self.expect(&Token::Semicolon)?;
		Ok(Subprogram {
			name,
			params,
			return_type,
			locals,
			body,
			line,
		})
	}

	fn compound(&mut self) -> ParseResult<Vec<Stmt>> {
		self.expect_keyword(Reserved::Begin)?;
		let body = self.statement_list()?;
		self.expect_keyword(Reserved::End)?;
		Ok(body)
	}

	/// Statements up to, not including, the closing `end`.
	fn statement_list(&mut self) -> ParseResult<Vec<Stmt>> {
		let mut stmts = Vec::new();
		loop {
			match self.statement() {
				Ok(Stmt::Empty) => {}
				Ok(stmt) => stmts.push(stmt),
				Err(SyntaxError::UnexpectedEof) => return Err(SyntaxError::UnexpectedEof),
				Err(error) => {
					self.errors.push(error);
					self.synchronize();
				}
			}
			while !self.next_eq(&Token::Semicolon) {
				match self.peek() {
					Token::Keyword(Reserved::End) => return Ok(stmts),
					Token::Eof => return Err(SyntaxError::UnexpectedEof),
					_ => {
						let error = self.unexpected();
						self.errors.push(error);
						self.advance();
						self.synchronize();
					}
				}
			}
		}
	}

	fn statement(&mut self) -> ParseResult<Stmt> {
		use Reserved::*;
		match self.peek() {
			Token::Identifier(_) => self.identifier_statement(),
			Token::Keyword(Begin) => Ok(Stmt::Block(self.compound()?)),
			Token::Keyword(If) => {
				self.advance();
				let cond = self.expression()?;
				self.expect_keyword(Then)?;
				let then_branch = Box::new(self.statement()?);
				let else_branch = if self.next_keyword(Else) {
					Some(Box::new(self.statement()?))
				} else {
					None
				};
				Ok(Stmt::If {
					cond,
					then_branch,
					else_branch,
				})
			}
			Token::Keyword(While) => {
				self.advance();
				let cond = self.expression()?;
				self.expect_keyword(Do)?;
				let body = Box::new(self.statement()?);
				Ok(Stmt::While { cond, body })
			}
			Token::Keyword(For) => {
				self.advance();
				let (var, line) = self.identifier()?;
				self.expect(&Token::Assign)?;
				let start = self.expression()?;
				let direction = if self.next_keyword(To) {
					Direction::To
				} else if self.next_keyword(Downto) {
					Direction::Downto
				} else {
					return Err(self.unexpected());
				};
				let end = self.expression()?;
				self.expect_keyword(Do)?;
				let body = Box::new(self.statement()?);
				Ok(Stmt::For {
					var,
					start,
					end,
					direction,
					body,
					line,
				})
			}
			Token::Keyword(Read | Readln) => {
				let newline = self.advance().0 == Token::Keyword(Readln);
				let mut targets = Vec::new();
				if !newline || self.peek() == &Token::LeftParenthesis {
					self.expect(&Token::LeftParenthesis)?;
					targets.push(self.lvalue()?);
					while self.next_eq(&Token::Comma) {
						targets.push(self.lvalue()?);
					}
					self.expect(&Token::RightParenthesis)?;
				}
				Ok(Stmt::Read { targets, newline })
			}
			Token::Keyword(Write | Writeln) => {
				let newline = self.advance().0 == Token::Keyword(Writeln);
				let mut args = Vec::new();
				if !newline || self.peek() == &Token::LeftParenthesis {
					args = self.arguments()?;
				}
				Ok(Stmt::Write { args, newline })
			}
			Token::Semicolon | Token::Keyword(End | Else) => Ok(Stmt::Empty),
			_ => Err(self.unexpected()),
		}
	}

	fn identifier_statement(&mut self) -> ParseResult<Stmt> {
		let (name, line) = self.identifier()?;
		match self.peek() {
			Token::LeftSquare | Token::Assign => {
				let target = self.selector(name, line)?;
				self.expect(&Token::Assign)?;
				let value = self.expression()?;
				Ok(Stmt::Assign { target, value })
			}
			Token::LeftParenthesis => Ok(Stmt::Call {
				name,
				args: self.arguments()?,
				line,
			}),
			_ => Ok(Stmt::Call {
				name,
				args: Vec::new(),
				line,
			}),
		}
	}

	fn lvalue(&mut self) -> ParseResult<LValue> {
		let (name, line) = self.identifier()?;
		self.selector(name, line)
	}

	fn selector(&mut self, name: Ident, line: usize) -> ParseResult<LValue> {
		let id = self.fresh_id();
		if self.next_eq(&Token::LeftSquare) {
			let index = Box::new(self.expression()?);
			self.expect(&Token::RightSquare)?;
			Ok(LValue::Index {
				id,
				name,
				index,
				line,
			})
		} else {
			Ok(LValue::Var { id, name, line })
		}
	}

	/// `( <ExprList> )`, where the list may be empty
	fn arguments(&mut self) -> ParseResult<Vec<Expr>> {
		self.expect(&Token::LeftParenthesis)?;
		let mut args = Vec::new();
		if self.next_eq(&Token::RightParenthesis) {
			return Ok(args);
		}
		args.push(self.expression()?);
		while self.next_eq(&Token::Comma) {
			args.push(self.expression()?);
		}
		self.expect(&Token::RightParenthesis)?;
		Ok(args)
	}

	fn binary(&mut self, op: BinaryOperation, lhs: Expr, rhs: Expr) -> Expr {
		let line = lhs.line;
		self.node(
			line,
			ExprKind::Binary {
				op,
				lhs: Box::new(lhs),
				rhs: Box::new(rhs),
			},
		)
	}

	fn expression(&mut self) -> ParseResult<Expr> {
		let mut lhs = self.and_expression()?;
		while self.next_keyword(Reserved::Or) {
			let rhs = self.and_expression()?;
			lhs = self.binary(BinaryOperation::Or, lhs, rhs);
		}
		Ok(lhs)
	}

	fn and_expression(&mut self) -> ParseResult<Expr> {
		let mut lhs = self.not_expression()?;
		while self.next_keyword(Reserved::And) {
			let rhs = self.not_expression()?;
			lhs = self.binary(BinaryOperation::And, lhs, rhs);
		}
		Ok(lhs)
	}

	fn not_expression(&mut self) -> ParseResult<Expr> {
		let line = self.line();
		if self.next_keyword(Reserved::Not) {
			let operand = Box::new(self.not_expression()?);
			return Ok(self.node(
				line,
				ExprKind::Unary {
					op: UnaryOperation::Not,
					operand,
				},
			));
		}
		self.relation()
	}

	fn relation(&mut self) -> ParseResult<Expr> {
		let mut lhs = self.simple_expression()?;
		loop {
			let op = match self.peek() {
				Token::Equal => BinaryOperation::Equal,
				Token::NotEqual => BinaryOperation::NotEqual,
				Token::Less => BinaryOperation::Less,
				Token::LessEqual => BinaryOperation::LessEqual,
				Token::Greater => BinaryOperation::Greater,
				Token::GreaterEqual => BinaryOperation::GreaterEqual,
				_ => return Ok(lhs),
			};
			self.advance();
			let rhs = self.simple_expression()?;
			lhs = self.binary(op, lhs, rhs);
		}
	}

	fn simple_expression(&mut self) -> ParseResult<Expr> {
		let mut lhs = self.term()?;
		loop {
			let op = match self.peek() {
				Token::Plus => BinaryOperation::Add,
				Token::Minus => BinaryOperation::Sub,
				_ => return Ok(lhs),
			};
			self.advance();
			let rhs = self.term()?;
			lhs = self.binary(op, lhs, rhs);
		}
	}

	fn term(&mut self) -> ParseResult<Expr> {
		let mut lhs = self.factor()?;
		loop {
			let op = match self.peek() {
				Token::Star => BinaryOperation::Mul,
				Token::Slash => BinaryOperation::Slash,
				Token::Keyword(Reserved::Div) => BinaryOperation::Div,
				Token::Keyword(Reserved::Mod) => BinaryOperation::Mod,
				_ => return Ok(lhs),
			};
			self.advance();
			let rhs = self.factor()?;
			lhs = self.binary(op, lhs, rhs);
		}
	}

	fn factor(&mut self) -> ParseResult<Expr> {
		let line = self.line();
		let op = match self.peek() {
			Token::Minus => UnaryOperation::Neg,
			Token::Plus => UnaryOperation::Plus,
			// `c = not d`; a leading `not` is taken by `not_expression` first
			Token::Keyword(Reserved::Not) => UnaryOperation::Not,
			_ => return self.primary(),
		};
		self.advance();
		let operand = Box::new(self.factor()?);
		Ok(self.node(line, ExprKind::Unary { op, operand }))
	}

	fn primary(&mut self) -> ParseResult<Expr> {
		let line = self.line();
		let kind = match self.peek() {
			Token::Integer(value) => ExprKind::Integer(*value),
			Token::Real(value) => ExprKind::Real(*value),
			Token::Boolean(value) => ExprKind::Boolean(*value),
			Token::Str(_) => match self.advance() {
				Symbol(Token::Str(value), _) => return Ok(self.node(line, ExprKind::Str(value))),
				_ => unreachable!(),
			},
			Token::LeftParenthesis => {
				self.advance();
				let inner = self.expression()?;
				self.expect(&Token::RightParenthesis)?;
				return Ok(inner);
			}
			Token::Keyword(Reserved::Length) => {
				self.advance();
				self.expect(&Token::LeftParenthesis)?;
				let arg = Box::new(self.expression()?);
				self.expect(&Token::RightParenthesis)?;
				return Ok(self.node(line, ExprKind::Length(arg)));
			}
			Token::Identifier(_) => {
				let (name, line) = self.identifier()?;
				let kind = match self.peek() {
					Token::LeftSquare => {
						self.advance();
						let index = Box::new(self.expression()?);
						self.expect(&Token::RightSquare)?;
						ExprKind::Index { name, index }
					}
					Token::LeftParenthesis => ExprKind::Call {
						name,
						args: self.arguments()?,
					},
					_ => ExprKind::Var(name),
				};
				return Ok(self.node(line, kind));
			}
			_ => return Err(self.unexpected()),
		};
		self.advance();
		Ok(self.node(line, kind))
	}
}

#[cfg(test)]
mod test {
	#[allow(unused_imports)]
	use super::*;
	#[allow(unused_imports)]
	use crate::lexer::tokenize;

	fn parse_source(source: &str) -> Result<Program, Vec<SyntaxError>> {
		parse(tokenize(source).symbol)
	}

	/// Renders an expression fully parenthesized.
	fn shape(expr: &Expr) -> String {
		match &expr.kind {
			ExprKind::Integer(value) => value.to_string(),
			ExprKind::Real(value) => format!("{value:?}"),
			ExprKind::Str(value) => format!("'{value}'"),
			ExprKind::Boolean(value) => value.to_string(),
			ExprKind::Var(name) => name.clone(),
			ExprKind::Index { name, index } => format!("{name}[{}]", shape(index)),
			ExprKind::Call { name, args } => format!(
				"{name}({})",
				args.iter().map(shape).collect::<Vec<_>>().join(", ")
			),
			ExprKind::Length(arg) => format!("length({})", shape(arg)),
			ExprKind::Unary { op, operand } => format!("({} {})", op.symbol(), shape(operand)),
			ExprKind::Binary { op, lhs, rhs } => {
				format!("({} {} {})", shape(lhs), op.symbol(), shape(rhs))
			}
		}
	}

	fn expression(source: &str) -> String {
		let program = parse_source(&format!("program P; begin x := {source} end.")).unwrap();
		match &program.body[0] {
			Stmt::Assign { value, .. } => shape(value),
			other => panic!("unexpected statement {other:?}"),
		}
	}

	#[test]
	fn precedence() {
		assert_eq!(expression("1 + 2 * 3"), "(1 + (2 * 3))");
		assert_eq!(expression("1 - 2 - 3"), "((1 - 2) - 3)");
		assert_eq!(expression("a or b and c"), "(a or (b and c))");
		assert_eq!(expression("not a = b"), "(not (a = b))");
		assert_eq!(expression("c = not d"), "(c = (not d))");
		assert_eq!(expression("a and not b or c"), "((a and (not b)) or c)");
		assert_eq!(expression("-a * b"), "((- a) * b)");
		assert_eq!(expression("a div 2 mod 3 / 4"), "(((a div 2) mod 3) / 4)");
		assert_eq!(expression("x < y + 1"), "(x < (y + 1))");
		assert_eq!(expression("(1 + 2) * 3"), "((1 + 2) * 3)");
		assert_eq!(expression("s[i] = '1'"), "(s[i] = '1')");
		assert_eq!(expression("f(1, g) + length(s)"), "(f(1, g) + length(s))");
	}

	#[test]
	fn program_layout() {
		let program = parse_source(
			r"
			program Demo;
			var a, b: integer;
			function Sum(x, y: integer; z: real): real;
			var t: integer;
			begin
				Sum := x + y + z
			end;
			procedure Show;
			begin
				writeln(a)
			end;
			var v: array[1..5] of real;
			begin
				a := 1;
				Show;
			end.
			",
		)
		.unwrap();
		assert_eq!(program.name, "Demo");
		let globals: Vec<_> = program.globals.iter().map(|v| v.name.as_str()).collect();
		assert_eq!(globals, vec!["a", "b", "v"]);
		assert_eq!(
			program.globals[2].ty,
			TypeSpec::Array {
				min: 1,
				max: 5,
				base: Box::new(TypeSpec::Real)
			}
		);
		let sum = &program.subprograms[0];
		let params: Vec<_> = sum
			.params
			.iter()
			.map(|p| (p.name.as_str(), p.ty.clone()))
			.collect();
		assert_eq!(
			params,
			vec![
				("x", TypeSpec::Integer),
				("y", TypeSpec::Integer),
				("z", TypeSpec::Real)
			]
		);
		assert_eq!(sum.return_type, Some(TypeSpec::Real));
		assert_eq!(sum.locals.len(), 1);
		assert!(!program.subprograms[1].is_function());
		assert_eq!(program.body.len(), 2);
		assert!(matches!(&program.body[1], Stmt::Call { name, args, .. } if name == "Show" && args.is_empty()));
	}

	#[test]
	fn statements() {
		let program = parse_source(
			r"
			program P;
			begin
				if a then writeln(1) else writeln(2);
				while i < 3 do i := i + 1;
				for i := 10 downto 1 do ;
				readln(a, v[2]);
				readln;
				write('x', 1.5);
				begin end
			end.
			",
		)
		.unwrap();
		assert_eq!(program.body.len(), 7);
		assert!(matches!(&program.body[0], Stmt::If { else_branch: Some(_), .. }));
		assert!(matches!(&program.body[2], Stmt::For { direction: Direction::Downto, body, .. } if **body == Stmt::Empty));
		match &program.body[3] {
			Stmt::Read { targets, newline } => {
				assert!(*newline);
				assert!(matches!(targets[1], LValue::Index { .. }));
			}
			other => panic!("unexpected statement {other:?}"),
		}
		assert_eq!(
			program.body[4],
			Stmt::Read {
				targets: vec![],
				newline: true
			}
		);
		assert!(matches!(&program.body[5], Stmt::Write { args, newline: false } if args.len() == 2));
		assert_eq!(program.body[6], Stmt::Block(vec![]));
	}

	#[test]
	fn expression_ids_are_unique() {
		let program = parse_source("program P; begin x := a + b * c; y[1] := f(2) end.").unwrap();
		let mut ids = Vec::new();
		fn collect(expr: &Expr, ids: &mut Vec<ExprId>) {
			ids.push(expr.id);
			match &expr.kind {
				ExprKind::Binary { lhs, rhs, .. } => {
					collect(lhs, ids);
					collect(rhs, ids);
				}
				ExprKind::Index { index, .. } => collect(index, ids),
				ExprKind::Call { args, .. } => args.iter().for_each(|a| collect(a, ids)),
				_ => {}
			}
		}
		for stmt in &program.body {
			if let Stmt::Assign { target, value } = stmt {
				ids.push(target.id());
				if let LValue::Index { index, .. } = target {
					collect(index, &mut ids);
				}
				collect(value, &mut ids);
			}
		}
		let count = ids.len();
		ids.sort_by_key(|id| id.0);
		ids.dedup();
		assert_eq!(ids.len(), count);
	}

	#[test]
	fn syntax_errors_recover_at_statement_boundaries() {
		let errors = parse_source(
			r"program P;
begin
	x := ;
	y := 1;
	z := 2 3;
end.",
		)
		.unwrap_err();
		assert_eq!(
			errors,
			vec![
				SyntaxError::UnexpectedToken {
					token: ";".into(),
					kind: ";",
					line: 3
				},
				SyntaxError::UnexpectedToken {
					token: "3".into(),
					kind: "NUMBER",
					line: 5
				},
			]
		);
		assert_eq!(
			errors[1].to_string(),
			"syntax error at token 3 (kind NUMBER) at line 5"
		);
	}

	#[test]
	fn unexpected_end_of_input() {
		assert_eq!(
			parse_source("program P; begin x := 1").unwrap_err(),
			vec![SyntaxError::UnexpectedEof]
		);
		assert_eq!(
			parse_source("program P; begin end").unwrap_err(),
			vec![SyntaxError::UnexpectedEof]
		);
	}

	#[test]
	fn declaration_errors_recover() {
		let errors = parse_source(
			r"program P;
var a: integr;
	b: integer;
begin
	b := 1
end.",
		)
		.unwrap_err();
		assert_eq!(
			errors,
			vec![SyntaxError::UnexpectedToken {
				token: "integr".into(),
				kind: "ID",
				line: 2
			}]
		);
	}
}
