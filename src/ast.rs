//! Syntax tree built by the parser and walked, read-only, by the analyzer and
//! the generator.

pub type Ident = String;

/// Identifies one expression node; the analyzer keys inferred types by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExprId(pub usize);

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
	pub name: Ident,
	/// Both `var` sections around the subprograms, in source order
	pub globals: Vec<VarDecl>,
	pub subprograms: Vec<Subprogram>,
	pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
	pub name: Ident,
	pub ty: TypeSpec,
	pub line: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeSpec {
	Integer,
	Real,
	Boolean,
	Char,
	String,
	Array {
		min: i64,
		max: i64,
		base: Box<TypeSpec>,
	},
}

#[derive(Clone, Debug, PartialEq)]
pub struct Subprogram {
	pub name: Ident,
	/// Flattened from `a, b: integer; c: real` groups, left to right
	pub params: Vec<VarDecl>,
	/// `None` for procedures
	pub return_type: Option<TypeSpec>,
	pub locals: Vec<VarDecl>,
	pub body: Vec<Stmt>,
	pub line: usize,
}

impl Subprogram {
	pub fn is_function(&self) -> bool {
		self.return_type.is_some()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
	To,
	Downto,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
	Empty,
	Block(Vec<Stmt>),
	Assign {
		target: LValue,
		value: Expr,
	},
	/// Procedure call, or a function call whose result is dropped
	Call {
		name: Ident,
		args: Vec<Expr>,
		line: usize,
	},
	If {
		cond: Expr,
		then_branch: Box<Stmt>,
		else_branch: Option<Box<Stmt>>,
	},
	While {
		cond: Expr,
		body: Box<Stmt>,
	},
	For {
		var: Ident,
		start: Expr,
		end: Expr,
		direction: Direction,
		body: Box<Stmt>,
		line: usize,
	},
	Write {
		args: Vec<Expr>,
		newline: bool,
	},
	Read {
		targets: Vec<LValue>,
		newline: bool,
	},
}

#[derive(Clone, Debug, PartialEq)]
pub enum LValue {
	Var {
		id: ExprId,
		name: Ident,
		line: usize,
	},
	Index {
		id: ExprId,
		name: Ident,
		index: Box<Expr>,
		line: usize,
	},
}

impl LValue {
	pub fn id(&self) -> ExprId {
		match self {
			LValue::Var { id, .. } | LValue::Index { id, .. } => *id,
		}
	}
	pub fn name(&self) -> &str {
		match self {
			LValue::Var { name, .. } | LValue::Index { name, .. } => name,
		}
	}
	pub fn line(&self) -> usize {
		match self {
			LValue::Var { line, .. } | LValue::Index { line, .. } => *line,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
	pub id: ExprId,
	pub line: usize,
	pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
	Integer(i64),
	Real(f64),
	Str(String),
	Boolean(bool),
	/// A bare identifier: a variable, or a call to a parameterless function
	Var(Ident),
	Index {
		name: Ident,
		index: Box<Expr>,
	},
	Call {
		name: Ident,
		args: Vec<Expr>,
	},
	Length(Box<Expr>),
	Unary {
		op: UnaryOperation,
		operand: Box<Expr>,
	},
	Binary {
		op: BinaryOperation,
		lhs: Box<Expr>,
		rhs: Box<Expr>,
	},
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOperation {
	Not,
	Neg,
	Plus,
}

impl UnaryOperation {
	pub fn symbol(self) -> &'static str {
		match self {
			UnaryOperation::Not => "not",
			UnaryOperation::Neg => "-",
			UnaryOperation::Plus => "+",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOperation {
	Or,
	And,
	Equal,
	NotEqual,
	Less,
	LessEqual,
	Greater,
	GreaterEqual,
	Add,
	Sub,
	Mul,
	Slash,
	Div,
	Mod,
}

impl BinaryOperation {
	pub fn symbol(self) -> &'static str {
		use BinaryOperation::*;
		match self {
			Or => "or",
			And => "and",
			Equal => "=",
			NotEqual => "<>",
			Less => "<",
			LessEqual => "<=",
			Greater => ">",
			GreaterEqual => ">=",
			Add => "+",
			Sub => "-",
			Mul => "*",
			Slash => "/",
			Div => "div",
			Mod => "mod",
		}
	}
	pub fn is_relational(self) -> bool {
		use BinaryOperation::*;
		matches!(self, Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual)
	}
	pub fn is_logical(self) -> bool {
		matches!(self, BinaryOperation::And | BinaryOperation::Or)
	}
}
