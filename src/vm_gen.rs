//! Stack machine backend
//!
//! Walks a `Program` that passed semantic analysis and emits EWVM
//! instructions. Expression types come from the `Analysis` the analyzer
//! produced; nothing here re-derives them.
use std::{collections::HashMap, fmt};

use crate::{
	analyzer::{Analysis, ENTRY_LABEL, LABEL_PREFIX},
	ast::*,
	error::GenerationError,
	types::Type,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
	PushI,
	PushF,
	PushS,
	PushG,
	PushL,
	PushGp,
	PushFp,
	PushN,
	PushA,
	StoreG,
	StoreL,
	StoreN,
	Pop,
	Add,
	Sub,
	Mul,
	Div,
	Mod,
	FAdd,
	FSub,
	FMul,
	FDiv,
	ItoF,
	And,
	Or,
	Not,
	Equal,
	Inf,
	Sup,
	InfEq,
	SupEq,
	FInf,
	FSup,
	FInfEq,
	FSupEq,
	Concat,
	Jump,
	Jz,
	Call,
	Return,
	Start,
	Stop,
	PAdd,
	LoadN,
	CharAt,
	StrLen,
	ChrCode,
	Read,
	AtoI,
	AtoF,
	WriteI,
	WriteF,
	WriteS,
	WriteChr,
	WriteLn,
}

impl Opcode {
	pub fn mnemonic(self) -> &'static str {
		use Opcode::*;
		match self {
			PushI => "PUSHI",
			PushF => "PUSHF",
			PushS => "PUSHS",
			PushG => "PUSHG",
			PushL => "PUSHL",
			PushGp => "PUSHGP",
			PushFp => "PUSHFP",
			PushN => "PUSHN",
			PushA => "PUSHA",
			StoreG => "STOREG",
			StoreL => "STOREL",
			StoreN => "STOREN",
			Pop => "POP",
			Add => "ADD",
			Sub => "SUB",
			Mul => "MUL",
			Div => "DIV",
			Mod => "MOD",
			FAdd => "FADD",
			FSub => "FSUB",
			FMul => "FMUL",
			FDiv => "FDIV",
			ItoF => "ITOF",
			And => "AND",
			Or => "OR",
			Not => "NOT",
			Equal => "EQUAL",
			Inf => "INF",
			Sup => "SUP",
			InfEq => "INFEQ",
			SupEq => "SUPEQ",
			FInf => "FINF",
			FSup => "FSUP",
			FInfEq => "FINFEQ",
			FSupEq => "FSUPEQ",
			Concat => "CONCAT",
			Jump => "JUMP",
			Jz => "JZ",
			Call => "CALL",
			Return => "RETURN",
			Start => "START",
			Stop => "STOP",
			PAdd => "PADD",
			LoadN => "LOADN",
			CharAt => "CHARAT",
			StrLen => "STRLEN",
			ChrCode => "CHRCODE",
			Read => "READ",
			AtoI => "ATOI",
			AtoF => "ATOF",
			WriteI => "WRITEI",
			WriteF => "WRITEF",
			WriteS => "WRITES",
			WriteChr => "WRITECHR",
			WriteLn => "WRITELN",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
	Int(i64),
	Real(f64),
	Str(String),
	Label(String),
}

impl fmt::Display for Operand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Operand::Int(value) => write!(f, "{value}"),
			Operand::Real(value) => {
				let text = value.to_string();
				if text.contains(['.', 'i', 'N']) {
					write!(f, "{text}")
				} else {
					write!(f, "{text}.0")
				}
			}
			Operand::Str(value) => {
				write!(f, "\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
			}
			Operand::Label(name) => write!(f, "{name}"),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
	Label(String),
	Op(Opcode, Option<Operand>),
}

impl fmt::Display for Instruction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Instruction::Label(name) => write!(f, "{name}:"),
			Instruction::Op(opcode, None) => write!(f, "\t{}", opcode.mnemonic()),
			Instruction::Op(opcode, Some(operand)) => {
				write!(f, "\t{} {operand}", opcode.mnemonic())
			}
		}
	}
}

/// One instruction per line, ready to be written out.
pub fn render(code: &[Instruction]) -> String {
	code.iter().map(|instruction| format!("{instruction}\n")).collect()
}

/// Assumes the program is semantically sound, should only be ran after
/// `analyzer::analyze` returns an `Analysis` without errors
pub fn generate(program: &Program, analysis: &Analysis) -> Result<Vec<Instruction>, GenerationError> {
	let mut generator = VmGen::new(analysis);
	generator.program(program)?;
	log::debug!(
		"generated {} instructions, {} labels, {} global slots",
		generator.code.len(),
		generator.label_count,
		generator.global_size
	);
	Ok(generator.code)
}

/// Where a name's value lives at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Storage {
	Global(i64),
	/// Signed offset from the frame pointer
	Frame(i64),
}

#[derive(Debug, Clone)]
struct Slot {
	storage: Storage,
	ty: Type,
}

/// Grows a storage area of `used` slots by one value of `ty`, keeping every
/// address representable as an operand.
fn extend(used: usize, ty: &Type, line: usize) -> Result<usize, GenerationError> {
	ty.size()
		.and_then(|size| used.checked_add(size))
		.filter(|&total| i64::try_from(total).is_ok())
		.ok_or(GenerationError::StorageOverflow { line })
}

#[derive(Debug, Clone)]
struct Routine {
	params: Vec<Type>,
	returns: bool,
}

/// Storage of the subprogram currently being emitted. Parameters sit below
/// the frame pointer, first parameter lowest; the function result sits just
/// under the first parameter.
#[derive(Debug, Default)]
struct FrameAllocator {
	name: Ident,
	result: Option<Type>,
	slots: HashMap<Ident, Slot>,
	param_count: usize,
	locals_size: usize,
}

impl FrameAllocator {
	fn new(subprogram: &Subprogram) -> Result<Self, GenerationError> {
		let mut frame = FrameAllocator {
			name: subprogram.name.clone(),
			result: subprogram.return_type.as_ref().map(Type::from),
			param_count: subprogram.params.len(),
			..Default::default()
		};
		let count = subprogram.params.len() as i64;
		for (i, param) in subprogram.params.iter().enumerate() {
			frame.bind(&param.name, Storage::Frame(i as i64 - count), Type::from(&param.ty));
		}
		for decl in &subprogram.locals {
			let ty = Type::from(&decl.ty);
			let end = extend(frame.locals_size, &ty, decl.line)?;
			if frame.bind(&decl.name, Storage::Frame(frame.locals_size as i64), ty) {
				frame.locals_size = end;
			}
		}
		Ok(frame)
	}
	/// First binding of a name wins, as in the analyzer.
	fn bind(&mut self, name: &str, storage: Storage, ty: Type) -> bool {
		if self.slots.contains_key(name) {
			return false;
		}
		self.slots.insert(name.to_string(), Slot { storage, ty });
		true
	}
	fn resolve(&self, name: &str) -> Option<Slot> {
		match &self.result {
			Some(ty) if self.name == name => Some(Slot {
				storage: Storage::Frame(-(self.param_count as i64) - 1),
				ty: ty.clone(),
			}),
			_ => self.slots.get(name).cloned(),
		}
	}
}

#[derive(Debug)]
struct VmGen<'a> {
	analysis: &'a Analysis,
	code: Vec<Instruction>,
	label_count: usize,
	globals: HashMap<Ident, Slot>,
	global_size: usize,
	/// Global slot holding a value read for an element store
	scratch: Option<i64>,
	routines: HashMap<Ident, Routine>,
	frame: Option<FrameAllocator>,
}

impl<'a> VmGen<'a> {
	fn new(analysis: &'a Analysis) -> Self {
		Self {
			analysis,
			code: Vec::new(),
			label_count: 0,
			globals: HashMap::new(),
			global_size: 0,
			scratch: None,
			routines: HashMap::new(),
			frame: None,
		}
	}

	fn emit(&mut self, opcode: Opcode) {
		self.code.push(Instruction::Op(opcode, None));
	}
	fn emit_with(&mut self, opcode: Opcode, operand: Operand) {
		self.code.push(Instruction::Op(opcode, Some(operand)));
	}
	fn emit_int(&mut self, opcode: Opcode, value: i64) {
		self.emit_with(opcode, Operand::Int(value));
	}
	fn emit_label(&mut self, name: &str) {
		self.code.push(Instruction::Label(name.to_string()));
	}
	fn new_label(&mut self) -> String {
		self.label_count += 1;
		let label = format!("{LABEL_PREFIX}{}", self.label_count);
		log::trace!("allocated {label}");
		label
	}

	fn program(&mut self, program: &Program) -> Result<(), GenerationError> {
		self.emit_with(Opcode::Jump, Operand::Label(ENTRY_LABEL.to_string()));
		for decl in &program.globals {
			if self.globals.contains_key(&decl.name) {
				continue;
			}
			let ty = Type::from(&decl.ty);
			let end = extend(self.global_size, &ty, decl.line)?;
			let storage = Storage::Global(self.global_size as i64);
			self.globals.insert(decl.name.clone(), Slot { storage, ty });
			self.global_size = end;
		}
		for subprogram in &program.subprograms {
			self.routines
				.entry(subprogram.name.clone())
				.or_insert_with(|| Routine {
					params: subprogram.params.iter().map(|p| Type::from(&p.ty)).collect(),
					returns: subprogram.is_function(),
				});
		}
		for subprogram in &program.subprograms {
			self.subprogram(subprogram)?;
		}
		self.emit_label(ENTRY_LABEL);
		self.emit(Opcode::Start);
		// Reserved once the scratch slot is known
		let reserve_at = self.code.len();
		for stmt in &program.body {
			self.statement(stmt)?;
		}
		if self.global_size > 0 {
			self.code.insert(
				reserve_at,
				Instruction::Op(Opcode::PushN, Some(Operand::Int(self.global_size as i64))),
			);
		}
		self.emit(Opcode::Stop);
		Ok(())
	}

	fn subprogram(&mut self, subprogram: &Subprogram) -> Result<(), GenerationError> {
		let frame = FrameAllocator::new(subprogram)?;
		if log::log_enabled!(log::Level::Trace) {
			let mut layout: Vec<_> = frame.slots.iter().collect();
			layout.sort_by_key(|(_, slot)| match slot.storage {
				Storage::Frame(offset) | Storage::Global(offset) => offset,
			});
			log::trace!("frame of '{}': {layout:?}", subprogram.name);
		}
		let locals_size = frame.locals_size;
		let caller = self.frame.replace(frame);
		self.emit_label(&subprogram.name);
		if locals_size > 0 {
			self.emit_int(Opcode::PushN, locals_size as i64);
		}
		let result = subprogram
			.body
			.iter()
			.try_for_each(|stmt| self.statement(stmt));
		self.frame = caller;
		result?;
		self.emit(Opcode::Return);
		Ok(())
	}

	/// Frame first, then globals.
	fn resolve(&self, name: &str) -> Option<Slot> {
		self.frame
			.as_ref()
			.and_then(|frame| frame.resolve(name))
			.or_else(|| self.globals.get(name).cloned())
	}
	fn slot(&self, name: &str, line: usize) -> Result<Slot, GenerationError> {
		self.resolve(name).ok_or_else(|| GenerationError::UnresolvedSymbol {
			name: name.to_string(),
			line,
		})
	}
	fn type_of(&self, id: ExprId, line: usize) -> Result<Type, GenerationError> {
		self.analysis
			.type_of(id)
			.cloned()
			.ok_or(GenerationError::MissingType { line })
	}
	fn scratch(&mut self, line: usize) -> Result<i64, GenerationError> {
		if let Some(address) = self.scratch {
			return Ok(address);
		}
		let address = self.global_size as i64;
		self.global_size = extend(self.global_size, &Type::Integer, line)?;
		self.scratch = Some(address);
		Ok(address)
	}

	fn load(&mut self, storage: Storage) {
		match storage {
			Storage::Global(address) => self.emit_int(Opcode::PushG, address),
			Storage::Frame(offset) => self.emit_int(Opcode::PushL, offset),
		}
	}
	fn store(&mut self, storage: Storage) {
		match storage {
			Storage::Global(address) => self.emit_int(Opcode::StoreG, address),
			Storage::Frame(offset) => self.emit_int(Opcode::StoreL, offset),
		}
	}
	/// Pushes the address of element `index` of an array, ready for
	/// `LOADN`/`STOREN`.
	fn element_address(&mut self, storage: Storage, min: i64, index: &Expr) -> Result<(), GenerationError> {
		match storage {
			Storage::Global(address) => {
				self.emit(Opcode::PushGp);
				self.emit_int(Opcode::PushI, address);
			}
			Storage::Frame(offset) => {
				self.emit(Opcode::PushFp);
				self.emit_int(Opcode::PushI, offset);
			}
		}
		self.emit(Opcode::PAdd);
		self.expression(index)?;
		self.emit_int(Opcode::PushI, min);
		self.emit(Opcode::Sub);
		Ok(())
	}
	/// `ITOF` when an INTEGER value lands in a REAL slot.
	fn widen(&mut self, found: &Type, expected: &Type) {
		if *found == Type::Integer && *expected == Type::Real {
			self.emit(Opcode::ItoF);
		}
	}

	fn statement(&mut self, stmt: &Stmt) -> Result<(), GenerationError> {
		match stmt {
			Stmt::Empty => {}
			Stmt::Block(stmts) => {
				for stmt in stmts {
					self.statement(stmt)?;
				}
			}
			Stmt::Assign { target, value } => self.assign(target, value)?,
			Stmt::Call { name, args, line } => {
				if self.call(name, args, *line)? {
					self.emit_int(Opcode::Pop, 1);
				}
			}
			Stmt::If {
				cond,
				then_branch,
				else_branch,
			} => {
				let else_label = self.new_label();
				let end_label = self.new_label();
				self.expression(cond)?;
				match else_branch {
					Some(else_branch) => {
						self.emit_with(Opcode::Jz, Operand::Label(else_label.clone()));
						self.statement(then_branch)?;
						self.emit_with(Opcode::Jump, Operand::Label(end_label.clone()));
						self.emit_label(&else_label);
						self.statement(else_branch)?;
					}
					None => {
						self.emit_with(Opcode::Jz, Operand::Label(end_label.clone()));
						self.statement(then_branch)?;
					}
				}
				self.emit_label(&end_label);
			}
			Stmt::While { cond, body } => {
				let start_label = self.new_label();
				let end_label = self.new_label();
				self.emit_label(&start_label);
				self.expression(cond)?;
				self.emit_with(Opcode::Jz, Operand::Label(end_label.clone()));
				self.statement(body)?;
				self.emit_with(Opcode::Jump, Operand::Label(start_label));
				self.emit_label(&end_label);
			}
			Stmt::For {
				var,
				start,
				end,
				direction,
				body,
				line,
			} => {
				let storage = self.slot(var, *line)?.storage;
				let (test, step) = match direction {
					Direction::To => (Opcode::InfEq, Opcode::Add),
					Direction::Downto => (Opcode::SupEq, Opcode::Sub),
				};
				let start_label = self.new_label();
				let end_label = self.new_label();
				self.expression(start)?;
				self.store(storage);
				self.emit_label(&start_label);
				self.load(storage);
				self.expression(end)?;
				self.emit(test);
				self.emit_with(Opcode::Jz, Operand::Label(end_label.clone()));
				self.statement(body)?;
				self.load(storage);
				self.emit_int(Opcode::PushI, 1);
				self.emit(step);
				self.store(storage);
				self.emit_with(Opcode::Jump, Operand::Label(start_label));
				self.emit_label(&end_label);
			}
			Stmt::Write { args, newline } => {
				for arg in args {
					self.expression(arg)?;
					let opcode = match self.type_of(arg.id, arg.line)? {
						Type::String => Opcode::WriteS,
						Type::Real => Opcode::WriteF,
						Type::Char => Opcode::WriteChr,
						_ => Opcode::WriteI,
					};
					self.emit(opcode);
				}
				if *newline {
					self.emit(Opcode::WriteLn);
				}
			}
			Stmt::Read { targets, newline } => {
				if targets.is_empty() && *newline {
					// Consume the rest of the line
					self.emit(Opcode::Read);
					self.emit_int(Opcode::Pop, 1);
				}
				for target in targets {
					self.read(target)?;
				}
			}
		}
		Ok(())
	}

	fn assign(&mut self, target: &LValue, value: &Expr) -> Result<(), GenerationError> {
		let found = self.type_of(value.id, value.line)?;
		match target {
			LValue::Var { name, line, .. } => {
				let slot = self.slot(name, *line)?;
				self.expression(value)?;
				self.widen(&found, &slot.ty);
				self.store(slot.storage);
			}
			LValue::Index {
				name, index, line, ..
			} => {
				let slot = self.slot(name, *line)?;
				let Type::Array { min, base, .. } = slot.ty else {
					return Err(GenerationError::InvalidTarget {
						name: name.clone(),
						line: *line,
					});
				};
				self.element_address(slot.storage, min, index)?;
				self.expression(value)?;
				self.widen(&found, &base);
				self.emit(Opcode::StoreN);
			}
		}
		Ok(())
	}

	fn read(&mut self, target: &LValue) -> Result<(), GenerationError> {
		let slot = self.slot(target.name(), target.line())?;
		self.emit(Opcode::Read);
		match self.type_of(target.id(), target.line())? {
			Type::Integer => self.emit(Opcode::AtoI),
			Type::Real => self.emit(Opcode::AtoF),
			Type::Char => self.emit(Opcode::ChrCode),
			_ => {}
		}
		match target {
			LValue::Var { .. } => self.store(slot.storage),
			LValue::Index {
				name, index, line, ..
			} => {
				let Type::Array { min, .. } = slot.ty else {
					return Err(GenerationError::InvalidTarget {
						name: name.clone(),
						line: *line,
					});
				};
				let scratch = self.scratch(*line)?;
				self.emit_int(Opcode::StoreG, scratch);
				self.element_address(slot.storage, min, index)?;
				self.emit_int(Opcode::PushG, scratch);
				self.emit(Opcode::StoreN);
			}
		}
		Ok(())
	}

	/// Emits the call sequence and reports whether a result was left on the
	/// stack.
	fn call(&mut self, name: &str, args: &[Expr], line: usize) -> Result<bool, GenerationError> {
		let routine = self
			.routines
			.get(name)
			.cloned()
			.ok_or_else(|| GenerationError::UnresolvedRoutine {
				name: name.to_string(),
				line,
			})?;
		if routine.returns {
			self.emit_int(Opcode::PushI, 0);
		}
		for (arg, param) in args.iter().zip(&routine.params) {
			self.expression(arg)?;
			let found = self.type_of(arg.id, arg.line)?;
			self.widen(&found, param);
		}
		self.emit_with(Opcode::PushA, Operand::Label(name.to_string()));
		self.emit(Opcode::Call);
		if !args.is_empty() {
			self.emit_int(Opcode::Pop, args.len() as i64);
		}
		Ok(routine.returns)
	}

	fn expression(&mut self, expr: &Expr) -> Result<(), GenerationError> {
		let line = expr.line;
		match &expr.kind {
			ExprKind::Integer(value) => self.emit_int(Opcode::PushI, *value),
			ExprKind::Real(value) => self.emit_with(Opcode::PushF, Operand::Real(*value)),
			ExprKind::Str(value) => self.emit_with(Opcode::PushS, Operand::Str(value.clone())),
			ExprKind::Boolean(value) => self.emit_int(Opcode::PushI, *value as i64),
			ExprKind::Var(name) => match self.resolve(name) {
				Some(slot) => self.load(slot.storage),
				None => {
					self.call(name, &[], line)?;
				}
			},
			ExprKind::Index { name, index } => {
				let slot = self.slot(name, line)?;
				match slot.ty {
					Type::Array { min, .. } => {
						self.element_address(slot.storage, min, index)?;
						self.emit(Opcode::LoadN);
					}
					_ => {
						// 1-based source index against a 0-based CHARAT
						self.load(slot.storage);
						self.expression(index)?;
						self.emit_int(Opcode::PushI, 1);
						self.emit(Opcode::Sub);
						self.emit(Opcode::CharAt);
					}
				}
			}
			ExprKind::Call { name, args } => {
				self.call(name, args, line)?;
			}
			ExprKind::Length(arg) => match self.type_of(arg.id, arg.line)? {
				ty @ Type::Array { .. } => {
					let count = ty
						.size()
						.and_then(|size| i64::try_from(size).ok())
						.ok_or(GenerationError::StorageOverflow { line })?;
					self.emit_int(Opcode::PushI, count);
				}
				_ => {
					self.expression(arg)?;
					self.emit(Opcode::StrLen);
				}
			},
			ExprKind::Unary { op, operand } => {
				self.expression(operand)?;
				match op {
					UnaryOperation::Not => self.emit(Opcode::Not),
					UnaryOperation::Plus => {}
					UnaryOperation::Neg => {
						if self.type_of(operand.id, operand.line)? == Type::Real {
							self.emit_with(Opcode::PushF, Operand::Real(-1.0));
							self.emit(Opcode::FMul);
						} else {
							self.emit_int(Opcode::PushI, -1);
							self.emit(Opcode::Mul);
						}
					}
				}
			}
			ExprKind::Binary { op, lhs, rhs } => self.binary(expr, *op, lhs, rhs)?,
		}
		Ok(())
	}

	/// Pushes an operand, converting it to REAL or to a character code.
	fn operand(&mut self, expr: &Expr, to_real: bool, to_code: bool) -> Result<(), GenerationError> {
		self.expression(expr)?;
		let ty = self.type_of(expr.id, expr.line)?;
		if to_real && ty == Type::Integer {
			self.emit(Opcode::ItoF);
		}
		if to_code && ty == Type::String {
			self.emit(Opcode::ChrCode);
		}
		Ok(())
	}

	fn binary(
		&mut self,
		expr: &Expr,
		op: BinaryOperation,
		lhs: &Expr,
		rhs: &Expr,
	) -> Result<(), GenerationError> {
		use BinaryOperation::*;
		let lhs_type = self.type_of(lhs.id, lhs.line)?;
		let rhs_type = self.type_of(rhs.id, rhs.line)?;
		if op.is_logical() {
			self.expression(lhs)?;
			self.expression(rhs)?;
			self.emit(if op == And { Opcode::And } else { Opcode::Or });
			return Ok(());
		}
		if op.is_relational() {
			let real = lhs_type == Type::Real || rhs_type == Type::Real;
			let mixed_text = matches!(
				(&lhs_type, &rhs_type),
				(Type::Char, Type::String) | (Type::String, Type::Char)
			);
			self.operand(lhs, real, mixed_text)?;
			self.operand(rhs, real, mixed_text)?;
			let opcode = match (op, real) {
				(Equal | NotEqual, _) => Opcode::Equal,
				(Less, false) => Opcode::Inf,
				(Less, true) => Opcode::FInf,
				(LessEqual, false) => Opcode::InfEq,
				(LessEqual, true) => Opcode::FInfEq,
				(Greater, false) => Opcode::Sup,
				(Greater, true) => Opcode::FSup,
				(GreaterEqual, false) => Opcode::SupEq,
				(GreaterEqual, true) => Opcode::FSupEq,
				_ => unreachable!("{op:?} is relational"),
			};
			self.emit(opcode);
			if op == NotEqual {
				self.emit(Opcode::Not);
			}
			return Ok(());
		}
		let result = self.type_of(expr.id, expr.line)?;
		if result == Type::String {
			self.expression(lhs)?;
			self.expression(rhs)?;
			self.emit(Opcode::Concat);
			return Ok(());
		}
		let real = result == Type::Real;
		self.operand(lhs, real, false)?;
		self.operand(rhs, real, false)?;
		let opcode = match (op, real) {
			(Add, false) => Opcode::Add,
			(Add, true) => Opcode::FAdd,
			(Sub, false) => Opcode::Sub,
			(Sub, true) => Opcode::FSub,
			(Mul, false) => Opcode::Mul,
			(Mul, true) => Opcode::FMul,
			(Slash, _) => Opcode::FDiv,
			(Div, _) => Opcode::Div,
			(Mod, _) => Opcode::Mod,
			_ => unreachable!("{op:?} is arithmetic"),
		};
		self.emit(opcode);
		Ok(())
	}
}
