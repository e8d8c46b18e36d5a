//! Semantic Analyzer
//!
//! Takes a reference to `ast::Program` and collects every scope and type
//! violation it finds. Code generation should only run when the returned
//! `Analysis` has no errors; it also reads the expression types recorded here.
use std::collections::HashMap;

use crate::{
	ast::*,
	error::SemanticError,
	types::Type,
};

/// Name of the label the generator places the program body under.
pub const ENTRY_LABEL: &str = "main";
/// Control-flow labels are this prefix followed by a counter.
pub const LABEL_PREFIX: &str = "label";

/// Subprogram names double as labels, so they must not collide with the ones
/// the generator makes up.
pub fn is_reserved_label(name: &str) -> bool {
	name == ENTRY_LABEL
		|| name
			.strip_prefix(LABEL_PREFIX)
			.is_some_and(|counter| !counter.is_empty() && counter.bytes().all(|b| b.is_ascii_digit()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
	/// `Type::Void` for procedures
	pub return_type: Type,
	pub params: Vec<Type>,
}

#[derive(Debug, Default)]
pub struct Analysis {
	pub errors: Vec<SemanticError>,
	types: HashMap<ExprId, Type>,
}

impl Analysis {
	pub fn is_ok(&self) -> bool {
		self.errors.is_empty()
	}
	/// Type inferred for an expression or assignment target, if it was checked.
	pub fn type_of(&self, id: ExprId) -> Option<&Type> {
		self.types.get(&id)
	}
}

pub fn analyze(program: &Program) -> Analysis {
	let mut stack = ScopeStack::new();
	for decl in &program.globals {
		stack.declare(decl);
	}
	for subprogram in &program.subprograms {
		stack.subprogram(subprogram);
	}
	for stmt in &program.body {
		stack.statement(stmt);
	}
	log::debug!(
		"analyzed '{}': {} semantic errors, {} typed expressions",
		program.name,
		stack.errors.len(),
		stack.types.len()
	);
	Analysis {
		errors: stack.errors,
		types: stack.types,
	}
}

type ScopeTable = HashMap<Ident, Type>;

#[derive(Debug)]
struct ScopeStack {
	scope_table: Vec<ScopeTable>,
	defined_functions: HashMap<Ident, Signature>,
	errors: Vec<SemanticError>,
	types: HashMap<ExprId, Type>,
}

impl ScopeStack {
	fn new() -> Self {
		Self {
			scope_table: vec![ScopeTable::new()],
			defined_functions: HashMap::new(),
			errors: Vec::new(),
			types: HashMap::new(),
		}
	}
	fn error(&mut self, error: SemanticError) {
		log::trace!("{error}");
		self.errors.push(error);
	}
	fn lookup(&self, name: &str) -> Option<&Type> {
		self.scope_table.iter().rev().find_map(|scope| scope.get(name))
	}
	/// Binds `name` in the innermost scope. A name already bound there keeps
	/// its original type.
	fn bind(&mut self, name: &str, ty: Type, line: usize) {
		match self.scope_table.last_mut() {
			Some(scope) if !scope.contains_key(name) => {
				scope.insert(name.to_string(), ty);
			}
			_ => self.error(SemanticError::Redeclaration {
				name: name.to_string(),
				line,
			}),
		}
	}
	fn declare(&mut self, decl: &VarDecl) {
		let ty = self.resolve(&decl.ty, decl.line);
		self.bind(&decl.name, ty, decl.line);
	}
	fn resolve(&mut self, spec: &TypeSpec, line: usize) -> Type {
		let ty = Type::from(spec);
		if let Type::Array { min, max, base } = &ty {
			if min > max {
				self.error(SemanticError::ReversedBounds {
					min: *min,
					max: *max,
					line,
				});
			} else if ty.size().is_none() {
				self.error(SemanticError::ArraySize {
					min: *min,
					max: *max,
					line,
				});
			}
			if base.is_array() {
				self.error(SemanticError::NestedArray { line });
			}
		}
		ty
	}
	fn record(&mut self, id: ExprId, ty: Option<Type>) -> Option<Type> {
		if let Some(ty) = &ty {
			self.types.insert(id, ty.clone());
		}
		ty
	}

	fn subprogram(&mut self, subprogram: &Subprogram) {
		let Subprogram {
			name,
			params,
			return_type,
			locals,
			body,
			line,
		} = subprogram;
		let param_types: Vec<Type> = params
			.iter()
			.map(|param| {
				let ty = self.resolve(&param.ty, param.line);
				if ty.is_array() {
					self.error(SemanticError::ArrayInSignature {
						name: param.name.clone(),
						line: param.line,
					});
				}
				ty
			})
			.collect();
		let return_type = match return_type {
			Some(spec) => {
				let ty = self.resolve(spec, *line);
				if ty.is_array() {
					self.error(SemanticError::ArrayInSignature {
						name: name.clone(),
						line: *line,
					});
				}
				ty
			}
			None => Type::Void,
		};
		if is_reserved_label(name) {
			self.error(SemanticError::ReservedName {
				name: name.clone(),
				line: *line,
			});
		}
		if self.defined_functions.contains_key(name) {
			self.error(SemanticError::RoutineRedefinition {
				name: name.clone(),
				line: *line,
			});
		} else {
			self.defined_functions.insert(
				name.clone(),
				Signature {
					return_type: return_type.clone(),
					params: param_types.clone(),
				},
			);
		}

		log::trace!("entering scope of '{name}'");
		self.scope_table.push(ScopeTable::new());
		if return_type != Type::Void {
			// `name := value` sets the result
			self.bind(name, return_type, *line);
		}
		for (param, ty) in params.iter().zip(param_types) {
			self.bind(&param.name, ty, param.line);
		}
		for decl in locals {
			self.declare(decl);
		}
		for stmt in body {
			self.statement(stmt);
		}
		self.scope_table.pop();
		log::trace!("leaving scope of '{name}'");
	}

	fn statement(&mut self, stmt: &Stmt) {
		match stmt {
			Stmt::Empty => {}
			Stmt::Block(stmts) => stmts.iter().for_each(|stmt| self.statement(stmt)),
			Stmt::Assign { target, value } => {
				let target_type = self.lvalue(target, true);
				let value_type = self.expression(value);
				if let (Some(expected), Some(found)) = (target_type, value_type) {
					if expected.is_array() {
						self.error(SemanticError::ArrayAssignment {
							line: target.line(),
						});
					} else if !expected.accepts(&found) {
						self.error(SemanticError::AssignMismatch {
							expected,
							found,
							line: target.line(),
						});
					}
				}
			}
			Stmt::Call { name, args, line } => {
				self.call(name, args, *line, false);
			}
			Stmt::If {
				cond,
				then_branch,
				else_branch,
			} => {
				self.condition("IF", cond);
				self.statement(then_branch);
				if let Some(else_branch) = else_branch {
					self.statement(else_branch);
				}
			}
			Stmt::While { cond, body } => {
				self.condition("WHILE", cond);
				self.statement(body);
			}
			Stmt::For {
				var,
				start,
				end,
				body,
				line,
				..
			} => {
				match self.lookup(var).cloned() {
					None => self.error(SemanticError::UndeclaredVariable {
						name: var.clone(),
						line: *line,
					}),
					Some(Type::Integer) => {}
					Some(_) => self.error(SemanticError::ForVariableType {
						name: var.clone(),
						line: *line,
					}),
				}
				for (bound, expr) in [("initial", start), ("final", end)] {
					match self.expression(expr) {
						Some(Type::Integer) | None => {}
						Some(found) => self.error(SemanticError::ForBoundType {
							bound,
							found,
							line: expr.line,
						}),
					}
				}
				self.statement(body);
			}
			Stmt::Write { args, .. } => {
				for arg in args {
					match self.expression(arg) {
						Some(found) if found.is_array() || found == Type::Void => {
							self.error(SemanticError::UnwritableValue {
								found,
								line: arg.line,
							})
						}
						_ => {}
					}
				}
			}
			Stmt::Read { targets, .. } => {
				for target in targets {
					match self.lvalue(target, true) {
						Some(found) if found.is_array() || found == Type::Boolean => {
							self.error(SemanticError::UnreadableTarget {
								found,
								line: target.line(),
							})
						}
						_ => {}
					}
				}
			}
		}
	}

	fn condition(&mut self, statement: &'static str, cond: &Expr) {
		match self.expression(cond) {
			Some(Type::Boolean) | None => {}
			Some(found) => self.error(SemanticError::NonBooleanCondition {
				statement,
				found,
				line: cond.line,
			}),
		}
	}

	fn lvalue(&mut self, target: &LValue, store: bool) -> Option<Type> {
		match target {
			LValue::Var { id, name, line } => {
				let ty = self.variable(name, *line);
				self.record(*id, ty)
			}
			LValue::Index {
				id,
				name,
				index,
				line,
			} => {
				let ty = self.index(name, index, *line, store);
				self.record(*id, ty)
			}
		}
	}

	fn variable(&mut self, name: &str, line: usize) -> Option<Type> {
		let ty = self.lookup(name).cloned();
		if ty.is_none() {
			self.error(SemanticError::UndeclaredVariable {
				name: name.to_string(),
				line,
			});
		}
		ty
	}

	fn index(&mut self, name: &str, index: &Expr, line: usize, store: bool) -> Option<Type> {
		let symbol = self.variable(name, line)?;
		match self.expression(index) {
			Some(Type::Integer) | None => {}
			Some(found) => self.error(SemanticError::IndexType {
				found,
				line: index.line,
			}),
		}
		match symbol {
			Type::String => {
				if store {
					self.error(SemanticError::StringElementStore {
						name: name.to_string(),
						line,
					});
				}
				Some(Type::Char)
			}
			Type::Array { base, .. } => Some(*base),
			other => {
				self.error(SemanticError::NotIndexable {
					name: name.to_string(),
					line,
				});
				Some(other)
			}
		}
	}

	fn expression(&mut self, expr: &Expr) -> Option<Type> {
		let line = expr.line;
		let ty = match &expr.kind {
			ExprKind::Integer(_) => Some(Type::Integer),
			ExprKind::Real(_) => Some(Type::Real),
			ExprKind::Str(_) => Some(Type::String),
			ExprKind::Boolean(_) => Some(Type::Boolean),
			ExprKind::Var(name) => self.bare_identifier(name, line),
			ExprKind::Index { name, index } => self.index(name, index, line, false),
			ExprKind::Call { name, args } => self.call(name, args, line, true),
			ExprKind::Length(arg) => {
				match self.expression(arg) {
					Some(Type::String | Type::Array { .. }) | None => {}
					Some(found) => self.error(SemanticError::LengthArgument { found, line }),
				}
				Some(Type::Integer)
			}
			ExprKind::Unary { op, operand } => self.unary(*op, operand, line),
			ExprKind::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs, line),
		};
		self.record(expr.id, ty)
	}

	/// A variable in scope, otherwise a call to a parameterless function.
	fn bare_identifier(&mut self, name: &str, line: usize) -> Option<Type> {
		if let Some(ty) = self.lookup(name) {
			return Some(ty.clone());
		}
		if self.defined_functions.contains_key(name) {
			return self.call(name, &[], line, true);
		}
		self.variable(name, line)
	}

	fn unary(&mut self, op: UnaryOperation, operand: &Expr, line: usize) -> Option<Type> {
		let found = self.expression(operand)?;
		match op {
			UnaryOperation::Not => {
				if found != Type::Boolean {
					self.error(SemanticError::UnaryOperand {
						op: op.symbol(),
						expected: "BOOLEAN",
						found,
						line,
					});
				}
				Some(Type::Boolean)
			}
			UnaryOperation::Neg | UnaryOperation::Plus => {
				if !found.is_numeric() {
					self.error(SemanticError::UnaryOperand {
						op: op.symbol(),
						expected: "a number",
						found: found.clone(),
						line,
					});
				}
				Some(found)
			}
		}
	}

	fn binary(&mut self, op: BinaryOperation, lhs: &Expr, rhs: &Expr, line: usize) -> Option<Type> {
		use BinaryOperation::*;
		let lhs = self.expression(lhs);
		let rhs = self.expression(rhs);
		let (lhs, rhs) = (lhs?, rhs?);
		if op.is_logical() {
			if lhs != Type::Boolean || rhs != Type::Boolean {
				self.error(SemanticError::NonBooleanLogic {
					op: op.symbol(),
					line,
				});
			}
			return Some(Type::Boolean);
		}
		if op.is_relational() {
			if !lhs.comparable(&rhs) {
				self.error(SemanticError::InvalidComparison { lhs, rhs, line });
			}
			return Some(Type::Boolean);
		}
		if op == Add && (lhs == Type::String || rhs == Type::String) {
			if lhs != rhs {
				self.error(SemanticError::Concatenation { line });
			}
			return Some(Type::String);
		}
		if !(lhs.is_numeric() && rhs.is_numeric()) {
			self.error(SemanticError::NonNumericOperands {
				op: op.symbol(),
				lhs,
				rhs,
				line,
			});
			return Some(Type::Real);
		}
		Some(match op {
			Slash => Type::Real,
			Div | Mod => {
				if lhs != Type::Integer || rhs != Type::Integer {
					self.error(SemanticError::NonIntegerDivision { line });
				}
				Type::Integer
			}
			_ if lhs == Type::Real || rhs == Type::Real => Type::Real,
			_ => Type::Integer,
		})
	}

	/// Checks a call against its signature. An undeclared callee is typed
	/// INTEGER so the enclosing expression can still be checked.
	fn call(&mut self, name: &str, args: &[Expr], line: usize, as_value: bool) -> Option<Type> {
		let Some(signature) = self.defined_functions.get(name).cloned() else {
			self.error(SemanticError::UndeclaredRoutine {
				name: name.to_string(),
				line,
			});
			return Some(Type::Integer);
		};
		if args.len() != signature.params.len() {
			self.error(SemanticError::Arity {
				name: name.to_string(),
				expected: signature.params.len(),
				found: args.len(),
				line,
			});
		} else {
			for (position, (arg, expected)) in args.iter().zip(&signature.params).enumerate() {
				match self.expression(arg) {
					Some(found) if !expected.accepts(&found) => {
						self.error(SemanticError::ArgumentType {
							name: name.to_string(),
							position: position + 1,
							expected: expected.clone(),
							found,
							line: arg.line,
						})
					}
					_ => {}
				}
			}
		}
		match signature.return_type {
			Type::Void if as_value => {
				self.error(SemanticError::ProcedureAsValue {
					name: name.to_string(),
					line,
				});
				None
			}
			Type::Void => None,
			ty => Some(ty),
		}
	}
}
