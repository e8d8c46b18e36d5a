//! Type descriptors and the compatibility rules both the analyzer and the
//! generator rely on.
use std::fmt;

use crate::ast::TypeSpec;

#[derive(Clone, Debug, PartialEq)]
pub enum Type {
	Integer,
	Real,
	Boolean,
	Char,
	String,
	Array { min: i64, max: i64, base: Box<Type> },
	/// Result of a procedure
	Void,
}

impl Type {
	pub fn is_numeric(&self) -> bool {
		matches!(self, Type::Integer | Type::Real)
	}
	fn is_textual(&self) -> bool {
		matches!(self, Type::Char | Type::String)
	}
	pub fn is_array(&self) -> bool {
		matches!(self, Type::Array { .. })
	}
	/// Number of storage slots a value of this type occupies. `None` when an
	/// array's element count is negative or overflows.
	pub fn size(&self) -> Option<usize> {
		match self {
			Type::Array { min, max, .. } => max
				.checked_sub(*min)
				.and_then(|span| span.checked_add(1))
				.and_then(|count| usize::try_from(count).ok()),
			_ => Some(1),
		}
	}
	/// Categories match, ignoring array bounds.
	pub fn same_category(&self, other: &Type) -> bool {
		std::mem::discriminant(self) == std::mem::discriminant(other)
	}
	/// `self := value` is legal: identical categories, or REAL <- INTEGER.
	pub fn accepts(&self, value: &Type) -> bool {
		self.same_category(value) || (*self == Type::Real && *value == Type::Integer)
	}
	/// Operands a relational operator may compare.
	pub fn comparable(&self, other: &Type) -> bool {
		if self.is_array() || other.is_array() {
			return false;
		}
		self.same_category(other)
			|| (self.is_numeric() && other.is_numeric())
			|| (self.is_textual() && other.is_textual())
	}
}

impl From<&TypeSpec> for Type {
	fn from(spec: &TypeSpec) -> Self {
		match spec {
			TypeSpec::Integer => Type::Integer,
			TypeSpec::Real => Type::Real,
			TypeSpec::Boolean => Type::Boolean,
			TypeSpec::Char => Type::Char,
			TypeSpec::String => Type::String,
			TypeSpec::Array { min, max, base } => Type::Array {
				min: *min,
				max: *max,
				base: Box::new(Type::from(base.as_ref())),
			},
		}
	}
}

impl fmt::Display for Type {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Type::Integer => write!(f, "INTEGER"),
			Type::Real => write!(f, "REAL"),
			Type::Boolean => write!(f, "BOOLEAN"),
			Type::Char => write!(f, "CHAR"),
			Type::String => write!(f, "STRING"),
			Type::Array { min, max, base } => write!(f, "ARRAY[{min}..{max}] OF {base}"),
			Type::Void => write!(f, "VOID"),
		}
	}
}

#[cfg(test)]
mod test {
	#[allow(unused_imports)]
	use super::*;

	#[test]
	fn widening() {
		assert!(Type::Real.accepts(&Type::Integer));
		assert!(!Type::Integer.accepts(&Type::Real));
		assert!(!Type::Char.accepts(&Type::String));
		assert!(Type::String.accepts(&Type::String));
	}

	#[test]
	fn comparisons() {
		assert!(Type::Integer.comparable(&Type::Real));
		assert!(Type::Char.comparable(&Type::String));
		assert!(Type::Boolean.comparable(&Type::Boolean));
		assert!(!Type::Boolean.comparable(&Type::Integer));
		let array = Type::Array {
			min: 1,
			max: 5,
			base: Box::new(Type::Integer),
		};
		assert!(!array.comparable(&array));
		assert_eq!(array.size(), Some(5));
	}

	#[test]
	fn array_sizes() {
		let array = |min, max| Type::Array {
			min,
			max,
			base: Box::new(Type::Integer),
		};
		assert_eq!(Type::String.size(), Some(1));
		assert_eq!(array(-3, 3).size(), Some(7));
		assert_eq!(array(5, 1).size(), None);
		assert_eq!(array(0, i64::MAX).size(), None);
		assert_eq!(array(i64::MIN, 0).size(), None);
		assert_eq!(array(1, i64::MAX).size(), Some(i64::MAX as usize));
	}
}
