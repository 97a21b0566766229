//! Literal-or-resolver option values.

use std::fmt;
use std::rc::Rc;

use crate::error::Result;

/// Resolver signature: computes an option from the bound element.
pub type ResolverFn<T, E> = Rc<dyn Fn(&E) -> Result<T>>;

/// A single option value.
///
/// Resolvers run once per binding configuration (or once per request for
/// per-call overrides) and are replaced by their result.
pub enum OptionValue<T, E> {
	/// A plain value.
	Literal(T),
	/// A function of the bound element.
	Resolver(ResolverFn<T, E>),
}

impl<T, E> OptionValue<T, E> {
	/// Wraps a resolver function.
	pub fn resolver<F>(resolver: F) -> Self
	where
		F: Fn(&E) -> Result<T> + 'static,
	{
		Self::Resolver(Rc::new(resolver))
	}

	/// Returns the literal value, if already resolved.
	pub fn as_literal(&self) -> Option<&T> {
		match self {
			Self::Literal(value) => Some(value),
			Self::Resolver(_) => None,
		}
	}

	/// Returns true for [`OptionValue::Resolver`].
	pub fn is_resolver(&self) -> bool {
		matches!(self, Self::Resolver(_))
	}
}

impl<T: Clone, E> OptionValue<T, E> {
	/// Produces the concrete value, invoking the resolver if needed.
	pub fn evaluate(&self, element: &E) -> Result<T> {
		match self {
			Self::Literal(value) => Ok(value.clone()),
			Self::Resolver(resolver) => resolver(element),
		}
	}

	/// Returns a literal copy of this value.
	pub fn into_literal(&self, element: &E) -> Result<Self> {
		self.evaluate(element).map(Self::Literal)
	}
}

impl<T: Clone, E> Clone for OptionValue<T, E> {
	fn clone(&self) -> Self {
		match self {
			Self::Literal(value) => Self::Literal(value.clone()),
			Self::Resolver(resolver) => Self::Resolver(Rc::clone(resolver)),
		}
	}
}

impl<T: fmt::Debug, E> fmt::Debug for OptionValue<T, E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
			Self::Resolver(_) => f.debug_tuple("Resolver").field(&"<function>").finish(),
		}
	}
}
