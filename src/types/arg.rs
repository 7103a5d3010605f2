//! The argument model for completion signals.
//!
//! A signal settles with an ordered argument list rather than a single
//! value, and an aggregate built by [`when`](crate::combinator::when) can
//! contribute a whole value-list at one position of a larger list. [`Arg`]
//! captures both shapes as a tagged union, so a resolved argument list like
//! `[1, [2, 3]]` is representable without runtime type inspection.

/// One position in a settlement argument list: a plain value or a nested
/// value-list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arg<T> {
    /// A single value.
    Value(T),
    /// A nested list, as produced by an aggregate input that settled with
    /// more than one argument.
    List(Vec<Arg<T>>),
}

impl<T> Arg<T> {
    /// Wraps a sequence of plain values as a nested list.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self::List(items.into_iter().map(Self::Value).collect())
    }

    /// Returns the plain value, if this is not a list.
    #[must_use]
    pub const fn as_value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            Self::List(_) => None,
        }
    }

    /// Returns the nested list, if this is one.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Arg<T>]> {
        match self {
            Self::Value(_) => None,
            Self::List(items) => Some(items),
        }
    }

    /// Returns true if this position holds a plain value.
    #[must_use]
    pub const fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

/// Builds an argument list of plain values.
///
/// Shorthand for the common case where no position nests a list.
pub fn args<T, I>(items: I) -> Vec<Arg<T>>
where
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(Arg::Value).collect()
}
