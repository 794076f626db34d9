//! Declared hook signatures.
//!
//! Page hooks are type-erased once registered, so each one carries the
//! types it was declared with. The contract validator compares these tags
//! instead of inspecting function signatures.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity and display name of a declared type.
#[derive(Clone, Copy, Debug)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Tag for `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type name, as reported by [`std::any::type_name`].
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Render an optional tag the way validation errors print it.
    pub(crate) fn describe(tag: Option<Self>) -> String {
        tag.map_or_else(|| "None".to_owned(), |t| t.name.to_owned())
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Number of arguments a page entry point takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    /// `page()`
    Nullary,
    /// `page(props)`
    Unary,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeting;

    #[test]
    fn test_same_type_tags_are_equal() {
        assert_eq!(TypeTag::of::<Greeting>(), TypeTag::of::<Greeting>());
        assert_ne!(TypeTag::of::<Greeting>(), TypeTag::of::<String>());
    }

    #[test]
    fn test_describe_absent_tag() {
        assert_eq!(TypeTag::describe(None), "None");
        assert!(TypeTag::describe(Some(TypeTag::of::<Greeting>())).ends_with("Greeting"));
    }
}
