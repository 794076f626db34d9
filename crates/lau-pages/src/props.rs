//! Type-erased props passed from SSR props to pages and layouts.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::PageError;

/// Props computed for one request, or absent when the page has no SSR props.
#[derive(Clone, Default)]
pub struct Props(Option<Arc<dyn Any + Send + Sync>>);

impl Props {
    /// No props (page declared without SSR props).
    #[must_use]
    pub fn absent() -> Self {
        Self(None)
    }

    /// Wrap a computed props value.
    pub fn new<P: Any + Send + Sync>(value: P) -> Self {
        Self(Some(Arc::new(value)))
    }

    /// True when no props were computed.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.0.is_none()
    }

    /// Borrow the props as `P`.
    pub fn downcast<P: Any + Send + Sync>(&self) -> Result<Arc<P>, PageError> {
        self.0
            .clone()
            .and_then(|value| value.downcast::<P>().ok())
            .ok_or(PageError::PropsType {
                expected: std::any::type_name::<P>(),
            })
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_some() {
            f.write_str("Props(..)")
        } else {
            f.write_str("Props(None)")
        }
    }
}
