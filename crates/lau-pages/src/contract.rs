//! Page module contract validation.

use std::sync::LazyLock;

use axum::http::Method;
use regex::Regex;

use crate::element::accepted_return_types;
use crate::entry::{LayoutEntry, PageEntry, SsrPropsEntry, StaticPathsEntry};
use crate::path::PAGE_ROOT_DEPTH;
use crate::registry::{ModulePath, PageModule};
use crate::signature::TypeTag;

/// A parameter segment: one `[name]` whose name is a plain identifier.
static PARAM_SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[[A-Za-z_][A-Za-z0-9_]*\]$").expect("parameter segment regex is valid")
});

/// Methods a page may be restricted to.
const KNOWN_METHODS: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
    Method::PATCH,
];

/// A page module or error handler violates its declared contract.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("module `{module}` has no page entry point")]
    MissingPage { module: String },

    #[error("could not determine the props type returned by ssr props of `{module}`")]
    UndeterminedPropsType { module: String },

    #[error(
        "layout of `{module}` takes props of type {layout}, but the module props type is {expected}"
    )]
    LayoutPropsMismatch {
        module: String,
        layout: String,
        expected: String,
    },

    #[error("`{module}` returns {found}; expected Element, Response or PageOutput")]
    InvalidReturnType { module: String, found: String },

    #[error("page of `{module}` takes props of type {page}, but the module props type is {expected}")]
    PagePropsMismatch {
        module: String,
        page: String,
        expected: String,
    },

    #[error("page of `{module}` allows unknown HTTP method `{method}`")]
    InvalidMethod { module: String, method: String },

    #[error("module `{module}` is not below the page root")]
    InvalidModulePath { module: String },

    #[error("segment `{segment}` of `{module}` is neither literal nor a single `[name]` parameter")]
    InvalidSegment { module: String, segment: String },

    #[error("module `{module}` is registered more than once")]
    DuplicateModule { module: String },

    #[error("error handlers can only be registered for 4xx and 5xx statuses, got {status}")]
    InvalidErrorStatus { status: u16 },
}

/// A module whose hooks agree with each other.
#[derive(Debug)]
pub(crate) struct ValidatedModule {
    pub(crate) page: PageEntry,
    pub(crate) static_paths: Option<StaticPathsEntry>,
    pub(crate) ssr_props: Option<SsrPropsEntry>,
    pub(crate) layout: Option<LayoutEntry>,
    pub(crate) methods: Option<Vec<Method>>,
}

/// Check a module's hooks against each other, in a fixed order; the first
/// violation is reported.
pub(crate) fn validate(module: &str, declared: PageModule) -> Result<ValidatedModule, ContractError> {
    let PageModule {
        page,
        static_paths,
        ssr_props,
        layout,
    } = declared;

    let page = page.ok_or_else(|| ContractError::MissingPage {
        module: module.to_owned(),
    })?;

    let props_type = match &ssr_props {
        Some(hook) => Some(hook.return_type().ok_or_else(|| {
            ContractError::UndeterminedPropsType {
                module: module.to_owned(),
            }
        })?),
        None => None,
    };

    if let Some(layout) = &layout
        && layout.props_type() != props_type
    {
        return Err(ContractError::LayoutPropsMismatch {
            module: module.to_owned(),
            layout: TypeTag::describe(layout.props_type()),
            expected: TypeTag::describe(props_type),
        });
    }

    check_return_type(module, page.return_type())?;

    if page.props_type() != props_type {
        return Err(ContractError::PagePropsMismatch {
            module: module.to_owned(),
            page: TypeTag::describe(page.props_type()),
            expected: TypeTag::describe(props_type),
        });
    }

    let methods = page
        .declared_methods()
        .map(|names| {
            names
                .iter()
                .map(|name| parse_method(module, name))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    Ok(ValidatedModule {
        page,
        static_paths,
        ssr_props,
        layout,
        methods,
    })
}

/// Check that a module path names something below the page root and that
/// each of its segments is a literal or exactly one `[name]` parameter.
pub(crate) fn validate_path(path: &ModulePath) -> Result<(), ContractError> {
    let module = path.name();
    let below_root = path.segments().get(PAGE_ROOT_DEPTH..).unwrap_or_default();
    if below_root.is_empty() {
        return Err(ContractError::InvalidModulePath { module });
    }

    for segment in below_root {
        let special = segment.contains(['[', ']', '{', '}']) || segment.starts_with([':', '*']);
        if special && !PARAM_SEGMENT_RE.is_match(segment) {
            return Err(ContractError::InvalidSegment {
                module,
                segment: segment.clone(),
            });
        }
    }
    Ok(())
}

/// Reject hooks that return anything but a renderable output.
pub(crate) fn check_return_type(module: &str, returns: TypeTag) -> Result<(), ContractError> {
    if accepted_return_types().contains(&returns) {
        Ok(())
    } else {
        Err(ContractError::InvalidReturnType {
            module: module.to_owned(),
            found: returns.name().to_owned(),
        })
    }
}

fn parse_method(module: &str, name: &str) -> Result<Method, ContractError> {
    let upper = name.to_ascii_uppercase();
    KNOWN_METHODS
        .iter()
        .find(|m| m.as_str() == upper)
        .cloned()
        .ok_or_else(|| ContractError::InvalidMethod {
            module: module.to_owned(),
            method: name.to_owned(),
        })
}
