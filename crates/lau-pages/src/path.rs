//! Module path to URL pattern mapping and reverse routing.
//!
//! Examples:
//! - `pages/index` -> `/`
//! - `pages/blog/index` -> `/blog`
//! - `pages/greet/[username]` -> `/greet/{username}`

use std::collections::BTreeMap;
use std::sync::LazyLock;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regex::Regex;

/// Number of leading module path segments naming the page root (`pages`).
pub const PAGE_ROOT_DEPTH: usize = 1;

/// Parameter name to value mapping for one concrete URL of a route.
pub type PathParams = BTreeMap<String, String>;

/// Matches a `{name}` placeholder.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").expect("placeholder regex is valid"));

/// Characters escaped in parameter values. `/` and `.` are kept so that
/// traversal segments stay visible to the build containment check.
const PARAM_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Reverse routing error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlError {
    /// Pattern parameter without a value.
    #[error("missing value for parameter `{param}` of {pattern}")]
    MissingParam {
        /// Route pattern.
        pattern: String,
        /// Parameter name.
        param: String,
    },
    /// Value supplied for a parameter the pattern does not have.
    #[error("{pattern} has no parameter `{param}`")]
    UnknownParam {
        /// Route pattern.
        pattern: String,
        /// Parameter name.
        param: String,
    },
    /// Parameter value is empty.
    #[error("empty value for parameter `{param}` of {pattern}")]
    EmptyParam {
        /// Route pattern.
        pattern: String,
        /// Parameter name.
        param: String,
    },
}

/// Derive the URL pattern for a page module.
///
/// `segments` is the module path relative to the source root, without file
/// extension, e.g. `["pages", "greet", "[username]"]`. The leading
/// [`PAGE_ROOT_DEPTH`] segments are dropped, `[name]` becomes `{name}` and a
/// trailing `index` collapses to its parent.
pub fn route_pattern<S: AsRef<str>>(segments: &[S]) -> String {
    let remaining = segments.get(PAGE_ROOT_DEPTH..).unwrap_or_default();

    let joined = remaining
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("/")
        .replace('[', "{")
        .replace(']', "}");

    let is_index = remaining.last().is_some_and(|stem| stem.as_ref() == "index");
    let path = if is_index {
        joined.rsplit_once('/').map_or("", |(parent, _)| parent)
    } else {
        joined.as_str()
    };

    format!("/{path}")
}

/// True if the pattern has at least one `{name}` placeholder.
pub fn has_parameters(pattern: &str) -> bool {
    PLACEHOLDER_RE.is_match(pattern)
}

/// Placeholder names in order of appearance.
pub fn parameter_names(pattern: &str) -> Vec<&str> {
    PLACEHOLDER_RE
        .captures_iter(pattern)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Build a parameter set from pairs.
pub fn params<I, K, V>(pairs: I) -> PathParams
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Produce the literal URL for a pattern and a parameter set.
///
/// Every placeholder needs a non-empty value and every value must belong to
/// a placeholder.
pub fn url_for(pattern: &str, params: &PathParams) -> Result<String, UrlError> {
    let names = parameter_names(pattern);

    if let Some(unknown) = params.keys().find(|k| !names.contains(&k.as_str())) {
        return Err(UrlError::UnknownParam {
            pattern: pattern.to_owned(),
            param: unknown.clone(),
        });
    }

    let mut url = String::with_capacity(pattern.len());
    let mut last = 0;
    for caps in PLACEHOLDER_RE.captures_iter(pattern) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = params
            .get(name.as_str())
            .ok_or_else(|| UrlError::MissingParam {
                pattern: pattern.to_owned(),
                param: name.as_str().to_owned(),
            })?;
        if value.is_empty() {
            return Err(UrlError::EmptyParam {
                pattern: pattern.to_owned(),
                param: name.as_str().to_owned(),
            });
        }

        url.push_str(&pattern[last..whole.start()]);
        url.extend(utf8_percent_encode(value, PARAM_VALUE));
        last = whole.end();
    }
    url.push_str(&pattern[last..]);

    Ok(url)
}
