//! `/greet/{username}`: pre-rendered for a fixed set of users.

use lau_pages::{
    Element, PageEntry, PageError, PageModule, PageRequest, SsrPropsEntry, StaticPathsEntry,
    params, use_request,
};

pub(crate) struct UsernameProps {
    info: String,
}

pub(crate) fn module() -> PageModule {
    PageModule::new()
        .static_paths(StaticPathsEntry::fixed(
            ["ren", "example", "epicgamer"]
                .into_iter()
                .map(|username| params([("username", username)]))
                .collect(),
        ))
        .ssr_props(SsrPropsEntry::blocking(ssr_props))
        .page(PageEntry::blocking_with_props(page))
}

fn ssr_props(_request: &PageRequest) -> Result<UsernameProps, PageError> {
    Ok(UsernameProps {
        info: "I'm from props!".to_owned(),
    })
}

fn page(props: &UsernameProps) -> Result<Element, PageError> {
    let request = use_request()?;
    let username = request.path_param("username").unwrap_or_default();
    Ok(Element::new("p").text(format!("Hello {username}! ({})", props.info)))
}
