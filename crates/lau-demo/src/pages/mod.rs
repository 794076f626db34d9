//! Page modules, registered by their path under `src/`.

pub(crate) mod form;
pub(crate) mod greet;
pub(crate) mod index;

use lau_pages::{Element, ErrorHandler, PageError, PageRegistry, use_error, use_request};

pub(crate) fn registry() -> PageRegistry {
    PageRegistry::new()
        .register("pages/index", index::module())
        .register("pages/form", form::module())
        .register("pages/greet/[username]", greet::module())
}

/// Page for unmatched URLs and pages answering 404.
pub(crate) fn not_found() -> ErrorHandler {
    ErrorHandler::new(|| async {
        let error = use_error()?;
        let request = use_request()?;
        Ok::<_, PageError>(
            Element::new("main")
                .child(Element::new("h1").text(error.message.clone()))
                .child(Element::new("p").text(format!("Nothing at {}", request.path())))
                .child(Element::new("a").attr("href", "/").text("Home")),
        )
    })
}
