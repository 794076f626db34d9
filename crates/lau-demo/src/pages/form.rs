use lau_pages::{Element, FormData, PageEntry, PageError, PageModule, RpcFunction, form, rpc};

pub(crate) fn module() -> PageModule {
    PageModule::new().page(PageEntry::new(|| async { Ok::<_, PageError>(name_form()) }))
}

/// Server function answering the form.
pub(crate) fn on_submit() -> RpcFunction {
    rpc!(submit)
}

async fn submit(form: FormData) -> Result<Element, PageError> {
    let name = form.get("name").filter(|name| !name.is_empty()).unwrap_or("Ren");
    Ok(Element::new("div")
        .child(Element::new("p").text(format!("Hello, {name}!")))
        .child(name_form()))
}

fn name_form() -> Element {
    form(
        on_submit(),
        [
            Element::new("label").attr("for", "name").text("Your name:"),
            Element::new("input")
                .attr("type", "text")
                .attr("id", "name")
                .attr("name", "name")
                .attr("autocomplete", "off"),
            Element::new("input").attr("type", "submit").attr("value", "Submit"),
        ],
    )
}
