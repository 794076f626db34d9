use lau_pages::{Element, LayoutEntry, PageEntry, PageError, PageModule};

use crate::visit::VISIT;

const USERS: [&str; 3] = ["ren", "example", "epicgamer"];

pub(crate) fn module() -> PageModule {
    PageModule::new()
        .page(PageEntry::new(page))
        .layout(LayoutEntry::new(layout))
}

async fn page() -> Result<Element, PageError> {
    let visit = VISIT.current()?;
    let links = USERS.iter().map(|user| {
        Element::new("li").child(
            Element::new("a")
                .attr("href", format!("/greet/{user}"))
                .text(*user),
        )
    });

    Ok(Element::new("main")
        .child(Element::new("h1").text("Lau"))
        .child(Element::new("p").text(format!("You are visiting {}", visit.path)))
        .child(Element::new("ul").children(links))
        .child(Element::new("a").attr("href", "/form").text("Say hello")))
}

async fn layout(content: Element) -> Result<Element, PageError> {
    Ok(Element::new("html")
        .child(Element::new("head").child(Element::new("title").text("Lau demo")))
        .child(Element::new("body").child(content)))
}
