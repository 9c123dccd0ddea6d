//! Load an HTML document into a [`MemoryDom`] using the `scraper` crate's html5ever tree.

use scraper::{ElementRef, Html};

use super::{MemoryDom, NodeId};

pub fn parse_document(source: &str) -> MemoryDom {
    let html = Html::parse_document(source);
    let mut dom = MemoryDom::new();
    let doc = dom.document();
    copy_element(&mut dom, doc, html.root_element());
    dom
}

fn copy_element(dom: &mut MemoryDom, parent: NodeId, el: ElementRef<'_>) {
    let attrs: Vec<(&str, &str)> = el.value().attrs().collect();
    let node = dom.append_element(parent, el.value().name(), &attrs, None);

    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            copy_element(dom, node, child_el);
        } else if let Some(text) = child.value().as_text() {
            let t = dom.create_text(text);
            dom.append_child(node, t);
        }
    }
}
