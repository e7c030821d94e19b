//! Mutable HTML document built on `scraper::Html`.
//!
//! Elements are addressed by their `ego_tree` node id. Lookups walk down from
//! the root element, so subtrees detached by an earlier edit are never found.

use ego_tree::{NodeId, NodeMut};
use scraper::node::{Element, Text};
use scraper::{ElementRef, Html, Node, Selector, StrTendril};
use tracing::debug;

/// A parsed page whose elements can be rewritten in place.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse a full HTML document. Malformed markup is recovered, never rejected.
    pub fn parse(source: &str) -> Self {
        let html = Html::parse_document(source);
        if !html.errors.is_empty() {
            debug!(errors = html.errors.len(), "page parsed with recoverable errors");
        }
        Self { html }
    }

    /// Serialize the document back to HTML, doctype included.
    pub fn to_html(&self) -> String {
        self.html.html()
    }

    /// First element whose `id` attribute equals `id`.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.html
            .root_element()
            .descendent_elements()
            .find(|el| el.value().id() == Some(id))
            .map(|el| el.id())
    }

    /// First element matching `selector`, in document order.
    pub fn select_first(&self, selector: &Selector) -> Option<NodeId> {
        self.html.root_element().select(selector).next().map(|el| el.id())
    }

    /// Every element matching `selector`, in document order.
    pub fn select_all(&self, selector: &Selector) -> Vec<NodeId> {
        self.html
            .root_element()
            .select(selector)
            .map(|el| el.id())
            .collect()
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        self.html
            .tree
            .get(id)
            .and_then(ElementRef::wrap)
            .map(|el| el.text().collect())
            .unwrap_or_default()
    }

    /// Attribute value by name.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<String> {
        self.html
            .tree
            .get(id)
            .and_then(ElementRef::wrap)
            .and_then(|el| el.value().attr(name).map(String::from))
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let Some(mut node) = self.html.tree.get_mut(id) else {
            return;
        };
        clear_children(&mut node);
        node.append(text_node(text));
    }

    /// Replace all children with `<strong>{label}</strong> {value}`.
    pub fn set_labeled_text(&mut self, id: NodeId, label: &str, value: &str) {
        let Some(strong) = strong_element() else {
            return;
        };
        let Some(mut node) = self.html.tree.get_mut(id) else {
            return;
        };
        clear_children(&mut node);
        node.append(Node::Element(strong)).append(text_node(label));
        node.append(text_node(&format!(" {value}")));
    }

    /// Overwrite an attribute the element already carries.
    ///
    /// Returns `false` when the element has no such attribute.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> bool {
        let Some(mut node) = self.html.tree.get_mut(id) else {
            return false;
        };
        let Node::Element(el) = node.value() else {
            return false;
        };
        for (attr_name, attr_value) in el.attrs.iter_mut() {
            if &*attr_name.local == name {
                *attr_value = StrTendril::from(value);
                return true;
            }
        }
        false
    }
}

fn clear_children(node: &mut NodeMut<'_, Node>) {
    while let Some(mut child) = node.first_child() {
        child.detach();
    }
}

fn text_node(text: &str) -> Node {
    Node::Text(Text {
        text: StrTendril::from(text),
    })
}

/// A bare `<strong>` element, taken from a parsed fragment.
fn strong_element() -> Option<Element> {
    let fragment = Html::parse_fragment("<strong></strong>");
    let selector = Selector::parse("strong").ok()?;
    fragment
        .select(&selector)
        .next()
        .map(|el| el.value().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html><html><head><title>t</title></head><body>
<h1 id="hero-title" class="hero big">Старий <em>заголовок</em></h1>
<a href="tel:0000">0000</a>
</body></html>"#;

    fn sel(css: &str) -> Selector {
        Selector::parse(css).unwrap()
    }

    #[test]
    fn lookup_and_text_content() {
        let doc = Document::parse(PAGE);
        let h1 = doc.element_by_id("hero-title").expect("h1");
        assert_eq!(doc.text_content(h1), "Старий заголовок");
        assert_eq!(doc.attr(h1, "class").as_deref(), Some("hero big"));
        assert_eq!(doc.select_first(&sel("h1.big")), Some(h1));
        assert!(doc.element_by_id("missing").is_none());
    }

    #[test]
    fn mutations_serialize() {
        let mut doc = Document::parse(PAGE);
        let h1 = doc.element_by_id("hero-title").unwrap();
        doc.set_text(h1, "Новий <b>текст</b>");

        let link = doc.select_first(&sel("a")).unwrap();
        assert!(doc.set_attr(link, "href", "tel:380441234567"));
        assert!(!doc.set_attr(link, "title", "Phone"));

        let html = doc.to_html();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Новий &lt;b&gt;текст&lt;/b&gt;"));
        assert!(html.contains(r#"href="tel:380441234567""#));
        assert!(!html.contains("title=\"Phone\""));
        assert!(!html.contains("<em>"));
    }

    #[test]
    fn detached_nodes_are_not_selected() {
        let mut doc = Document::parse(PAGE);
        let h1 = doc.element_by_id("hero-title").unwrap();
        assert!(doc.select_first(&sel("em")).is_some());

        doc.set_text(h1, "Новий");
        assert!(doc.select_first(&sel("em")).is_none());
        assert!(doc.select_all(&sel("h1 em")).is_empty());
    }

    #[test]
    fn labeled_text_builds_strong() {
        let mut doc = Document::parse(r#"<div class="contact-info"><p>old</p></div>"#);
        let p = doc.select_first(&sel(".contact-info p")).unwrap();
        doc.set_labeled_text(p, "Адреса:", "м. Київ, вул. Хрещатик, 1");

        assert_eq!(doc.text_content(p), "Адреса: м. Київ, вул. Хрещатик, 1");
        let html = doc.to_html();
        assert!(html.contains("<p><strong>Адреса:</strong> м. Київ, вул. Хрещатик, 1</p>"));

        // Relabelling leaves exactly one <strong> reachable
        doc.set_labeled_text(p, "Адреса:", "м. Львів");
        assert_eq!(doc.select_all(&sel("strong")).len(), 1);
    }

    #[test]
    fn selectors_beyond_simple_compounds() {
        let doc = Document::parse(
            r#"<ul><li class="x">a</li><li>b</li><li>c</li><li>d</li></ul>"#,
        );
        assert_eq!(doc.select_all(&sel("li:nth-child(2n)")).len(), 2);
        assert_eq!(doc.select_all(&sel("ul > li:not(.x)")).len(), 3);
        assert_eq!(doc.select_all(&sel("li:first-of-type")).len(), 1);
    }
}
