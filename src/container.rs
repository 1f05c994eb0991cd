use crate::inline_style::InlineStyle;
use crate::position::Position;
use crate::types::{Edges, Px};
use kuchiki::NodeRef;

/// A unit of content images are placed between.
#[derive(Debug, Clone)]
pub enum Chunk {
    Word(String),
    Node(NodeRef),
}

/// An element hidden for the duration of a pass.
///
/// Remembers the inline `display` it had so that revealing it restores the
/// author's value instead of forcing a default.
#[derive(Debug, Clone)]
pub struct Hidden {
    pub node: NodeRef,
    previous_display: Option<String>,
}

impl Hidden {
    pub fn hide(node: NodeRef) -> Self {
        let mut style = InlineStyle::of(&node);
        let previous_display = style.get("display").map(str::to_string);
        style.set("display", "none");
        style.write_to(&node);
        Self {
            node,
            previous_display,
        }
    }

    pub fn reveal(&self) {
        let mut style = InlineStyle::of(&self.node);
        match self.previous_display.as_deref() {
            Some(value) if !value.trim().eq_ignore_ascii_case("none") => {
                style.set("display", value)
            }
            _ => {
                style.remove("display");
            }
        }
        style.write_to(&self.node);
    }
}

/// Outcome of running a selector: invalid selectors match nothing.
pub enum SelectOutcome {
    Matched(Vec<NodeRef>),
    Invalid,
}

impl SelectOutcome {
    pub fn into_nodes(self) -> Vec<NodeRef> {
        match self {
            SelectOutcome::Matched(nodes) => nodes,
            SelectOutcome::Invalid => Vec::new(),
        }
    }
}

/// DOM operations on the element being laid out.
pub struct Container {
    node: NodeRef,
}

impl Container {
    pub fn new(node: NodeRef) -> Self {
        Self { node }
    }

    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// Elements below the container matching `selector`, in document order.
    pub fn select(&self, selector: &str) -> SelectOutcome {
        let selector = selector.trim();
        if selector.is_empty() {
            return SelectOutcome::Matched(Vec::new());
        }
        match self.node.select(selector) {
            Ok(matches) => SelectOutcome::Matched(
                matches
                    .map(|m| m.as_node().clone())
                    .filter(|node| *node != self.node)
                    .collect(),
            ),
            Err(()) => SelectOutcome::Invalid,
        }
    }

    /// Whitespace separated words of the container's text.
    pub fn words(&self) -> Vec<String> {
        self.node
            .text_contents()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    pub fn clear(&self) {
        let children: Vec<NodeRef> = self.node.children().collect();
        for child in children {
            child.detach();
        }
    }

    pub fn append_word(&self, word: &str) {
        self.node.append(NodeRef::new_text(format!("{word} ")));
    }

    pub fn append(&self, node: &NodeRef) {
        node.detach();
        self.node.append(node.clone());
    }

    pub fn insert_before(&self, anchor: &NodeRef, node: &NodeRef) {
        node.detach();
        anchor.insert_before(node.clone());
    }

    /// Force `min-height: 0`, returning the inline value to restore later.
    pub fn suspend_min_height(&self) -> Option<String> {
        let mut style = InlineStyle::of(&self.node);
        let previous = style.get("min-height").map(str::to_string);
        style.set("min-height", "0");
        style.write_to(&self.node);
        previous
    }

    pub fn restore_min_height(&self, previous: Option<&str>) {
        let mut style = InlineStyle::of(&self.node);
        match previous {
            Some(value) => style.set("min-height", value),
            None => {
                style.remove("min-height");
            }
        }
        style.write_to(&self.node);
    }
}

/// Apply float and padding for `position` to an image about to be placed.
pub fn style_image(image: &NodeRef, position: Position, padding: Px, first_chunk: bool) -> Edges {
    let edges = position.padding(padding, first_chunk);
    let mut style = InlineStyle::of(image);
    style.remove("padding-top");
    style.remove("padding-right");
    style.remove("padding-bottom");
    style.remove("padding-left");
    style.set("padding", &edges.css());
    match position.float_value() {
        Some(side) => style.set("float", side),
        None => {
            style.remove("float");
        }
    }
    style.write_to(image);
    edges
}
