//! Tolerant element tree for OFX statements.
//!
//! Bank exports mix an SGML header with XML-ish bodies where leaf elements are often left
//! unclosed (`<TRNAMT>-100.00` followed directly by `<NAME>`), sometimes with no text at all
//! (`<MEMO>` then `<DTPOSTED>`). Only OFX aggregates may hold child elements. The reader keeps
//! element names and text only; attributes are ignored.

use models::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, Clone)]
struct Node {
    name: String,
    text: Option<String>,
    children: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct OfxDocument {
    nodes: Vec<Node>,
}

/// Borrowed view of one element.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    doc: &'a OfxDocument,
    idx: usize,
}

const ROOT: usize = 0;

impl OfxDocument {
    pub fn parse(content: &str, source_name: &str) -> Result<Self> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);
        reader.config_mut().check_end_names = false;

        let mut nodes = vec![Node {
            name: String::new(),
            text: None,
            children: Vec::new(),
        }];
        let mut stack: Vec<usize> = vec![ROOT];

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_uppercase();
                    close_open_leaf(&nodes, &mut stack);
                    let idx = push_node(&mut nodes, &stack, name);
                    stack.push(idx);
                }
                Ok(Event::Empty(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_uppercase();
                    close_open_leaf(&nodes, &mut stack);
                    push_node(&mut nodes, &stack, name);
                }
                Ok(Event::Text(t)) => {
                    let text = match t.unescape() {
                        Ok(text) => text.into_owned(),
                        Err(_) => String::from_utf8_lossy(&t).into_owned(),
                    };
                    if let Some(&top) = stack.last() {
                        if top != ROOT && !text.is_empty() {
                            nodes[top].text = Some(text);
                        }
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(&top) = stack.last() {
                        if top != ROOT {
                            nodes[top].text = Some(String::from_utf8_lossy(&c).into_owned());
                        }
                    }
                }
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_uppercase();
                    // Pop implicitly closed elements up to and including the matching one.
                    if let Some(pos) = stack.iter().rposition(|&i| i != ROOT && nodes[i].name == name) {
                        stack.truncate(pos);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(Error::format(
                        source_name,
                        format!("malformed OFX at byte {}: {e}", reader.buffer_position()),
                    ))
                }
            }
        }

        Ok(Self { nodes })
    }

    pub fn root(&self) -> Element<'_> {
        Element { doc: self, idx: ROOT }
    }

    /// Every element with the given name, in document order.
    pub fn descendants(&self, name: &str) -> Vec<Element<'_>> {
        self.root().descendants(name)
    }
}

/// Aggregates named outright; the rest are recognised by suffix in [`is_aggregate`].
const AGGREGATES: [&str; 9] = [
    "OFX", "SONRS", "STATUS", "STMTTRN", "CURRENCY", "ORIGCURRENCY", "PAYEE", "FI", "INVTRAN",
];

const AGGREGATE_SUFFIXES: [&str; 7] = ["MSGSRSV1", "TRNRS", "STMTRS", "LIST", "ACCTFROM", "ACCTTO", "BAL"];

/// Elements that hold other elements rather than text.
fn is_aggregate(name: &str) -> bool {
    AGGREGATES.contains(&name) || AGGREGATE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// A new element cannot nest inside a leaf, so an open leaf is an unclosed SGML element,
/// whether or not it received text.
fn close_open_leaf(nodes: &[Node], stack: &mut Vec<usize>) {
    if let Some(&top) = stack.last() {
        if top != ROOT && (nodes[top].text.is_some() || !is_aggregate(&nodes[top].name)) {
            stack.pop();
        }
    }
}

fn push_node(nodes: &mut Vec<Node>, stack: &[usize], name: String) -> usize {
    let idx = nodes.len();
    nodes.push(Node {
        name,
        text: None,
        children: Vec::new(),
    });
    let parent = stack.last().copied().unwrap_or(ROOT);
    nodes[parent].children.push(idx);
    idx
}

impl<'a> Element<'a> {
    fn node(&self) -> &'a Node {
        &self.doc.nodes[self.idx]
    }

    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    pub fn text(&self) -> Option<&'a str> {
        self.node().text.as_deref()
    }

    pub fn children(&self) -> impl Iterator<Item = Element<'a>> + 'a {
        let doc = self.doc;
        self.node()
            .children
            .iter()
            .map(move |&idx| Element { doc, idx })
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<Element<'a>> {
        self.children().find(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// Trimmed, non-empty text of the first direct child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&'a str> {
        self.child(name)
            .and_then(|c| c.text())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn descendants(&self, name: &str) -> Vec<Element<'a>> {
        let mut found = Vec::new();
        let mut pending: Vec<Element<'a>> = self.children().collect();
        pending.reverse();
        while let Some(el) = pending.pop() {
            if el.name().eq_ignore_ascii_case(name) {
                found.push(el);
            }
            let mut children: Vec<Element<'a>> = el.children().collect();
            children.reverse();
            pending.extend(children);
        }
        found
    }
}
