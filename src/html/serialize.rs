//! Tree walking and HTML serialization shared by the CSS inliner and the sanitizer.

use scraper::{ElementRef, Html, Node};

/// Elements with no closing tag.
pub(crate) const VOID_ELEMENTS: [&str; 14] = [
  "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
  "track", "wbr",
];

/// Elements whose text children are written unescaped.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// What a pass does with one element.
pub(crate) enum ElementAction {
  /// Write the element with these attributes, then its children.
  Keep(Vec<(String, String)>),
  /// Skip the tags but write the children.
  Unwrap,
  /// Skip the element and everything inside it.
  Drop,
}

/// Per-element decisions of one pass over a parsed document.
pub(crate) trait NodeFilter {
  fn element(&mut self, element: ElementRef<'_>) -> ElementAction;

  fn keep_comments(&self) -> bool {
    false
  }
}

/// Parsed input, remembering whether it was a full document or a fragment.
pub(crate) struct ParsedHtml {
  pub(crate) html: Html,
  fragment: bool,
}

impl ParsedHtml {
  pub(crate) fn parse(source: &str) -> Self {
    let lower = source.trim_start().to_ascii_lowercase();
    if lower.starts_with("<!doctype") || lower.contains("<html") {
      Self {
        html: Html::parse_document(source),
        fragment: false,
      }
    } else {
      Self {
        html: Html::parse_fragment(source),
        fragment: true,
      }
    }
  }

  /// Serializes the tree through `filter`.
  pub(crate) fn render(&self, filter: &mut impl NodeFilter) -> String {
    let mut out = String::new();
    let root = self.html.root_element();
    if self.fragment {
      write_children(&mut out, root, filter);
      return out;
    }
    if self.html.tree.root().children().any(|n| n.value().is_doctype()) {
      out.push_str("<!DOCTYPE html>");
    }
    write_element(&mut out, root, filter);
    out
  }
}

fn write_element(out: &mut String, element: ElementRef<'_>, filter: &mut impl NodeFilter) {
  match filter.element(element) {
    ElementAction::Drop => {}
    ElementAction::Unwrap => write_children(out, element, filter),
    ElementAction::Keep(attrs) => {
      let name = element.value().name();
      write_open_tag(out, name, &attrs);
      if VOID_ELEMENTS.contains(&name) {
        return;
      }
      write_children(out, element, filter);
      out.push_str("</");
      out.push_str(name);
      out.push('>');
    }
  }
}

fn write_children(out: &mut String, parent: ElementRef<'_>, filter: &mut impl NodeFilter) {
  let raw = RAW_TEXT_ELEMENTS.contains(&parent.value().name());
  for child in parent.children() {
    match child.value() {
      Node::Text(text) => {
        if raw {
          out.push_str(text);
        } else {
          escape_text(out, text);
        }
      }
      Node::Comment(comment) if filter.keep_comments() => {
        out.push_str("<!--");
        out.push_str(comment);
        out.push_str("-->");
      }
      Node::Element(_) => {
        if let Some(element) = ElementRef::wrap(child) {
          write_element(out, element, filter);
        }
      }
      _ => {}
    }
  }
}

/// The element's attributes in source order, as owned pairs.
pub(crate) fn attributes(element: ElementRef<'_>) -> Vec<(String, String)> {
  element
    .value()
    .attrs()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub(crate) fn write_open_tag(out: &mut String, name: &str, attrs: &[(String, String)]) {
  out.push('<');
  out.push_str(name);
  for (key, value) in attrs {
    out.push(' ');
    out.push_str(key);
    out.push_str("=\"");
    escape_attr(out, value);
    out.push('"');
  }
  out.push('>');
}

pub(crate) fn escape_text(out: &mut String, text: &str) {
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '\u{a0}' => out.push_str("&nbsp;"),
      _ => out.push(c),
    }
  }
}

pub(crate) fn escape_attr(out: &mut String, value: &str) {
  for c in value.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '"' => out.push_str("&quot;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '\u{a0}' => out.push_str("&nbsp;"),
      _ => out.push(c),
    }
  }
}
