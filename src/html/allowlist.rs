//! Tags, attributes and URL schemes the sanitizer lets through.

use std::collections::{HashMap, HashSet};

/// Tags whose whole subtree is removed, not just the tags.
pub(crate) const DROP_WITH_CONTENT: [&str; 7] = [
  "script", "style", "iframe", "object", "embed", "noscript", "template",
];

const EMAIL_TAGS: &[&str] = &[
  "html", "head", "body", "meta", "title", "a", "abbr", "b", "big", "blockquote", "br", "caption",
  "center", "code", "col", "colgroup", "div", "em", "font", "h1", "h2", "h3", "h4", "h5", "h6",
  "hr", "i", "img", "li", "ol", "p", "pre", "s", "small", "span", "strike", "strong", "sub", "sup",
  "table", "tbody", "td", "tfoot", "th", "thead", "tr", "tt", "u", "ul",
];

/// Layout and accessibility attributes allowed on every tag.
const GLOBAL_ATTRIBUTES: &[&str] = &[
  "align", "bgcolor", "border", "class", "dir", "height", "id", "lang", "role", "style", "title",
  "valign", "width",
];

const TAG_ATTRIBUTES: &[(&str, &[&str])] = &[
  ("a", &["href", "name", "rel", "target"]),
  ("img", &["alt", "src"]),
  ("table", &["cellpadding", "cellspacing", "summary"]),
  ("td", &["background", "colspan", "nowrap", "rowspan", "scope"]),
  ("th", &["background", "colspan", "nowrap", "rowspan", "scope"]),
  ("col", &["span"]),
  ("colgroup", &["span"]),
  ("font", &["color", "face", "size"]),
  ("meta", &["charset", "content", "name"]),
  ("body", &["background"]),
  ("html", &["xmlns"]),
  ("ol", &["start", "type"]),
  ("ul", &["type"]),
];

const URL_ATTRIBUTES: &[&str] = &["action", "background", "href", "src"];

const URL_SCHEMES: &[&str] = &["http", "https", "mailto", "data"];

/// Sanitizer policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allowlist {
  pub tags: HashSet<String>,
  pub global_attributes: HashSet<String>,
  pub tag_attributes: HashMap<String, HashSet<String>>,
  /// Attributes holding a URL that must pass the scheme check.
  pub url_attributes: HashSet<String>,
  pub url_schemes: HashSet<String>,
  /// Allow every `aria-*` attribute.
  pub aria: bool,
}

fn set(items: &[&str]) -> HashSet<String> {
  items.iter().map(|s| s.to_string()).collect()
}

impl Allowlist {
  /// Table-based email markup: layout, text formatting, links and images.
  pub fn email() -> Self {
    Self {
      tags: set(EMAIL_TAGS),
      global_attributes: set(GLOBAL_ATTRIBUTES),
      tag_attributes: TAG_ATTRIBUTES
        .iter()
        .map(|(tag, attrs)| (tag.to_string(), set(attrs)))
        .collect(),
      url_attributes: set(URL_ATTRIBUTES),
      url_schemes: set(URL_SCHEMES),
      aria: true,
    }
  }

  pub fn allows_tag(&self, tag: &str) -> bool {
    self.tags.contains(tag)
  }

  /// `on*` handlers are refused whatever the lists say.
  pub fn allows_attribute(&self, tag: &str, attribute: &str) -> bool {
    if attribute.starts_with("on") {
      return false;
    }
    (self.aria && attribute.starts_with("aria-"))
      || self.global_attributes.contains(attribute)
      || self
        .tag_attributes
        .get(tag)
        .is_some_and(|attrs| attrs.contains(attribute))
  }

  pub fn is_url_attribute(&self, attribute: &str) -> bool {
    self.url_attributes.contains(attribute)
  }
}

impl Default for Allowlist {
  fn default() -> Self {
    Self::email()
  }
}
