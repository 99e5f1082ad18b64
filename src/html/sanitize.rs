//! Allow-list HTML sanitizer for model-generated email markup.

use scraper::ElementRef;
use tracing::{debug, instrument};

use super::allowlist::{Allowlist, DROP_WITH_CONTENT};
use super::serialize::{ElementAction, NodeFilter, ParsedHtml};

const UNSAFE_STYLE: [&str; 4] = ["expression(", "javascript:", "vbscript:", "behavior:"];

/// Removes everything `allowlist` does not permit from `html`.
#[instrument(level = "trace", skip(html, allowlist), fields(bytes = html.len()))]
pub fn sanitize_html(html: &str, allowlist: &Allowlist) -> String {
  let parsed = ParsedHtml::parse(html);
  let mut sanitizer = Sanitizer {
    allowlist,
    removed: 0,
  };
  let out = parsed.render(&mut sanitizer);
  if sanitizer.removed > 0 {
    debug!(removed = sanitizer.removed, "sanitizer removed markup");
  }
  out
}

struct Sanitizer<'a> {
  allowlist: &'a Allowlist,
  removed: usize,
}

impl NodeFilter for Sanitizer<'_> {
  fn element(&mut self, element: ElementRef<'_>) -> ElementAction {
    let tag = element.value().name();
    if DROP_WITH_CONTENT.contains(&tag) {
      self.removed += 1;
      return ElementAction::Drop;
    }
    if !self.allowlist.allows_tag(tag) {
      self.removed += 1;
      return ElementAction::Unwrap;
    }
    let mut attrs = vec![];
    for (name, value) in element.value().attrs() {
      if self.keep_attribute(tag, name, value) {
        attrs.push((name.to_string(), value.to_string()));
      } else {
        self.removed += 1;
      }
    }
    if tag == "a" && attrs.iter().any(|(k, _)| k == "target") {
      attrs.retain(|(k, _)| k != "rel");
      attrs.push(("rel".to_string(), "noopener noreferrer".to_string()));
    }
    ElementAction::Keep(attrs)
  }
}

impl Sanitizer<'_> {
  fn keep_attribute(&self, tag: &str, name: &str, value: &str) -> bool {
    if !self.allowlist.allows_attribute(tag, name) {
      return false;
    }
    if name == "style" {
      return safe_style(value);
    }
    if self.allowlist.is_url_attribute(name) {
      return safe_url(value, tag, name, self.allowlist);
    }
    true
  }
}

/// Lowercased with whitespace and control characters removed, the way
/// browsers read schemes and CSS function names.
fn squash(value: &str) -> String {
  value
    .chars()
    .filter(|c| !c.is_whitespace() && !c.is_control())
    .flat_map(char::to_lowercase)
    .collect()
}

fn safe_style(value: &str) -> bool {
  let squashed = squash(value);
  !UNSAFE_STYLE.iter().any(|bad| squashed.contains(bad))
}

/// Relative URLs pass; absolute ones need an allowed scheme.
/// `data:` is only accepted for images on `img[src]`.
pub(crate) fn safe_url(value: &str, tag: &str, attribute: &str, allowlist: &Allowlist) -> bool {
  let squashed = squash(value);
  let Some(colon) = squashed.find(':') else {
    return true;
  };
  if squashed[..colon].contains(['/', '?', '#']) {
    return true;
  }
  let scheme = &squashed[..colon];
  if !allowlist.url_schemes.contains(scheme) {
    return false;
  }
  if scheme == "data" {
    return tag == "img" && attribute == "src" && squashed.starts_with("data:image/");
  }
  true
}
