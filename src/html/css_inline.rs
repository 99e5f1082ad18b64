//! Moves `<style>` rules into inline `style` attributes.
//!
//! Email clients drop or mangle `<style>` blocks, so every declaration that
//! matches an element is written onto the element itself. Cascade order is
//! `!important`, then inline-over-stylesheet, then selector specificity, then
//! source order. At-rules and pseudo-element selectors cannot be inlined and
//! are discarded together with the `<style>` elements.

use scraper::{ElementRef, Selector};
use tracing::{debug, instrument};

use super::serialize::{ElementAction, NodeFilter, ParsedHtml, attributes};

/// Elements that never receive inline styles.
const UNSTYLED: [&str; 9] = [
  "html", "head", "meta", "title", "link", "base", "script", "style", "noscript",
];

/// Pseudo-classes describing states an inline style cannot express.
const DYNAMIC_PSEUDO: [&str; 7] = [
  ":hover", ":focus", ":active", ":visited", ":before", ":after", ":first-l",
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Declaration {
  pub(crate) property: String,
  pub(crate) value: String,
  pub(crate) important: bool,
}

struct Rule {
  selector: Selector,
  specificity: (u32, u32, u32),
  order: usize,
  declarations: Vec<Declaration>,
}

/// Sort key of one candidate declaration; the greatest wins.
type Rank = (bool, bool, (u32, u32, u32), usize);

/// Inlines every `<style>` rule of `html` and removes the `<style>` elements.
#[instrument(level = "trace", skip(html), fields(bytes = html.len()))]
pub fn inline_css(html: &str) -> String {
  let parsed = ParsedHtml::parse(html);
  let stylesheet = match Selector::parse("style") {
    Ok(sel) => parsed
      .html
      .select(&sel)
      .flat_map(|el| el.text())
      .collect::<Vec<_>>()
      .join("\n"),
    Err(_) => String::new(),
  };
  let rules = parse_stylesheet(&stylesheet);
  debug!(rules = rules.len(), "stylesheet parsed");
  parsed.render(&mut Inliner { rules })
}

struct Inliner {
  rules: Vec<Rule>,
}

impl NodeFilter for Inliner {
  fn element(&mut self, element: ElementRef<'_>) -> ElementAction {
    let name = element.value().name();
    if name == "style" {
      return ElementAction::Drop;
    }
    let mut attrs = attributes(element);
    if UNSTYLED.contains(&name) {
      return ElementAction::Keep(attrs);
    }

    let mut winners: Vec<(Declaration, Rank)> = vec![];
    for rule in self.rules.iter().filter(|r| r.selector.matches(&element)) {
      for decl in &rule.declarations {
        let rank = (decl.important, false, rule.specificity, rule.order);
        offer(&mut winners, decl.clone(), rank);
      }
    }
    if winners.is_empty() {
      return ElementAction::Keep(attrs);
    }
    let inline = attrs
      .iter()
      .find(|(k, _)| k == "style")
      .map(|(_, v)| parse_declarations(v))
      .unwrap_or_default();
    for (i, decl) in inline.into_iter().enumerate() {
      let rank = (decl.important, true, (0, 0, 0), i);
      offer(&mut winners, decl, rank);
    }

    let style = winners
      .iter()
      .map(|(d, _)| format!("{}: {}", d.property, d.value))
      .collect::<Vec<_>>()
      .join("; ");
    match attrs.iter_mut().find(|(k, _)| k == "style") {
      Some((_, v)) => *v = style,
      None => attrs.push(("style".to_string(), style)),
    }
    ElementAction::Keep(attrs)
  }
}

/// Keeps `decl` if it outranks the current winner for its property.
/// First-seen property order is preserved.
fn offer(winners: &mut Vec<(Declaration, Rank)>, decl: Declaration, rank: Rank) {
  match winners.iter_mut().find(|(d, _)| d.property == decl.property) {
    Some(slot) if rank > slot.1 => *slot = (decl, rank),
    Some(_) => {}
    None => winners.push((decl, rank)),
  }
}

fn strip_comments(css: &str) -> String {
  let mut out = String::with_capacity(css.len());
  let mut rest = css;
  while let Some(start) = rest.find("/*") {
    out.push_str(&rest[..start]);
    match rest[start + 2..].find("*/") {
      Some(end) => rest = &rest[start + 2 + end + 2..],
      None => return out,
    }
  }
  out.push_str(rest);
  out
}

/// Index of the `}` closing the block opened just before `from`.
fn block_end(css: &str, from: usize) -> usize {
  let mut depth = 1usize;
  for (i, c) in css[from..].char_indices() {
    match c {
      '{' => depth += 1,
      '}' => {
        depth -= 1;
        if depth == 0 {
          return from + i;
        }
      }
      _ => {}
    }
  }
  css.len()
}

/// Splits `s` on `sep` outside parentheses, brackets and quotes.
pub(crate) fn split_top_level(s: &str, sep: char) -> Vec<&str> {
  let mut parts = vec![];
  let mut depth = 0i32;
  let mut quote: Option<char> = None;
  let mut start = 0;
  for (i, c) in s.char_indices() {
    match (quote, c) {
      (Some(q), c) if c == q => quote = None,
      (Some(_), _) => {}
      (None, '"' | '\'') => quote = Some(c),
      (None, '(' | '[') => depth += 1,
      (None, ')' | ']') => depth -= 1,
      (None, c) if c == sep && depth == 0 => {
        parts.push(&s[start..i]);
        start = i + c.len_utf8();
      }
      _ => {}
    }
  }
  parts.push(&s[start..]);
  parts
}

/// Parses a declaration block body (`color: red; margin: 0 !important`).
pub(crate) fn parse_declarations(block: &str) -> Vec<Declaration> {
  split_top_level(block, ';')
    .into_iter()
    .filter_map(|raw| {
      let (property, value) = raw.split_once(':')?;
      let property = property.trim().to_ascii_lowercase();
      let mut value = value.trim();
      let mut important = false;
      if let Some(idx) = value.to_ascii_lowercase().rfind("!important") {
        if value[idx + "!important".len()..].trim().is_empty() {
          value = value[..idx].trim_end();
          important = true;
        }
      }
      if property.is_empty() || value.is_empty() {
        return None;
      }
      Some(Declaration {
        property,
        value: value.to_string(),
        important,
      })
    })
    .collect()
}

fn parse_stylesheet(css: &str) -> Vec<Rule> {
  let css = strip_comments(css);
  let mut rules = vec![];
  let mut pos = 0;
  let mut order = 0;
  loop {
    let Some(rest) = css.get(pos..) else {
      break;
    };
    let trimmed = rest.trim_start();
    pos += rest.len() - trimmed.len();
    if trimmed.is_empty() {
      break;
    }
    let open = trimmed.find('{');
    if trimmed.starts_with('@') {
      match (trimmed.find(';'), open) {
        (Some(semi), Some(open)) if semi < open => pos += semi + 1,
        (Some(semi), None) => pos += semi + 1,
        (_, Some(open)) => pos = block_end(&css, pos + open + 1) + 1,
        (None, None) => break,
      }
      continue;
    }
    let Some(open) = open else {
      break;
    };
    let prelude = &trimmed[..open];
    let close = block_end(&css, pos + open + 1);
    let declarations = parse_declarations(&css[pos + open + 1..close]);
    for selector_text in split_top_level(prelude, ',') {
      let selector_text = selector_text.trim();
      if selector_text.is_empty() || !inlinable(selector_text) {
        continue;
      }
      let Ok(selector) = Selector::parse(selector_text) else {
        debug!(selector = selector_text, "skipping unparseable selector");
        continue;
      };
      rules.push(Rule {
        selector,
        specificity: specificity(selector_text),
        order,
        declarations: declarations.clone(),
      });
      order += 1;
    }
    pos = close + 1;
  }
  rules
}

fn inlinable(selector: &str) -> bool {
  let lower = selector.to_ascii_lowercase();
  !lower.contains("::") && !DYNAMIC_PSEUDO.iter().any(|p| lower.contains(p))
}

/// `(ids, classes + attributes + pseudo-classes, types)` of a complex selector.
pub(crate) fn specificity(selector: &str) -> (u32, u32, u32) {
  let chars: Vec<char> = selector.chars().collect();
  let (mut a, mut b, mut c) = (0, 0, 0);
  let mut boundary = true;
  let mut i = 0;
  let skip_ident = |mut i: usize| {
    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '-' || chars[i] == '_') {
      i += 1;
    }
    i
  };
  while i < chars.len() {
    let ch = chars[i];
    match ch {
      '#' => {
        a += 1;
        i = skip_ident(i + 1);
        boundary = false;
      }
      '.' => {
        b += 1;
        i = skip_ident(i + 1);
        boundary = false;
      }
      '[' => {
        b += 1;
        while i < chars.len() && chars[i] != ']' {
          i += 1;
        }
        i += 1;
        boundary = false;
      }
      ':' => {
        b += 1;
        i = skip_ident(i + 1);
        if i < chars.len() && chars[i] == '(' {
          let mut depth = 0;
          while i < chars.len() {
            match chars[i] {
              '(' => depth += 1,
              ')' => {
                depth -= 1;
                if depth == 0 {
                  i += 1;
                  break;
                }
              }
              _ => {}
            }
            i += 1;
          }
        }
        boundary = false;
      }
      c_ if c_.is_alphabetic() && boundary => {
        c += 1;
        i = skip_ident(i);
        boundary = false;
      }
      ' ' | '>' | '+' | '~' | '\t' | '\n' => {
        boundary = true;
        i += 1;
      }
      _ => {
        i += 1;
      }
    }
  }
  (a, b, c)
}
