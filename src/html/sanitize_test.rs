//! Tests for `sanitize_html`.

use super::allowlist::Allowlist;
use super::sanitize::{safe_url, sanitize_html};

fn clean(html: &str) -> String {
  sanitize_html(html, &Allowlist::email())
}

#[test]
fn strips_script_and_handlers_keeps_image() {
  let out = clean(
    r#"<p>Hi</p><script>alert(1)</script><img src="https://cdn.example/a.png" alt="Panel" onclick="steal()">"#,
  );
  assert!(!out.contains("<script"), "{out}");
  assert!(!out.contains("alert"), "{out}");
  assert!(!out.contains("onclick"), "{out}");
  assert!(out.contains(r#"src="https://cdn.example/a.png""#), "{out}");
  assert!(out.contains(r#"alt="Panel""#), "{out}");
}

#[test]
fn drops_dangerous_containers_with_content() {
  let out = clean("<div>a<iframe src=\"https://x\">frame</iframe><noscript>n</noscript><style>p{}</style>b</div>");
  assert_eq!(out, "<div>ab</div>");
}

#[test]
fn unwraps_unknown_tags() {
  assert_eq!(clean("<section><b>x</b></section>"), "<b>x</b>");
  assert_eq!(clean("<form action=\"/s\"><p>y</p></form>"), "<p>y</p>");
}

#[test]
fn comments_are_dropped() {
  assert_eq!(clean("<p>a<!-- secret -->b</p>"), "<p>ab</p>");
}

#[test]
fn javascript_links_lose_href_and_targets_get_rel() {
  let out = clean(r#"<a href="javascript:alert(1)" target="_blank">x</a>"#);
  assert_eq!(out, r#"<a target="_blank" rel="noopener noreferrer">x</a>"#);
  let out = clean(r#"<a href="java&#9;script:alert(1)">x</a>"#);
  assert_eq!(out, "<a>x</a>");
}

#[test]
fn url_schemes() {
  let allow = Allowlist::email();
  assert!(safe_url("https://example.com", "a", "href", &allow));
  assert!(safe_url("mailto:hi@example.com", "a", "href", &allow));
  assert!(safe_url("/relative/path?a=b:c", "a", "href", &allow));
  assert!(safe_url("data:image/png;base64,AAAA", "img", "src", &allow));
  assert!(!safe_url("data:text/html,<script>", "a", "href", &allow));
  assert!(!safe_url("vbscript:msgbox", "a", "href", &allow));
  assert!(!safe_url(" JaVaScRiPt:alert(1)", "img", "src", &allow));
}

#[test]
fn unsafe_styles_are_dropped() {
  let out = clean(r#"<p style="width: expression(alert(1))">a</p><p style="color: red">b</p>"#);
  assert_eq!(out, r#"<p>a</p><p style="color: red">b</p>"#);
}

#[test]
fn text_stays_escaped() {
  assert_eq!(clean("<p>1 &lt; 2 &amp; 3</p>"), "<p>1 &lt; 2 &amp; 3</p>");
}

#[test]
fn full_document_keeps_email_skeleton() {
  let out = clean(
    "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>T</title></head><body><table><tr><td align=\"center\">x</td></tr></table></body></html>",
  );
  assert!(out.starts_with("<!DOCTYPE html><html><head>"), "{out}");
  assert!(out.contains(r#"<meta charset="utf-8">"#), "{out}");
  assert!(out.contains(r#"<td align="center">x</td>"#), "{out}");
  assert!(out.ends_with("</body></html>"), "{out}");
}

#[test]
fn aria_and_custom_lists() {
  let mut allow = Allowlist::email();
  let out = sanitize_html(r#"<span aria-label="x" data-id="1">s</span>"#, &allow);
  assert_eq!(out, r#"<span aria-label="x">s</span>"#);
  allow.tags.remove("span");
  assert_eq!(sanitize_html("<span>s</span>", &allow), "s");
}
