//! Deterministic post-processing of model-generated email HTML.
//!
//! [inline_css] runs first, then [sanitize_html]; the sanitizer is the last
//! thing to touch markup before it is stored as `finalHtml`.

mod allowlist;
mod css_inline;
mod sanitize;
#[cfg(test)]
mod sanitize_test;
mod serialize;

pub use allowlist::Allowlist;
pub use css_inline::inline_css;
pub use sanitize::sanitize_html;
