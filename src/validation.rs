//! Field validation at the boundary where a stage accepts model-extracted or
//! human-supplied data.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::instrument;
use url::Url;

use crate::error::StageError;
use crate::types::CollectedInputs;

/// Schemes accepted for reference links, images and logos.
const LINK_SCHEMES: [&str; 2] = ["http", "https"];

/// CSS named colors, sorted for binary search.
pub(crate) const NAMED_COLORS: [&str; 148] = [
  "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
  "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
  "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue", "darkcyan",
  "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki", "darkmagenta",
  "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon", "darkseagreen",
  "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise", "darkviolet", "deeppink",
  "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick", "floralwhite", "forestgreen",
  "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod", "gray", "green", "greenyellow",
  "grey", "honeydew", "hotpink", "indianred", "indigo", "ivory", "khaki", "lavender",
  "lavenderblush", "lawngreen", "lemonchiffon", "lightblue", "lightcoral", "lightcyan",
  "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey", "lightpink", "lightsalmon",
  "lightseagreen", "lightskyblue", "lightslategray", "lightslategrey", "lightsteelblue",
  "lightyellow", "lime", "limegreen", "linen", "magenta", "maroon", "mediumaquamarine",
  "mediumblue", "mediumorchid", "mediumpurple", "mediumseagreen", "mediumslateblue",
  "mediumspringgreen", "mediumturquoise", "mediumvioletred", "midnightblue", "mintcream",
  "mistyrose", "moccasin", "navajowhite", "navy", "oldlace", "olive", "olivedrab", "orange",
  "orangered", "orchid", "palegoldenrod", "palegreen", "paleturquoise", "palevioletred",
  "papayawhip", "peachpuff", "peru", "pink", "plum", "powderblue", "purple", "rebeccapurple",
  "red", "rosybrown", "royalblue", "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell",
  "sienna", "silver", "skyblue", "slateblue", "slategray", "slategrey", "snow", "springgreen",
  "steelblue", "tan", "teal", "thistle", "tomato", "turquoise", "violet", "wheat", "white",
  "whitesmoke", "yellow", "yellowgreen",
];

static COLOR: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?ix)^(
      \#[0-9a-f]{3,4} | \#[0-9a-f]{6} | \#[0-9a-f]{8}
      | rgba?\(\s*\d{1,3}%?\s*,\s*\d{1,3}%?\s*,\s*\d{1,3}%?\s*(,\s*(0|1|0?\.\d+)\s*)?\)
    )$",
  )
  .expect("color pattern is a valid regex")
});

/// Parses `raw` as an absolute http(s) URL.
pub fn validate_url(field: &str, raw: &str) -> Result<Url, StageError> {
  let url = Url::parse(raw.trim())
    .map_err(|e| StageError::Validation(format!("{field}: {raw:?} is not a valid url ({e})")))?;
  if !LINK_SCHEMES.contains(&url.scheme()) {
    return Err(StageError::Validation(format!(
      "{field}: scheme {:?} is not allowed",
      url.scheme()
    )));
  }
  if url.host_str().is_none_or(str::is_empty) {
    return Err(StageError::Validation(format!("{field}: {raw:?} has no host")));
  }
  Ok(url)
}

/// Hex (`#abc`, `#aabbcc`, `#aabbccdd`), `rgb()`/`rgba()`, a CSS named
/// color, `transparent` or `currentcolor`.
pub fn is_color(raw: &str) -> bool {
  let raw = raw.trim();
  if COLOR.is_match(raw) {
    return true;
  }
  let name = raw.to_ascii_lowercase();
  matches!(name.as_str(), "transparent" | "currentcolor")
    || NAMED_COLORS.binary_search(&name.as_str()).is_ok()
}

/// Checks every present field of an extracted or caller-supplied input set.
#[instrument(level = "trace", skip(inputs))]
pub fn validate_inputs(inputs: &CollectedInputs) -> Result<(), StageError> {
  for (i, raw) in inputs.urls.iter().flatten().enumerate() {
    validate_url(&format!("urls[{i}]"), raw)?;
  }
  for (i, image) in inputs.images.iter().flatten().enumerate() {
    validate_url(&format!("images[{i}].url"), &image.url)?;
  }
  if let Some(style) = &inputs.brand_style {
    if let Some(logo) = style.logo_url.as_deref().filter(|l| !l.trim().is_empty()) {
      validate_url("brandStyle.logoUrl", logo)?;
    }
    if let Some(bad) = style.palette.iter().find(|c| !is_color(c)) {
      return Err(StageError::Validation(format!(
        "brandStyle.palette: {bad:?} is not a color"
      )));
    }
    if style.fonts.iter().any(|f| f.trim().is_empty()) {
      return Err(StageError::Validation(
        "brandStyle.fonts: empty font name".to_string(),
      ));
    }
  }
  Ok(())
}
