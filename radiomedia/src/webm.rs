//! Page wrapping a random webm in a looping video

use crate::error::Result;
use crate::library::random_file_matching;
use std::path::Path;

const WEBM_SUFFIX: &str = ".webm";

pub async fn random_webm(dir: &Path) -> Result<String> {
    random_file_matching(dir, |name| name.ends_with(WEBM_SUFFIX)).await
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// HTML page playing `/webms/{name}`, titled after the file name
pub fn render_webm_page(name: &str) -> String {
    let title = escape_html(name.strip_suffix(WEBM_SUFFIX).unwrap_or(name));
    let name = escape_html(name);
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>{title}</title>
    <meta charset="UTF-8">
    <link rel="stylesheet" type="text/css" href="/webm.css">
  </head>
  <body>
    <a href="/webms/{name}">
      <video autoplay loop src="/webms/{name}">
        Your browser does not support HTML5 video.
      </video>
    </a>
  </body>
</html>
"#
    )
}
