//! Synthetic image served when every real tier misses.

pub const PLACEHOLDER_MIME: &str = "image/svg+xml";

/// Render a diagnostic SVG naming the key that failed to resolve.
///
/// Output depends only on `key`.
pub fn render(key: &str) -> (Vec<u8>, &'static str) {
    let label = if key.is_empty() {
        "(empty key)".to_string()
    } else {
        escape_xml(key)
    };

    let svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="300" viewBox="0 0 400 300"><rect width="400" height="300" fill="#f3f4f6"/><rect x="8" y="8" width="384" height="284" fill="none" stroke="#d1d5db" stroke-width="2" stroke-dasharray="8 6"/><text x="200" y="140" font-family="sans-serif" font-size="18" fill="#6b7280" text-anchor="middle">Image not available</text><text x="200" y="170" font-family="monospace" font-size="12" fill="#9ca3af" text-anchor="middle">{label}</text></svg>"##
    );

    (svg.into_bytes(), PLACEHOLDER_MIME)
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
