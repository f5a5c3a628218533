//! Embed URL normalization

use url::Url;

/// Normalize a candidate embed URL.
///
/// Unescapes JSON-style `\/` and `&amp;`, rewrites protocol-relative URLs to
/// https, and returns `None` unless the result is an absolute http(s) URL
/// with a host.
pub fn normalize_embed_url(raw: &str) -> Option<String> {
    let unescaped = raw
        .trim()
        .replace("\\/", "/")
        .replace("&amp;", "&");
    let unescaped = unescaped.trim_end_matches('\\');

    let candidate = match unescaped.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => unescaped.to_string(),
    };

    let url = Url::parse(&candidate).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.host_str()?;
    Some(url.into())
}
