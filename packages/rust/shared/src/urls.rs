//! Base-URL reduction used as the deduplication key for candidate entities.

use url::Url;

/// Reduce a URL to `scheme://host[:port]`, dropping credentials, path, query,
/// and fragment.
///
/// Links that do not parse as absolute URLs with a host are cut at the first
/// `/`, `?`, or `#` after the authority instead. The result is idempotent:
/// `strip_base_url(&strip_base_url(u)) == strip_base_url(u)`.
pub fn strip_base_url(link: &str) -> String {
    let link = link.trim();

    if let Ok(url) = Url::parse(link) {
        if let Some(host) = url.host_str() {
            return match url.port() {
                Some(port) => format!("{}://{host}:{port}", url.scheme()),
                None => format!("{}://{host}", url.scheme()),
            };
        }
    }

    let (prefix, rest) = match link.find("://") {
        Some(idx) => link.split_at(idx + 3),
        None => ("", link),
    };
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    format!("{prefix}{}", &rest[..end])
}
