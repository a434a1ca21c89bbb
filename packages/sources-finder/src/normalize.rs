//! URL normalization and the "same site" relation used for duplicate detection.
//!
//! Every URL coming out of the search step is normalized before it is
//! compared with anything in the catalogue.

use url::Url;

/// Query parameters that only carry tracking information.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "msclkid", "mc_cid", "mc_eid"];

/// Index documents that servers usually serve for the bare directory.
const INDEX_FILES: &[&str] = &["index.html", "index.htm", "index.php"];

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

/// Normalize a URL for storage and comparison.
///
/// Lower-cases scheme and host, drops the fragment and tracking
/// parameters. Returns `None` for unparseable or non-HTTP(S) URLs.
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);

    if let Some(query) = url.query() {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let kept: Vec<&(String, String)> =
            pairs.iter().filter(|(k, _)| !is_tracking_param(k)).collect();

        if query.is_empty() || kept.is_empty() {
            url.set_query(None);
        } else if kept.len() != pairs.len() {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }

    Some(url.to_string())
}

/// Key identifying the logical site behind a URL.
///
/// Ignores the scheme, a leading `www.`, a trailing slash and a trailing
/// index document, so `http://www.x.org/papers/` and
/// `https://x.org/papers/index.html` share a key.
pub fn site_key(raw: &str) -> Option<String> {
    let normalized = normalize_url(raw)?;
    let url = Url::parse(&normalized).ok()?;

    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

    let mut path = url.path().to_lowercase();
    for index in INDEX_FILES {
        if let Some(stripped) = path.strip_suffix(index) {
            path = stripped.to_string();
            break;
        }
    }
    let path = path.trim_end_matches('/');

    let mut key = host;
    if let Some(port) = url.port() {
        key.push_str(&format!(":{}", port));
    }
    key.push_str(path);
    if let Some(query) = url.query() {
        key.push('?');
        key.push_str(query);
    }
    Some(key)
}

/// Whether two URLs point at the same logical site.
pub fn same_site(a: &str, b: &str) -> bool {
    match (site_key(a), site_key(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_case_and_fragment() {
        assert_eq!(
            normalize_url("HTTPS://Example.COM/Papers#recent").as_deref(),
            Some("https://example.com/Papers")
        );
    }

    #[test]
    fn test_normalize_strips_tracking_params() {
        assert_eq!(
            normalize_url("https://a.org/papers?utm_source=x&page=2&fbclid=abc").as_deref(),
            Some("https://a.org/papers?page=2")
        );
        assert_eq!(
            normalize_url("https://a.org/papers?utm_source=x").as_deref(),
            Some("https://a.org/papers")
        );
        assert_eq!(
            normalize_url("https://a.org/profile.cfm?faculty_id=4884").as_deref(),
            Some("https://a.org/profile.cfm?faculty_id=4884")
        );
    }

    #[test]
    fn test_normalize_rejects_other_schemes() {
        assert!(normalize_url("ftp://a.org/file").is_none());
        assert!(normalize_url("not a url").is_none());
    }

    #[test]
    fn test_same_site_across_scheme_and_www() {
        assert!(same_site(
            "http://www.umsu.de/papers/",
            "https://umsu.de/papers"
        ));
        assert!(same_site(
            "https://umsu.de/papers/index.html",
            "https://umsu.de/papers/"
        ));
        assert!(!same_site("https://umsu.de/papers", "https://umsu.de/cv"));
        assert!(!same_site("https://a.org/p?id=1", "https://a.org/p?id=2"));
    }
}
