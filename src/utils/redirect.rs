// src/utils/redirect.rs

use url::Url;

/// Resolves a post-login `next` target against the current request's host.
///
/// Returns the path (and query) to redirect to when the resolved URL is http(s)
/// and has the same host and port as `host`; anything else, including
/// protocol-relative `//other.host` targets, yields `None`.
pub fn safe_redirect_target(target: &str, host: &str) -> Option<String> {
    let target = target.trim();
    if target.is_empty() || host.is_empty() {
        return None;
    }

    let base = Url::parse(&format!("http://{}/", host)).ok()?;
    let resolved = base.join(target).ok()?;

    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    if resolved.host_str() != base.host_str() || resolved.port() != base.port() {
        return None;
    }

    let mut path = resolved.path().to_string();
    if let Some(query) = resolved.query() {
        path.push('?');
        path.push_str(query);
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "exams.local:3000";

    #[test]
    fn relative_paths_are_kept() {
        assert_eq!(safe_redirect_target("/exam/", HOST).as_deref(), Some("/exam/"));
        assert_eq!(
            safe_redirect_target("/exam/take/4?x=1", HOST).as_deref(),
            Some("/exam/take/4?x=1")
        );
        assert_eq!(safe_redirect_target("exam/", HOST).as_deref(), Some("/exam/"));
    }

    #[test]
    fn same_origin_absolute_urls_are_accepted() {
        assert_eq!(
            safe_redirect_target("http://exams.local:3000/admin/upload", HOST).as_deref(),
            Some("/admin/upload")
        );
    }

    #[test]
    fn foreign_targets_are_rejected() {
        assert_eq!(safe_redirect_target("https://evil.example/phish", HOST), None);
        assert_eq!(safe_redirect_target("//evil.example/phish", HOST), None);
        assert_eq!(safe_redirect_target("http://exams.local:4000/", HOST), None);
        assert_eq!(safe_redirect_target("javascript:alert(1)", HOST), None);
        assert_eq!(safe_redirect_target("", HOST), None);
        assert_eq!(safe_redirect_target("/exam/", ""), None);
    }
}
