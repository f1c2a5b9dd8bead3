use std::sync::OnceLock;

use regex::{NoExpand, Regex};
use url::Url;

use crate::remote::EnvironmentConfig;

pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Point a plan URL at the live target: keep its path and query, swap the
/// host for `target.base_url`, and replace any embedded base id with the
/// target's own.
pub fn rewrite_url_to_target(raw_url: &str, target: &EnvironmentConfig) -> String {
    let target_base = normalize_base_url(&target.base_url);
    if target_base.is_empty() {
        return raw_url.to_string();
    }

    let mut path = match Url::parse(raw_url) {
        Ok(parsed) => match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        },
        Err(_) if is_absolute(raw_url) || raw_url.starts_with('/') => raw_url.to_string(),
        Err(_) => format!("/{}", raw_url),
    };

    if let Some(base_id) = target.base_id() {
        let replacement = format!("/api/v2/meta/bases/{}", base_id);
        path = base_segment_re()
            .replace(&path, NoExpand(&replacement))
            .into_owned();
    }

    // An absolute URL that failed to parse is passed through untouched.
    if is_absolute(&path) {
        return path;
    }

    format!("{}{}", target_base, path)
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn base_segment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/api/v2/meta/bases/[^/]+").expect("valid regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(base_url: &str, base_id: Option<&str>) -> EnvironmentConfig {
        EnvironmentConfig {
            base_url: base_url.to_string(),
            api_token: "tok".to_string(),
            base_id: base_id.map(str::to_string),
            ..EnvironmentConfig::default()
        }
    }

    #[test]
    fn strips_trailing_slashes() {
        assert_eq!(normalize_base_url("http://noco.test///"), "http://noco.test");
    }

    #[test]
    fn rewrites_host_and_base_id() {
        let url = rewrite_url_to_target(
            "http://old.example:8080/api/v2/meta/bases/pOld/tables",
            &target("https://noco.test/", Some("pNew")),
        );
        assert_eq!(url, "https://noco.test/api/v2/meta/bases/pNew/tables");
    }

    #[test]
    fn keeps_query_string() {
        let url = rewrite_url_to_target(
            "http://old.example/api/v2/meta/bases/p1/tables?includeM2M=true",
            &target("http://noco.test", None),
        );
        assert_eq!(url, "http://noco.test/api/v2/meta/bases/p1/tables?includeM2M=true");
    }

    #[test]
    fn prefixes_relative_paths() {
        let url = rewrite_url_to_target(
            "api/v2/meta/columns/c1",
            &target("http://noco.test", Some("p1")),
        );
        assert_eq!(url, "http://noco.test/api/v2/meta/columns/c1");
    }

    #[test]
    fn leaves_url_alone_without_target_base() {
        let url = rewrite_url_to_target("http://old.example/x", &target("", None));
        assert_eq!(url, "http://old.example/x");
    }
}
