use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use url::Url;

use crate::error::{JournalError, Result};

pub const DEFAULT_BASE_URL: &str = "https://dnevnik2.petersburgedu.ru/";

pub const LOGIN: &str = "/api/user/auth/login";
pub const CHILDREN_LIST: &str = "/api/journal/person/related-child-list";
pub const GROUP_LIST: &str = "/api/journal/group/related-group-list";
pub const PERIOD_LIST: &str = "/api/group/group/get-list-period";
pub const SUBJECT_LIST: &str = "/api/journal/subject/list-studied";
pub const ESTIMATE_TABLE: &str = "/api/journal/estimate/table";

/// Pages the upstream expects each sensitive endpoint to be called from.
/// Requests to these paths without the matching `Referer` get rejected.
pub const REFERERS: [(&str, &str); 5] = [
    (LOGIN, "/login"),
    (CHILDREN_LIST, "/students/my"),
    (GROUP_LIST, "/estimate"),
    (PERIOD_LIST, "/estimate"),
    (SUBJECT_LIST, "/estimate"),
];

#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub url: Url,
    pub headers: HeaderMap,
}

pub fn referer_for(path: &str) -> Option<&'static str> {
    REFERERS
        .iter()
        .find(|(known, _)| *known == path)
        .map(|(_, referer)| *referer)
}

/// Joins `path` onto `base_url` and attaches the `Referer` header when the
/// path is one of the known endpoints.
pub fn resolve(path: &str, base_url: &Url) -> Result<ResolvedRoute> {
    let url = base_url.join(path)?;
    let mut headers = HeaderMap::new();
    if let Some(referer) = referer_for(path) {
        let referer_url = base_url.join(referer)?;
        let value = HeaderValue::from_str(referer_url.as_str())
            .map_err(|_| JournalError::Transport(format!("unusable referer {referer_url}")))?;
        headers.insert(REFERER, value);
    }
    Ok(ResolvedRoute { url, headers })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse(DEFAULT_BASE_URL).unwrap()
    }

    #[test]
    fn known_paths_get_referer() {
        for (path, referer) in REFERERS {
            let route = resolve(path, &base()).unwrap();
            assert_eq!(
                route.url.as_str(),
                format!("https://dnevnik2.petersburgedu.ru{path}")
            );
            assert_eq!(
                route.headers.get(REFERER).unwrap(),
                &format!("https://dnevnik2.petersburgedu.ru{referer}")
            );
        }
    }

    #[test]
    fn unknown_paths_have_no_referer() {
        for path in [ESTIMATE_TABLE, "/api/unknown", "/login"] {
            let route = resolve(path, &base()).unwrap();
            assert!(route.headers.get(REFERER).is_none(), "{path}");
        }
    }

    #[test]
    fn absolute_path_replaces_base_path() {
        let base = Url::parse("http://127.0.0.1:8080/some/prefix/").unwrap();
        let route = resolve(GROUP_LIST, &base).unwrap();
        assert_eq!(
            route.url.as_str(),
            "http://127.0.0.1:8080/api/journal/group/related-group-list"
        );
        assert_eq!(
            route.headers.get(REFERER).unwrap(),
            "http://127.0.0.1:8080/estimate"
        );
    }
}
