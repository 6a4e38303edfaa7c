use std::{collections::BTreeMap, path::Path};

use anyhow::Context;
use chrono::DateTime;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, de::DeserializeOwned};
use url::Url;

use crate::{
    error::{JournalError, Result},
    routes::DEFAULT_BASE_URL,
};

const BUNDLED_HEADERS: &str = include_str!("../resources/headers.json");
const BUNDLED_COOKIE: &str = include_str!("../resources/cookie.json");

const ENV_PREFIX: &str = "DNEVNIK_";

/// The env vars the runner needs, all prefixed with `DNEVNIK_`.
#[derive(Debug, Deserialize)]
pub struct JournalEnv {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Takes precedence over email/password when set.
    pub token: Option<String>,
    pub headers_path: Option<String>,
    pub cookie_path: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config = envy::prefixed(ENV_PREFIX)
            .from_env::<Self>()
            .context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}

fn read_resource(path: &Path, what: &str) -> Result<String> {
    if !path.exists() {
        return Err(JournalError::Configuration(format!(
            "{what} file {} is missing",
            path.display()
        )));
    }
    std::fs::read_to_string(path).map_err(|err| {
        JournalError::Configuration(format!("couldn't read {what} file {}: {err}", path.display()))
    })
}

/// Static headers sent with every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct DefaultHeaders(pub BTreeMap<String, String>);

impl DefaultHeaders {
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_HEADERS)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&read_resource(path.as_ref(), "headers")?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| JournalError::Configuration(format!("bad headers resource: {err}")))
    }

    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.0.len());
        for (name, value) in &self.0 {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                JournalError::Configuration(format!("invalid header name {name:?}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|_| {
                JournalError::Configuration(format!("invalid value for header {name}"))
            })?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

/// Shape of the session cookie; `value` is replaced by the caller's token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CookieTemplate {
    pub name: String,
    #[serde(default)]
    pub value: String,
    pub domain: String,
    #[serde(default = "root_path")]
    pub path: String,
    /// Unix seconds; `None` makes it a session cookie.
    #[serde(default)]
    pub expires: Option<i64>,
}

fn root_path() -> String {
    "/".to_string()
}

impl CookieTemplate {
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_COOKIE)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&read_resource(path.as_ref(), "cookie")?)
    }

    /// Reads the first element of a JSON array of cookies.
    pub fn from_json(json: &str) -> Result<Self> {
        let cookies: Vec<CookieTemplate> = serde_json::from_str(json)
            .map_err(|err| JournalError::Configuration(format!("bad cookie resource: {err}")))?;
        cookies
            .into_iter()
            .next()
            .ok_or_else(|| JournalError::Configuration("cookie resource is empty".to_string()))
    }

    pub fn with_token(&self, token: &str) -> Self {
        Self {
            value: token.to_string(),
            ..self.clone()
        }
    }

    /// Renders the cookie as a `Set-Cookie` header value.
    pub fn to_set_cookie(&self) -> String {
        let mut cookie = format!(
            "{}={}; Domain={}; Path={}",
            self.name, self.value, self.domain, self.path
        );
        if let Some(expires) = self.expires.and_then(|secs| DateTime::from_timestamp(secs, 0)) {
            cookie.push_str(&expires.format("; Expires=%a, %d %b %Y %H:%M:%S GMT").to_string());
        }
        cookie
    }
}

/// Everything a session needs before it talks to the journal.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub headers: DefaultHeaders,
    pub cookie: CookieTemplate,
}

impl ClientConfig {
    pub fn bundled() -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(DEFAULT_BASE_URL)?,
            headers: DefaultHeaders::bundled()?,
            cookie: CookieTemplate::bundled()?,
        })
    }

    pub fn from_env(env: &JournalEnv) -> Result<Self> {
        let headers = match &env.headers_path {
            Some(path) => DefaultHeaders::from_path(path)?,
            None => DefaultHeaders::bundled()?,
        };
        let cookie = match &env.cookie_path {
            Some(path) => CookieTemplate::from_path(path)?,
            None => CookieTemplate::bundled()?,
        };
        let base_url = Url::parse(&env.base_url).map_err(|err| {
            JournalError::Configuration(format!("invalid base url {}: {err}", env.base_url))
        })?;
        Ok(Self {
            base_url,
            headers,
            cookie,
        })
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }
}
