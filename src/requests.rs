use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{
    Client, ClientBuilder, StatusCode,
    cookie::{CookieStore, Jar},
    header::HeaderMap,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::{
    config::ClientConfig,
    error::{JournalError, Result},
    routes,
};

/// Ordered query pairs; array parameters repeat their key.
pub type Query = [(&'static str, String)];

#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: String,
}

impl HttpReply {
    pub fn error_for_status(self, url: &Url) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(JournalError::Transport(format!(
                "{url} answered with status {}",
                self.status
            )))
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// The wire underneath the journal client.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: Url, headers: HeaderMap, query: &Query) -> Result<HttpReply>;

    async fn post_json(
        &self,
        url: Url,
        headers: HeaderMap,
        body: &serde_json::Value,
    ) -> Result<HttpReply>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn get(&self, url: Url, headers: HeaderMap, query: &Query) -> Result<HttpReply> {
        (**self).get(url, headers, query).await
    }

    async fn post_json(
        &self,
        url: Url,
        headers: HeaderMap,
        body: &serde_json::Value,
    ) -> Result<HttpReply> {
        (**self).post_json(url, headers, body).await
    }
}

/// A reqwest client carrying the default headers and the cookie jar that
/// holds the authenticated identity.
pub struct Session {
    client: Client,
    jar: Arc<Jar>,
}

impl Session {
    /// Fresh session with the configured headers and no cookies.
    pub fn create_default(config: &ClientConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = ClientBuilder::new()
            .default_headers(config.headers.to_header_map()?)
            .cookie_provider(jar.clone())
            .build()?;
        Ok(Self { client, jar })
    }

    pub async fn login_with_credentials(
        config: &ClientConfig,
        email: &str,
        password: &str,
    ) -> Result<Self> {
        let session = Self::create_default(config)?;
        login(&session, &config.base_url, email, password).await?;
        Ok(session)
    }

    /// Installs the token as the session cookie. Nothing is sent; a stale
    /// token only shows up on the first real fetch.
    pub fn restore_from_token(config: &ClientConfig, token: &str) -> Result<Self> {
        check_token(token)?;
        let session = Self::create_default(config)?;
        let cookie = config.cookie.with_token(token);
        if config.base_url.host_str() != Some(cookie.domain.trim_start_matches('.')) {
            warn!(
                "cookie domain {} doesn't match base url {}, the token may not be sent",
                cookie.domain, config.base_url
            );
        }
        session
            .jar
            .add_cookie_str(&cookie.to_set_cookie(), &config.base_url);
        Ok(session)
    }

    /// The `Cookie` header this session would send to `url`.
    pub fn cookies_for(&self, url: &Url) -> Option<String> {
        self.jar
            .cookies(url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }
}

#[async_trait]
impl Transport for Session {
    async fn get(&self, url: Url, headers: HeaderMap, query: &Query) -> Result<HttpReply> {
        debug!("GET {url} {query:?}");
        let response = self
            .client
            .get(url)
            .headers(headers)
            .query(query)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }

    async fn post_json(
        &self,
        url: Url,
        headers: HeaderMap,
        body: &serde_json::Value,
    ) -> Result<HttpReply> {
        debug!("POST {url}");
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }
}

/// A token must survive as a single cookie value.
fn check_token(token: &str) -> Result<()> {
    let unusable = |c: char| {
        c.is_whitespace() || c.is_control() || matches!(c, ';' | ',' | '"' | '\\')
    };
    if token.is_empty() || token.contains(unusable) {
        return Err(JournalError::Configuration(
            "token can't be used as a cookie value".to_string(),
        ));
    }
    Ok(())
}

pub fn login_body(email: &str, password: &str) -> serde_json::Value {
    json!({
        "type": "email",
        "login": email,
        "activation_code": null,
        "password": password,
        "_isEmpty": false,
    })
}

/// Posts the credentials; cookies set by the answer end up in the
/// transport's jar.
pub async fn login<T: Transport + ?Sized>(
    transport: &T,
    base_url: &Url,
    email: &str,
    password: &str,
) -> Result<()> {
    let route = routes::resolve(routes::LOGIN, base_url)?;
    let reply = transport
        .post_json(route.url.clone(), route.headers, &login_body(email, password))
        .await?;
    check_login_status(reply.status)?;
    info!("logged in as {email}");
    Ok(())
}

pub fn check_login_status(status: StatusCode) -> Result<()> {
    if status.is_client_error() {
        warn!("login rejected with {status}");
        return Err(JournalError::InvalidCredentials {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        return Err(JournalError::Transport(format!(
            "login failed with status {status}"
        )));
    }
    Ok(())
}
