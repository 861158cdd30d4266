use std::cell::OnceCell;
use std::rc::Rc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

use crate::error::GtexError;

thread_local! {
    static SESSION: OnceCell<Rc<Session>> = const { OnceCell::new() };
}

/// Headers the pipelines ask for when they are the first to open the thread's session.
pub const DEFAULT_HEADERS: &[(&str, &str)] = &[("Accept", "text/html")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

impl TextResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP seam the request pipelines are written against.
pub trait Transport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<TextResponse, GtexError>;
}

impl<T: Transport + ?Sized> Transport for Rc<T> {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<TextResponse, GtexError> {
        (**self).get(url, query)
    }
}

/// A blocking client with default headers and query parameters, owned by one thread.
#[derive(Debug)]
pub struct Session {
    client: Client,
    headers: HeaderMap,
    params: Vec<(String, String)>,
}

impl Session {
    pub fn new(
        headers: Option<&[(&str, &str)]>,
        params: Option<&[(&str, &str)]>,
    ) -> Result<Self, GtexError> {
        let mut header_map = HeaderMap::new();
        header_map.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("gtexquery/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GtexError::InvalidHeader(err.to_string()))?,
        );
        for (name, value) in headers.unwrap_or_default() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| GtexError::InvalidHeader(format!("{name}: {err}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| GtexError::InvalidHeader(format!("{name}: {err}")))?;
            header_map.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(header_map.clone())
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| GtexError::Http(err.to_string()))?;

        let params = params
            .unwrap_or_default()
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Ok(Self {
            client,
            headers: header_map,
            params,
        })
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

impl Transport for Session {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<TextResponse, GtexError> {
        let response = self
            .client
            .get(url)
            .query(&self.params)
            .query(query)
            .send()
            .map_err(|err| GtexError::Http(err.to_string()))?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response
            .text()
            .map_err(|err| GtexError::Http(err.to_string()))?;
        Ok(TextResponse { status, url, body })
    }
}

/// Returns the calling thread's session, creating it on first use.
///
/// `headers` and `params` only take effect on the call that creates the session;
/// later calls on the same thread get the cached instance unchanged.
pub fn get_session(
    headers: Option<&[(&str, &str)]>,
    params: Option<&[(&str, &str)]>,
) -> Result<Rc<Session>, GtexError> {
    SESSION.with(|cell| {
        if let Some(session) = cell.get() {
            return Ok(Rc::clone(session));
        }
        let session = Rc::new(Session::new(headers, params)?);
        tracing::debug!(thread = ?std::thread::current().id(), "created thread-local session");
        Ok(Rc::clone(cell.get_or_init(|| session)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_session_has_only_user_agent() {
        let session = get_session(None, None).unwrap();
        assert!(session.params().is_empty());
        assert_eq!(session.headers().len(), 1);
        assert!(session.headers().contains_key(USER_AGENT));
    }

    #[test]
    fn rejects_invalid_header_name() {
        let err = Session::new(Some(&[("bad header", "x")]), None).unwrap_err();
        assert!(matches!(err, GtexError::InvalidHeader(_)));
    }

    #[test]
    fn success_range() {
        let response = TextResponse {
            status: 204,
            url: String::new(),
            body: String::new(),
        };
        assert!(response.is_success());
        let response = TextResponse {
            status: 400,
            ..response
        };
        assert!(!response.is_success());
    }
}
