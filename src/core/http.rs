use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::{redirect, Client, ClientBuilder};

pub const APP_USER_AGENT: &str = concat!("mcdex/", env!("CARGO_PKG_VERSION"));

/// Redirect hops followed before a fetch fails.
pub const MAX_REDIRECTS: usize = 10;

/// Builder with mcdex's defaults, for callers that need to add to them.
pub fn http_client_builder() -> ClientBuilder {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
}

pub fn build_http_client() -> Result<Client, reqwest::Error> {
    http_client_builder().build()
}
