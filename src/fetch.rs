//! Data transport
//!
//! The controller only needs "give me the JSON at this url". Browsers get
//! [`GlooFetcher`]; tests and headless hosts plug in their own [`Fetcher`].

use futures::future::LocalBoxFuture;
use serde_json::Value;

use crate::error::Result;
use crate::models::options::RequestInit;

/// Capability to retrieve a JSON document
pub trait Fetcher {
    /// Request `url` and parse the response body as JSON. Transport and
    /// parse failures are reported as `ChartisanError::Network`.
    fn fetch(&self, url: &str, request: &RequestInit) -> LocalBoxFuture<'static, Result<Value>>;
}

#[cfg(target_arch = "wasm32")]
pub use self::gloo::GlooFetcher;

#[cfg(target_arch = "wasm32")]
mod gloo {
    use futures::future::{FutureExt, LocalBoxFuture};
    use gloo_net::http::{Method, RequestBuilder};
    use serde_json::Value;

    use super::Fetcher;
    use crate::error::{ChartisanError, Result};
    use crate::models::options::RequestInit;

    fn network(err: impl std::fmt::Display) -> ChartisanError {
        ChartisanError::Network(err.to_string())
    }

    /// Browser `fetch` through gloo-net
    #[derive(Debug, Clone, Copy, Default)]
    pub struct GlooFetcher;

    impl Fetcher for GlooFetcher {
        fn fetch(&self, url: &str, request: &RequestInit) -> LocalBoxFuture<'static, Result<Value>> {
            let url = url.to_string();
            let request = request.clone();
            async move {
                let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
                    .map_err(network)?;
                let mut builder = RequestBuilder::new(&url).method(method);
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                let prepared = match request.body {
                    Some(body) => builder.body(body),
                    None => builder.build(),
                }
                .map_err(network)?;

                log::debug!("fetching chart data from {}", url);
                let response = prepared.send().await.map_err(network)?;
                if !response.ok() {
                    return Err(ChartisanError::Network(format!(
                        "{} {} ({})",
                        response.status(),
                        response.status_text(),
                        url
                    )));
                }
                response.json::<Value>().await.map_err(network)
            }
            .boxed_local()
        }
    }
}
