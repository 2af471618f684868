//! Outbound HTTP seam used by the dispatcher.

use crate::error::BoxError;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper_tls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;

/// Performs one push request and reports the push service's status code.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, request: Request<Vec<u8>>) -> Result<StatusCode, BoxError>;
}

/// [`PushTransport`] over a pooled hyper client with TLS.
#[derive(Clone, Debug)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    timeout: Duration,
}

impl HyperTransport {
    /// Creates a transport giving up on requests after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpsConnector::new());
        Self { client, timeout }
    }
}

#[async_trait]
impl PushTransport for HyperTransport {
    async fn send(&self, request: Request<Vec<u8>>) -> Result<StatusCode, BoxError> {
        let request = request.map(|body| Full::new(Bytes::from(body)));
        let response: Response<Incoming> =
            tokio::time::timeout(self.timeout, self.client.request(request)).await??;
        Ok(response.status())
    }
}
