//! reqwest client for the Lavarage lender SDK endpoints
//!
//! Every request carries `x-api-key` and `Content-Type: application/json`.
//! Non-2xx answers become `ApiError::Http`, unreadable bodies `ApiError::Decode`,
//! anything that fails before a response `ApiError::Transport`.

use async_trait::async_trait;
use eyre::{eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::sample::stub_liquidation_proceeds;
use super::types::{LiquidationProceed, Offer, PoolBalance, Position, PositionFilter};
use super::{LenderBackend, LiquidationSource};
use crate::config::Config;
use crate::constants::{ApiEndpoint, HttpMethod};
use crate::error::ApiError;

const API_KEY_HEADER: &str = "x-api-key";

pub struct LenderApi {
    http_client: Client,
    base_url: Url,
    liquidation_source: LiquidationSource,
    stub_delay: Duration,
}

impl LenderApi {
    /// Create a client from config
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| eyre!("Invalid API base URL {}: {}", config.api_base_url, e))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(ref key) = config.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|_| eyre!("LAVARAGE_API_KEY contains invalid header characters"))?;
            headers.insert(API_KEY_HEADER, value);
        } else {
            warn!("LAVARAGE_API_KEY not set - requests will be sent without x-api-key");
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            liquidation_source: config.liquidation_source,
            stub_delay: Duration::from_millis(config.stub_delay_ms),
        })
    }

    /// Absolute URL for an endpoint, keeping any path prefix on the base URL
    pub fn endpoint_url(&self, endpoint: ApiEndpoint, query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        let prefix = self.base_url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}{}", prefix, endpoint.path()));
        url.set_query(None);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        debug!("{} {}", method, url);

        let mut builder = self.http_client.request(method, url);
        if let Some(body) = body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: ApiEndpoint,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint_url(endpoint, query);
        self.request(Method::GET, url, None).await
    }
}

#[async_trait]
impl LenderBackend for LenderApi {
    async fn lender_offers(&self, wallet: &str) -> Result<Vec<Offer>, ApiError> {
        self.get(
            ApiEndpoint::LenderOffers,
            &[("lenderWallet", wallet), ("includeRawData", "true")],
        )
        .await
    }

    async fn lender_positions(
        &self,
        wallet: &str,
        filter: PositionFilter,
    ) -> Result<Vec<Position>, ApiError> {
        self.get(
            ApiEndpoint::LenderPositions,
            &[("lenderWallet", wallet), ("status", filter.as_query())],
        )
        .await
    }

    async fn pool_balance(&self, wallet: &str, quote_token: &str) -> Result<PoolBalance, ApiError> {
        self.get(
            ApiEndpoint::LenderPoolBalance,
            &[("userWallet", wallet), ("quoteToken", quote_token)],
        )
        .await
    }

    async fn liquidation_proceeds(&self, wallet: &str) -> Result<Vec<LiquidationProceed>, ApiError> {
        match self.liquidation_source {
            LiquidationSource::Stub => {
                warn!("Serving STUB liquidation proceeds for {} (no API endpoint)", wallet);
                Ok(stub_liquidation_proceeds(self.stub_delay).await)
            }
            LiquidationSource::Api => {
                self.get(ApiEndpoint::LiquidationProceeds, &[("lenderWallet", wallet)])
                    .await
            }
        }
    }

    async fn mutate(&self, endpoint: ApiEndpoint, body: Value) -> Result<Value, ApiError> {
        let method = match endpoint.method() {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
        };
        let url = self.endpoint_url(endpoint, &[]);
        self.request(method, url, Some(&body)).await
    }

    fn liquidation_source(&self) -> LiquidationSource {
        self.liquidation_source
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{LenderStore, StalePolicy};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accept one connection, answer with `status_line` and `body`, return the raw request
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];

            // Read headers, then as much body as Content-Length announces
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .and_then(|v| v.trim().parse::<usize>().ok())
                        })
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    /// Accept one connection and never answer it
    async fn serve_silent() -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            // Drain the request and hold the socket open until the client hangs up
            while let Ok(n) = socket.read(&mut buf).await {
                if n == 0 {
                    break;
                }
            }
        });

        (format!("http://{}", addr), handle)
    }

    fn api_for(base_url: &str) -> LenderApi {
        let config = Config {
            api_base_url: base_url.to_string(),
            api_key: Some("test-key".to_string()),
            stub_delay_ms: 0,
            ..Config::default()
        };
        LenderApi::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_url_encodes_query() {
        let api = api_for("https://api.lavarage.com");
        let url = api.endpoint_url(
            ApiEndpoint::LenderOffers,
            &[("lenderWallet", "a b&c"), ("includeRawData", "true")],
        );
        assert_eq!(
            url.as_str(),
            "https://api.lavarage.com/api/sdk/v1.0/lender/offers?lenderWallet=a+b%26c&includeRawData=true"
        );
    }

    #[test]
    fn test_endpoint_url_keeps_base_prefix() {
        let api = api_for("https://gateway.example.com/lavarage/");
        let url = api.endpoint_url(ApiEndpoint::Deposit, &[]);
        assert_eq!(
            url.as_str(),
            "https://gateway.example.com/lavarage/api/sdk/v1.0/lender/pools/deposit"
        );
    }

    #[tokio::test]
    async fn test_offers_success_sends_headers_and_decodes() {
        let (base, server) = serve_once(
            "200 OK",
            r#"[{"id":"o1","active":true,"maxExposure":"100","currentExposure":"25"}]"#,
        )
        .await;
        let api = api_for(&base);

        let offers = api.lender_offers("walletA").await.unwrap();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].id, "o1");
        assert_eq!(offers[0].max_exposure_value(), 100.0);

        let request = server.await.unwrap();
        assert!(request.starts_with(
            "GET /api/sdk/v1.0/lender/offers?lenderWallet=walletA&includeRawData=true"
        ));
        let lower = request.to_lowercase();
        assert!(lower.contains("x-api-key: test-key"));
        assert!(lower.contains("content-type: application/json"));
    }

    #[tokio::test]
    async fn test_positions_with_nulls_and_numbers_decode() {
        let (base, server) = serve_once(
            "200 OK",
            r#"[{"id":12,"status":null,"borrowedAmount":1500},{"id":"p2","status":"pending"}]"#,
        )
        .await;
        let api = api_for(&base);

        let positions = api.lender_positions("walletA", PositionFilter::All).await.unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(serde_json::to_value(&positions[0]).unwrap(), json!({ "id": 12, "borrowedAmount": 1500 }));
        assert_eq!(positions[1].status.as_deref(), Some("pending"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_500_maps_to_http_error() {
        let (base, server) = serve_once("500 Internal Server Error", "{}").await;
        let api = api_for(&base);

        let err = api.lender_offers("walletA").await.unwrap_err();
        assert_eq!(err, ApiError::Http { status: 500 });
        assert!(err.to_string().contains("500"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let (base, server) = serve_once("200 OK", r#"{"not":"a list"}"#).await;
        let api = api_for(&base);

        let err = api.lender_positions("walletA", PositionFilter::All).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = api_for(&format!("http://{}", addr));
        let err = api.pool_balance("walletA", "SOL").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[tokio::test]
    async fn test_unanswered_request_times_out_as_transport_error() {
        let (base, server) = serve_silent().await;
        let config = Config {
            api_base_url: base,
            request_timeout_secs: 1,
            ..Config::default()
        };
        let api = LenderApi::new(&config).unwrap();

        let started = std::time::Instant::now();
        let err = api.lender_offers("walletA").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
        server.abort();
    }

    #[tokio::test]
    async fn test_timeout_clears_loading_flag_in_store() {
        let (base, server) = serve_silent().await;
        let config = Config {
            api_base_url: base,
            request_timeout_secs: 1,
            ..Config::default()
        };
        let store = LenderStore::new(
            Arc::new(LenderApi::new(&config).unwrap()),
            StalePolicy::default(),
        );

        store.fetch_offers(Some("walletA")).await;

        let state = store.snapshot().await;
        assert!(!state.loading.offers);
        assert!(state.offers.is_empty());
        assert!(state.error.unwrap().starts_with("Network error"));
        server.abort();
    }

    #[tokio::test]
    async fn test_mutation_uses_endpoint_method_and_body() {
        let (base, server) = serve_once("200 OK", r#"{"transaction":"base64tx"}"#).await;
        let api = api_for(&base);

        let reply = api
            .mutate(ApiEndpoint::ChangeLtv, json!({ "offerId": "o1", "ltv": 0.75 }))
            .await
            .unwrap();
        assert_eq!(reply["transaction"], "base64tx");

        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /api/sdk/v1.0/lender/offers/changeLTV"));
        assert!(request.contains(r#""offerId":"o1""#));
    }

    /// Shared buffer for captured log output
    #[derive(Clone, Default)]
    struct LogCapture(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stub_fetch_warns_once() {
        let capture = LogCapture::default();
        let sink = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let store = LenderStore::new(Arc::new(api_for("http://127.0.0.1:9")), StalePolicy::default());
        store.fetch_liquidation_proceeds(Some("walletA")).await;
        assert_eq!(store.liquidation_proceeds().await.len(), 4);

        let logs = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        let warnings = logs.lines().filter(|l| l.contains("WARN") && l.contains("STUB")).count();
        assert_eq!(warnings, 1, "{}", logs);
    }

    #[tokio::test]
    async fn test_stub_liquidations_are_labelled() {
        let api = api_for("http://127.0.0.1:9");
        assert_eq!(LenderBackend::liquidation_source(&api), LiquidationSource::Stub);

        let proceeds = api.liquidation_proceeds("walletA").await.unwrap();
        assert_eq!(proceeds.len(), 4);
    }
}
