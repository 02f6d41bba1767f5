//! Rewards API adapter (point lookup over HTTP).
//!
//! Implements `xpbot_core::ports::RewardsPort` on top of
//! `GET {base}/api/point/user/{address}`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use xpbot_core::{
    errors::Error,
    ports::RewardsPort,
    rewards::{parse_point_response, QueryError, XpResult},
    Result,
};

#[derive(Clone, Debug)]
pub struct RewardsClient {
    base_url: reqwest::Url,
    http: reqwest::Client,
}

impl RewardsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = reqwest::Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid rewards API url {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "rewards API url cannot be a base: {base_url}"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("rewards http client build failed: {e}")))?;

        Ok(Self { base_url, http })
    }

    /// Lookup URL for an address; the address is encoded as one path segment.
    pub fn point_url(&self, address: &str) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "point", "user", address]);
        }
        url
    }

    async fn fetch(&self, address: &str) -> std::result::Result<String, QueryError> {
        let url = self.point_url(address);
        debug!(%url, "rewards lookup");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(QueryError::Status(status.as_u16()));
        }

        resp.text()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))
    }
}

#[async_trait]
impl RewardsPort for RewardsClient {
    async fn get_xp(&self, address: &str) -> XpResult {
        match self.fetch(address).await {
            Ok(body) => parse_point_response(&body),
            Err(e) => XpResult::QueryError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    fn client(base: &str) -> RewardsClient {
        RewardsClient::new(base, Duration::from_secs(5)).unwrap()
    }

    /// One-shot HTTP server on loopback. Answers the first request with
    /// `status` and `body`, and hands back the raw request head.
    async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = sock.read(&mut buf).await.unwrap();
            sock.write_all(response.as_bytes()).await.unwrap();
            let _ = sock.shutdown().await;
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });
        (base, handle)
    }

    #[test]
    fn builds_lookup_url() {
        let c = client("https://be-express-lime.vercel.app");
        assert_eq!(
            c.point_url("0xAbC123").as_str(),
            "https://be-express-lime.vercel.app/api/point/user/0xAbC123"
        );

        let c = client("http://localhost:3000/v2/");
        assert_eq!(
            c.point_url("0x1").as_str(),
            "http://localhost:3000/v2/api/point/user/0x1"
        );
    }

    #[test]
    fn address_cannot_escape_its_segment() {
        let c = client("https://rewards.example");
        assert_eq!(
            c.point_url("../admin?x=1 y").as_str(),
            "https://rewards.example/api/point/user/..%2Fadmin%3Fx=1%20y"
        );
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(matches!(
            RewardsClient::new("not a url", Duration::from_secs(1)),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            RewardsClient::new("mailto:ops@example.com", Duration::from_secs(1)),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn server_error_is_a_status_query_error() {
        let (base, server) = serve_once("500 Internal Server Error", "").await;

        assert!(matches!(
            client(&base).get_xp("0xabc").await,
            XpResult::QueryError(QueryError::Status(500))
        ));
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/point/user/0xabc "), "{request}");
    }

    #[tokio::test]
    async fn null_point_body_is_not_found() {
        let (base, server) = serve_once("200 OK", r#"{"data":{"point":null}}"#).await;

        assert!(matches!(
            client(&base).get_xp("0xabc").await,
            XpResult::NotFound
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn point_body_is_parsed_into_a_record() {
        let body = r#"{"data":{"rank":3,"point":{"xpPoint":1500,"multiplier_permanent":2,"multiplier_temporary":0,"endTimestamp":0}}}"#;
        let (base, server) = serve_once("200 OK", body).await;

        let XpResult::Found(record) = client(&base).get_xp("0xabc").await else {
            panic!("expected a record");
        };
        assert_eq!(record.rank, Some(3));
        assert_eq!(record.end_timestamp, None);
        assert!(!record.has_temporary_boost());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_api_is_a_query_error() {
        // Port 9 (discard) on loopback: connection refused, no network needed.
        let c = RewardsClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        assert!(matches!(
            c.get_xp("0xabc").await,
            XpResult::QueryError(QueryError::Transport(_))
        ));
    }
}
