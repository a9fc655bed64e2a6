use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::PathwayId;
use crate::error::KeggError;

pub const DEFAULT_REFERENCE_BASE_URL: &str = "http://rest.kegg.jp";

pub trait ReferenceClient: Send + Sync {
    fn fetch_pathway(&self, id: &PathwayId) -> Result<String, KeggError>;
}

#[derive(Clone)]
pub struct KeggHttpClient {
    client: Client,
    base_url: String,
}

impl KeggHttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, KeggError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kegg-analyzer/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KeggError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| KeggError::Http(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn pathway_url(&self, id: &PathwayId) -> String {
        format!("{}/get/{}", self.base_url, id.ko_name())
    }
}

impl ReferenceClient for KeggHttpClient {
    fn fetch_pathway(&self, id: &PathwayId) -> Result<String, KeggError> {
        let unavailable = |reason: String| KeggError::FetchUnavailable {
            pathway_id: id.to_string(),
            reason,
        };
        let response = self.client.get(self.pathway_url(id)).send().map_err(|err| {
            if err.is_timeout() {
                unavailable(format!("request timed out: {err}"))
            } else {
                unavailable(err.to_string())
            }
        })?;
        if response.status() != StatusCode::OK {
            return Err(unavailable(format!("HTTP status {}", response.status().as_u16())));
        }
        response.text().map_err(|err| unavailable(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    use assert_matches::assert_matches;

    use super::*;

    fn id() -> PathwayId {
        "00010".parse().unwrap()
    }

    fn serve_once(
        response: &'static str,
        delay: Duration,
    ) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut header = String::new();
            while reader.read_line(&mut header).unwrap() > 2 {
                header.clear();
            }
            thread::sleep(delay);
            let _ = reader.get_mut().write_all(response.as_bytes());
            request_line
        });
        (base_url, handle)
    }

    #[test]
    fn pathway_url_uses_ko_prefix() {
        let client = KeggHttpClient::new("http://rest.kegg.jp/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.pathway_url(&id()), "http://rest.kegg.jp/get/ko00010");
    }

    #[test]
    fn ok_response_returns_body() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 20\r\nConnection: close\r\n\r\nORTHOLOGY   K00844\n\n",
            Duration::ZERO,
        );
        let client = KeggHttpClient::new(&base_url, Duration::from_secs(5)).unwrap();
        let body = client.fetch_pathway(&id()).unwrap();
        assert_eq!(body, "ORTHOLOGY   K00844\n\n");
        assert!(server.join().unwrap().starts_with("GET /get/ko00010 "));
    }

    #[test]
    fn not_found_is_unavailable() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            Duration::ZERO,
        );
        let client = KeggHttpClient::new(&base_url, Duration::from_secs(5)).unwrap();
        assert_matches!(
            client.fetch_pathway(&id()),
            Err(KeggError::FetchUnavailable { pathway_id, reason })
                if pathway_id == "00010" && reason.contains("404")
        );
        server.join().unwrap();
    }

    #[test]
    fn silent_server_times_out_as_unavailable() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            Duration::from_secs(2),
        );
        let client = KeggHttpClient::new(&base_url, Duration::from_millis(200)).unwrap();
        assert_matches!(
            client.fetch_pathway(&id()),
            Err(KeggError::FetchUnavailable { reason, .. }) if reason.contains("timed out")
        );
        server.join().unwrap();
    }
}
