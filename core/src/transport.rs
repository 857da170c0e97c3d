//! Executes `HttpRequest`s against the network.
//!
//! # Design
//! `UreqTransport` owns a single `ureq::Agent`, the long-lived connection
//! handle for a client session. HTTP status codes are returned as data rather
//! than errors so the client decides what a non-200 means; only failures to
//! complete the exchange become `ApiError::Transport`. Calls block until the
//! server answers. There is no timeout and no retry.

use tracing::trace;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

/// Performs one blocking HTTP round trip.
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by `ureq`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder
            .send(request.body.as_bytes())
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        // ureq caps bodies at 10 MiB by default; unlimited searches can exceed that.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        trace!(status, bytes = body.len(), "http response");
        Ok(HttpResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;

    use super::*;

    /// Serve one HTTP response with `body`, after reading the whole request.
    fn serve_once(body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .unwrap();
            stream.write_all(body.as_bytes()).unwrap();
        });
        format!("http://{addr}/xmlrpc.php")
    }

    #[test]
    fn reads_response_bodies_beyond_ten_mebibytes() {
        let record = "<value><struct><member><name>sitename</name><value><string>Cooking</string></value></member></struct></value>";
        let mut body = String::from("<?xml version=\"1.0\"?><methodResponse><params><param><value><array><data>");
        while body.len() < 12 * 1024 * 1024 {
            body.push_str(record);
        }
        body.push_str("</data></array></value></param></params></methodResponse>");
        let expected_len = body.len();

        let url = serve_once(body);
        let request = HttpRequest {
            url,
            headers: vec![("content-type".to_string(), "text/xml".to_string())],
            body: "<?xml version=\"1.0\"?><methodCall><methodName>syndic8.GetFeedInfo</methodName><params></params></methodCall>".to_string(),
        };
        let response = UreqTransport::new().execute(request).unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body.len(), expected_len);
        assert!(response.body.ends_with("</methodResponse>"));
    }
}
