use std::time::Duration;

use crate::error::{LocatorError, Result};

const SUCCESS_PREFIX: &str = "success:";

/// Service scripts the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Update,
    Train,
    Query,
    PointExistence,
    Cloak,
}

impl Endpoint {
    pub fn script(&self) -> &'static str {
        match self {
            Endpoint::Update => "update.php",
            Endpoint::Train => "train.php",
            Endpoint::Query => "query.php",
            Endpoint::PointExistence => "pointexistence.php",
            Endpoint::Cloak => "cloak.php",
        }
    }
}

/// One request: an endpoint plus query fields in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub endpoint: Endpoint,
    pub fields: Vec<(&'static str, String)>,
}

impl Request {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: &'static str, value: impl ToString) -> Self {
        self.fields.push((name, value.to_string()));
        self
    }

    pub fn optional_field(self, name: &'static str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => self,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Executes a request against the service and returns the raw body.
///
/// Implementations report only transport-level failures; checking the
/// `success:` prefix is left to [`parse_response`].
pub trait Transport: Send {
    fn execute(&self, request: &Request) -> Result<String>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: &Request) -> Result<String> {
        (**self).execute(request)
    }
}

/// Split a response body into its payload, or the service's failure text.
pub fn parse_response(body: &str) -> Result<String> {
    let body = body.trim();
    match body.strip_prefix(SUCCESS_PREFIX) {
        Some(payload) => Ok(payload.to_string()),
        None => Err(LocatorError::Protocol(body.to_string())),
    }
}

/// HTTP GET transport backed by a blocking reqwest client.
pub struct HttpTransport {
    base_url: String,
    http_client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(LocatorError::Config("service base URL is empty".into()));
        }

        let http_client = reqwest::blocking::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| LocatorError::Transport(e.to_string()))?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn url_for(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.script())
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &Request) -> Result<String> {
        let url = self.url_for(request.endpoint);
        log::debug!("GET {} {:?}", url, request.fields);

        let response = self
            .http_client
            .get(&url)
            .query(&request.fields)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    LocatorError::Transport(format!("request to {} timed out", url))
                } else {
                    LocatorError::Transport(e.to_string())
                }
            })?;

        // Non-2xx bodies still go through prefix checking so the service's
        // own error text reaches the user.
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| LocatorError::Transport(e.to_string()))?;
        if !status.is_success() {
            log::warn!("{} returned HTTP {}", url, status);
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Answer exactly one HTTP request, returning the request line seen.
    fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if header == "\r\n" || header.is_empty() {
                    break;
                }
            }
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
            .unwrap();
            stream.flush().unwrap();
            request_line.trim_end().to_string()
        });
        (base_url, server)
    }

    #[test]
    fn test_parse_success_payload() {
        assert_eq!(parse_response("success:a|1|2|3|1\n").unwrap(), "a|1|2|3|1");
        assert_eq!(parse_response("success:").unwrap(), "");
    }

    #[test]
    fn test_parse_failure_verbatim() {
        assert_eq!(
            parse_response("error: unknown user"),
            Err(LocatorError::Protocol("error: unknown user".into()))
        );
        assert!(matches!(
            parse_response("Success:nope"),
            Err(LocatorError::Protocol(_))
        ));
    }

    #[test]
    fn test_request_fields_keep_order() {
        let request = Request::new(Endpoint::Update)
            .field("username", "alice")
            .field("data", "ap,-40")
            .optional_field("placename", None::<String>)
            .optional_field("status", Some("here"));
        let names: Vec<&str> = request.fields.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ["username", "data", "status"]);
        assert_eq!(request.get("status"), Some("here"));
        assert_eq!(request.get("placename"), None);
    }

    #[test]
    fn test_http_url_for() {
        let transport =
            HttpTransport::new("http://localhost:9000/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            transport.url_for(Endpoint::PointExistence),
            "http://localhost:9000/pointexistence.php"
        );
    }

    #[test]
    fn test_http_unreachable_is_transport_error() {
        // Nothing listens on the discard port.
        let transport =
            HttpTransport::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let result = transport.execute(&Request::new(Endpoint::Query).field("username", "x"));
        assert!(matches!(result, Err(LocatorError::Transport(_))));
    }

    #[test]
    fn test_http_encodes_fields_and_returns_body() {
        let (base_url, server) = serve_once("200 OK", "success:AC30,out,rm308|1|2|3|1\n");
        let transport = HttpTransport::new(base_url, Duration::from_secs(5)).unwrap();
        let request = Request::new(Endpoint::Update)
            .field("username", "alice")
            .field("data", "00:1a:2b,-40;ap2,-70.5")
            .field("status", "in a meeting");

        let body = transport.execute(&request).unwrap();
        let request_line = server.join().unwrap();

        assert_eq!(
            request_line,
            "GET /update.php?username=alice&data=00%3A1a%3A2b%2C-40%3Bap2%2C-70.5&status=in+a+meeting HTTP/1.1"
        );
        assert_eq!(parse_response(&body).unwrap(), "AC30,out,rm308|1|2|3|1");
    }

    #[test]
    fn test_http_error_status_body_passed_through() {
        let (base_url, server) = serve_once("500 Internal Server Error", "error: database down");
        let transport = HttpTransport::new(base_url, Duration::from_secs(5)).unwrap();

        let body = transport
            .execute(&Request::new(Endpoint::Query).field("username", "x"))
            .unwrap();
        server.join().unwrap();

        assert_eq!(body, "error: database down");
        assert_eq!(
            parse_response(&body),
            Err(LocatorError::Protocol("error: database down".into()))
        );
    }
}
