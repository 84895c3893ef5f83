//! Portal HTTP server and routing.

use super::html;
use crate::config::{Credentials, HOSTNAME_KEY, PASSWORD_KEY, SSID_KEY};
use log::{error, info, warn};
use std::io::Read;
use std::net::{IpAddr, SocketAddr};
use tiny_http::{Header, Method, Request, Response, Server};

/// Largest request body read for a submission; the rest is ignored.
pub const MAX_BODY_LEN: usize = 4096;

/// Requests answered per `poll` so one call stays short.
const MAX_REQUESTS_PER_POLL: usize = 4;

/// What a request asks the portal to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Serve the configuration form.
    Form,
    /// Store the submitted credentials.
    Submit(Credentials),
    /// Known path, wrong method.
    MethodNotAllowed { allow: &'static str },
    NotFound,
}

/// Map a request to a [`Route`].
///
/// Submission fields come from the query string and the form body, with the
/// body taking precedence. Missing fields are empty strings.
pub fn route(method: &Method, url: &str, body: &str) -> Route {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    match (path, method) {
        ("/", Method::Get) | ("/", Method::Head) => Route::Form,
        ("/", _) => Route::MethodNotAllowed { allow: "GET" },
        ("/config", Method::Post) => {
            let mut ssid = String::new();
            let mut password = String::new();
            let mut hostname = String::new();
            for (key, value) in parse_form(query).into_iter().chain(parse_form(body)) {
                match key.as_str() {
                    SSID_KEY => ssid = value,
                    PASSWORD_KEY => password = value,
                    HOSTNAME_KEY => hostname = value,
                    _ => {}
                }
            }
            Route::Submit(Credentials::new(ssid, password, hostname))
        }
        ("/config", _) => Route::MethodNotAllowed { allow: "POST" },
        _ => Route::NotFound,
    }
}

/// Decode an `application/x-www-form-urlencoded` string.
///
/// Invalid UTF-8 in a decoded value is replaced rather than rejected.
pub fn parse_form(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

/// Configuration portal HTTP server.
pub struct ConfigPortal {
    server: Server,
    content_type: Header,
}

impl ConfigPortal {
    /// Start listening.
    ///
    /// # Arguments
    ///
    /// * `bind_addr` - IP address to bind to (use `None` for 0.0.0.0)
    /// * `port` - Port to listen on (0 picks a free port)
    pub fn start(bind_addr: Option<IpAddr>, port: u16) -> Result<Self, PortalError> {
        let addr = match bind_addr {
            Some(ip) => SocketAddr::new(ip, port),
            None => SocketAddr::from(([0, 0, 0, 0], port)),
        };

        let server = Server::http(addr).map_err(|e| PortalError::Bind(e.to_string()))?;
        let content_type =
            Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..])
                .expect("static header");

        let portal = Self {
            server,
            content_type,
        };
        match portal.local_addr() {
            Some(bound) => info!("Configuration portal listening on http://{}/", bound),
            None => info!("Configuration portal listening"),
        }
        Ok(portal)
    }

    /// Address the portal is bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Answer pending requests without blocking.
    ///
    /// `on_submit` stores a submission; its error text is shown to the
    /// operator. Returns the number of requests answered.
    pub fn poll<F>(&mut self, mut on_submit: F) -> usize
    where
        F: FnMut(&Credentials) -> Result<(), String>,
    {
        let mut served = 0;
        while served < MAX_REQUESTS_PER_POLL {
            match self.server.try_recv() {
                Ok(Some(request)) => {
                    self.serve(request, &mut on_submit);
                    served += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Portal receive error: {}", e);
                    break;
                }
            }
        }
        served
    }

    fn serve<F>(&self, mut request: Request, on_submit: &mut F)
    where
        F: FnMut(&Credentials) -> Result<(), String>,
    {
        let mut body = String::new();
        if request.method() == &Method::Post {
            let mut raw = Vec::new();
            if let Err(e) = request
                .as_reader()
                .take(MAX_BODY_LEN as u64)
                .read_to_end(&mut raw)
            {
                warn!("Failed to read request body: {}", e);
            }
            body = String::from_utf8_lossy(&raw).into_owned();
        }

        let response = match route(request.method(), request.url(), &body) {
            Route::Form => Response::from_string(html::FORM_HTML)
                .with_header(self.content_type.clone())
                .with_status_code(200),
            Route::Submit(credentials) => match on_submit(&credentials) {
                Ok(()) => {
                    info!("Configuration saved for network {}", credentials.ssid);
                    Response::from_string(html::SAVED_HTML)
                        .with_header(self.content_type.clone())
                        .with_status_code(200)
                }
                Err(reason) => {
                    warn!("Configuration not saved: {}", reason);
                    Response::from_string(html::failed_html(&reason))
                        .with_header(self.content_type.clone())
                        .with_status_code(500)
                }
            },
            Route::MethodNotAllowed { allow } => {
                let allow = Header::from_bytes(&b"Allow"[..], allow.as_bytes())
                    .expect("static header");
                Response::from_string("Method Not Allowed")
                    .with_status_code(405)
                    .with_header(allow)
            }
            Route::NotFound => Response::from_string("Not Found").with_status_code(404),
        };

        if let Err(e) = request.respond(response) {
            warn!("Failed to send response: {}", e);
        }
    }
}

/// Errors from the configuration portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortalError {
    /// Listener could not be bound.
    Bind(String),
}

impl std::fmt::Display for PortalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bind(msg) => write!(f, "failed to bind portal: {}", msg),
        }
    }
}

impl std::error::Error for PortalError {}
