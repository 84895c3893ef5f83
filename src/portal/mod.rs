//! Configuration portal.
//!
//! HTTP endpoint served in access-point mode so an operator can submit new
//! credentials:
//!
//! - `GET /` - configuration form
//! - `POST /config` - store `ssid`, `password`, `hostname`
//!
//! Uses `tiny_http` which works on both host and ESP32 (via std::net).
//! Connections are accepted on tiny_http's listener thread; requests are
//! answered only when [`ConfigPortal::poll`] is called.

mod html;
mod server;

pub use server::{parse_form, route, ConfigPortal, PortalError, Route, MAX_BODY_LEN};
