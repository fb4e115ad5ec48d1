use std::{net::IpAddr, str::FromStr};

use actix_web::{
    http::header::USER_AGENT,
    web::{self, BytesMut},
    HttpRequest,
};
use futures::StreamExt;
use ledger_engine::db_types::RequestMetadata;
use log::{debug, trace};
use regex::Regex;

use crate::{config::ServerOptions, errors::ServerError};

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        // The left-most address is the original client
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        result = req.headers().get("Forwarded").and_then(|v| v.to_str().ok()).and_then(forwarded_for);
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.peer_addr().map(|a| a.ip());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr
    })
}

fn forwarded_for(header: &str) -> Option<IpAddr> {
    let re = Regex::new(r#"(?i)for="?\[?(?P<ip>[0-9a-f.:]+)"#).ok()?;
    re.captures(header).and_then(|caps| caps.name("ip")).and_then(|m| IpAddr::from_str(m.as_str()).ok())
}

/// The source IP and user agent of a request, for the audit log.
pub fn request_metadata(req: &HttpRequest, options: &ServerOptions) -> RequestMetadata {
    let ip = get_remote_ip(req, options.use_x_forwarded_for, options.use_forwarded).map(|ip| ip.to_string());
    let user_agent = req.headers().get(USER_AGENT).and_then(|v| v.to_str().ok()).map(String::from);
    RequestMetadata { ip_address: ip, user_agent }
}

/// Reads the request body into memory, giving up as soon as it grows past `limit` bytes.
pub async fn read_payload(mut payload: web::Payload, limit: usize) -> Result<BytesMut, ServerError> {
    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
        if body.len() + chunk.len() > limit {
            return Err(ServerError::PayloadTooLarge(limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
