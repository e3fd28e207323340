//! Link address parsing.

use std::fmt;
use std::str::FromStr;

use crate::error::LinkError;

/// Where the vehicle link connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAddress {
    /// `udp:host:port`
    Udp { host: String, port: u16 },
    /// `tcp:host:port`
    Tcp { host: String, port: u16 },
    /// `sim`, the in-process simulated vehicle
    Sim,
}

impl LinkAddress {
    pub fn scheme(&self) -> &'static str {
        match self {
            LinkAddress::Udp { .. } => "udp",
            LinkAddress::Tcp { .. } => "tcp",
            LinkAddress::Sim => "sim",
        }
    }
}

impl FromStr for LinkAddress {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |reason: &str| LinkError::InvalidAddress {
            address: s.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = s.split_once(':').unwrap_or((s, ""));
        match scheme.to_ascii_lowercase().as_str() {
            "sim" => Ok(LinkAddress::Sim),
            "udp" | "tcp" => {
                let (host, port) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| invalid("expected host:port"))?;
                if host.is_empty() {
                    return Err(invalid("missing host"));
                }
                let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
                let host = host.to_string();
                if scheme.eq_ignore_ascii_case("udp") {
                    Ok(LinkAddress::Udp { host, port })
                } else {
                    Ok(LinkAddress::Tcp { host, port })
                }
            }
            "" => Err(invalid("empty address")),
            _ => Err(invalid("unknown scheme, expected udp, tcp or sim")),
        }
    }
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkAddress::Udp { host, port } => write!(f, "udp:{}:{}", host, port),
            LinkAddress::Tcp { host, port } => write!(f, "tcp:{}:{}", host, port),
            LinkAddress::Sim => write!(f, "sim"),
        }
    }
}
