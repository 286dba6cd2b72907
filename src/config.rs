//! Command line and environment configuration.

use std::net::SocketAddr;

use clap::Parser;

use crate::{
    error::{ConfigError, ConfigResult},
    router::RoutingPolicy,
    wire::WireFormat,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "chat-relay", version, about = "Real-time chat relay with rooms")]
pub struct RelayConfig {
    /// Hostname of the relay. When it resolves to several addresses the
    /// first IPv4 one is used.
    #[arg(long, env = "CHAT_RELAY_HOST", default_value = "localhost")]
    pub host: String,

    /// Port number on which the relay should run.
    #[arg(long, env = "CHAT_RELAY_PORT", default_value_t = 7070)]
    pub port: u16,

    /// Shape of the payloads sent to clients.
    #[arg(long, env = "CHAT_RELAY_WIRE_FORMAT", value_enum, default_value_t = WireFormat::Legacy)]
    pub wire_format: WireFormat,

    /// Drop room messages from clients that have not joined the room.
    #[arg(long, env = "CHAT_RELAY_ENFORCE_MEMBERSHIP")]
    pub enforce_membership: bool,
}

impl RelayConfig {
    pub fn routing_policy(&self) -> RoutingPolicy {
        RoutingPolicy {
            enforce_membership: self.enforce_membership,
        }
    }

    /// Resolves `host:port` to the address the listener binds.
    pub async fn bind_addr(&self) -> ConfigResult<SocketAddr> {
        let target = format!("{}:{}", self.host, self.port);
        let addrs = match tokio::net::lookup_host(target.clone()).await {
            Ok(addrs) => addrs,
            Err(source) => return Err(ConfigError::Resolve { addr: target, source }),
        };
        prefer_ipv4(addrs).ok_or(ConfigError::NoAddress(target))
    }
}

/// `localhost` often resolves to `[::1]` first, which IPv4-only clients
/// cannot reach.
fn prefer_ipv4(addrs: impl IntoIterator<Item = SocketAddr>) -> Option<SocketAddr> {
    let mut first = None;
    for addr in addrs {
        if addr.is_ipv4() {
            return Some(addr);
        }
        first.get_or_insert(addr);
    }
    first
}
