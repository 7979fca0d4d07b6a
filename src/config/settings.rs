use serde::Deserialize;

use crate::broker::InboxCapacity;

/// Top-level configuration settings for the application.
///
/// Includes settings for the server, the broker and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub log: LogSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the WebSocket server will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Configuration settings for the broker.
///
/// `inbox_capacity` is the per-subscriber back-pressure depth (`0` means
/// rendezvous). `max_payload_bytes` is enforced by the transport before a
/// publish reaches the broker.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub inbox_capacity: usize,
    pub max_payload_bytes: usize,
}

impl BrokerSettings {
    pub fn inbox_capacity(&self) -> InboxCapacity {
        InboxCapacity::from_depth(self.inbox_capacity)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub inbox_capacity: Option<usize>,
    pub max_payload_bytes: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

/// Provides default values for `Settings`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8111,
            },
            broker: BrokerSettings {
                inbox_capacity: 0,
                max_payload_bytes: 1024 * 1024,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl PartialSettings {
    /// Fills every missing value from `defaults`.
    pub fn merge(self, defaults: Settings) -> Settings {
        let server = self.server;
        let broker = self.broker;
        let log = self.log;

        Settings {
            server: ServerSettings {
                host: server
                    .as_ref()
                    .and_then(|s| s.host.clone())
                    .unwrap_or(defaults.server.host),
                port: server
                    .as_ref()
                    .and_then(|s| s.port)
                    .unwrap_or(defaults.server.port),
            },
            broker: BrokerSettings {
                inbox_capacity: broker
                    .as_ref()
                    .and_then(|b| b.inbox_capacity)
                    .unwrap_or(defaults.broker.inbox_capacity),
                max_payload_bytes: broker
                    .as_ref()
                    .and_then(|b| b.max_payload_bytes)
                    .unwrap_or(defaults.broker.max_payload_bytes),
            },
            log: LogSettings {
                level: log
                    .and_then(|l| l.level)
                    .unwrap_or(defaults.log.level),
            },
        }
    }
}
