use serde::Deserialize;
use std::fmt;
use std::net::Ipv6Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::error;

use crate::cli::Cli;
use crate::error::ConfigError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Optional config file, split into the same sections operators write by hand.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct FileConfig {
    #[serde(default)]
    pub proxy: ProxySection,
    #[serde(default)]
    pub monitoring: MonitoringSection,
    #[serde(default)]
    pub email_alerts: EmailSection,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct ProxySection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct MonitoringSection {
    pub websites: Option<Vec<String>>,
    pub log_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct EmailSection {
    pub recipient_email: Option<String>,
    #[serde(default)]
    pub use_local_mta: bool,
    pub smtp_server: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl FileConfig {
    pub fn parse(path: &Path, content: &str) -> Result<Self, String> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        // An empty YAML document means "no overrides".
        if !is_json && content.trim().is_empty() {
            return Ok(Self::default());
        }
        if is_json {
            serde_json::from_str(content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(content).map_err(|e| e.to_string())
        }
    }

    /// Reads the file, logging and ignoring anything unreadable.
    pub fn load(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                error!("Error reading config file {}: {}", path.display(), e);
                return None;
            }
        };
        match Self::parse(path, &content) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                error!("Error parsing config file {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
}

impl ProxyEndpoint {
    /// Host as it appears in a URL authority; IPv6 literals get brackets.
    fn authority_host(&self) -> String {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.authority_host(), self.port)
    }

    /// Rejects hosts that cannot form a proxy URL, such as `proxy:3128`.
    fn validate(host: String, port: u16) -> Result<Self, ConfigError> {
        let host = match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            Some(inner) if inner.parse::<Ipv6Addr>().is_ok() => inner.to_string(),
            _ => host,
        };
        let endpoint = Self { host, port };
        let bad_chars = endpoint.host.contains(char::is_whitespace)
            || endpoint.host.contains(['/', '@', '[', ']']);
        let stray_colon =
            endpoint.host.contains(':') && endpoint.host.parse::<Ipv6Addr>().is_err();
        if bad_chars || stray_colon {
            return Err(ConfigError::Proxy(endpoint.host));
        }
        match reqwest::Url::parse(&endpoint.url()) {
            Ok(url) if url.host_str().is_some() && url.port_or_known_default() == Some(port) => {
                Ok(endpoint)
            }
            _ => Err(ConfigError::Proxy(endpoint.host)),
        }
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority_host(), self.port)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SmtpSettings {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AlertSettings {
    pub recipient: Option<String>,
    pub use_local_mta: bool,
    pub smtp: SmtpSettings,
}

/// Fully resolved settings, built once and shared by reference.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub proxy: ProxyEndpoint,
    pub websites: Vec<String>,
    pub log_file: PathBuf,
    pub timeout: Duration,
    pub alerts: AlertSettings,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl MonitorConfig {
    /// Merges command-line values over file values; flags win.
    pub fn resolve(cli: &Cli, file: Option<FileConfig>) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_default();

        let host = non_empty(cli.host.clone().or(file.proxy.host));
        let port = cli.port.or(file.proxy.port).filter(|p| *p != 0);
        let websites = cli
            .websites
            .clone()
            .or(file.monitoring.websites)
            .map(|list| {
                list.into_iter()
                    .map(|w| w.trim().to_string())
                    .filter(|w| !w.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty());
        let log_file = cli
            .log_file
            .clone()
            .or(file.monitoring.log_file)
            .filter(|p| !p.as_os_str().is_empty());

        let mut missing = Vec::new();
        if host.is_none() {
            missing.push("--proxy-host");
        }
        if port.is_none() {
            missing.push("--proxy-port");
        }
        if websites.is_none() {
            missing.push("--websites");
        }
        if log_file.is_none() {
            missing.push("--log-file");
        }
        let (Some(host), Some(port), Some(websites), Some(log_file)) =
            (host, port, websites, log_file)
        else {
            return Err(ConfigError::Missing(missing));
        };
        let proxy = ProxyEndpoint::validate(host, port)?;

        let timeout_secs = cli
            .timeout_secs
            .or(file.monitoring.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let email = file.email_alerts;
        let alerts = AlertSettings {
            recipient: non_empty(cli.recipient_email.clone().or(email.recipient_email)),
            use_local_mta: cli.use_local_mta || email.use_local_mta,
            smtp: SmtpSettings {
                server: non_empty(cli.smtp_server.clone().or(email.smtp_server)),
                port: cli.smtp_port.or(email.smtp_port).filter(|p| *p != 0),
                user: non_empty(cli.smtp_user.clone().or(email.smtp_user)),
                password: non_empty(cli.smtp_password.clone().or(email.smtp_password)),
            },
        };

        Ok(Self {
            proxy,
            websites,
            log_file,
            timeout: Duration::from_secs(timeout_secs),
            alerts,
        })
    }
}
