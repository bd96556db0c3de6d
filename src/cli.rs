use clap::Parser;
use std::path::PathBuf;

/// Monitor proxy server speed and availability.
#[derive(Debug, Default, Parser)]
#[command(name = "proxy-monitor", version, about)]
pub struct Cli {
    /// Path to a YAML or JSON configuration file.
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Proxy server host or IP address.
    #[arg(long = "proxy-host")]
    pub host: Option<String>,

    /// Proxy server port.
    #[arg(long = "proxy-port")]
    pub port: Option<u16>,

    /// Websites to check, in order.
    #[arg(long, num_args = 1..)]
    pub websites: Option<Vec<String>>,

    /// Path to the JSON history workbook. Spreadsheet (.xlsx) logs are not
    /// read; point this at a new file when migrating from one.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Per-target probe timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Email address to send alerts to.
    #[arg(long = "alert-email", help_heading = "Email Alert Options")]
    pub recipient_email: Option<String>,

    /// Deliver alerts through the local mail relay.
    #[arg(long, help_heading = "Email Alert Options")]
    pub use_local_mta: bool,

    /// SMTP server for alerts when not using the local relay.
    #[arg(long, help_heading = "Email Alert Options")]
    pub smtp_server: Option<String>,

    /// SMTP port for alerts when not using the local relay.
    #[arg(long, help_heading = "Email Alert Options")]
    pub smtp_port: Option<u16>,

    #[arg(long, help_heading = "Email Alert Options")]
    pub smtp_user: Option<String>,

    #[arg(
        long,
        env = "PROXY_MONITOR_SMTP_PASSWORD",
        hide_env_values = true,
        help_heading = "Email Alert Options"
    )]
    pub smtp_password: Option<String>,
}
