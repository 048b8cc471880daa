#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for probing a mail path and validating DKIM or TLS on the
//! delivered copy

use clap::Parser;
use mail_validator::{
    DnsDkimVerifier, ImapConfig, ProbeConfig, SmtpConfig, ValidationRule, probe,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mail-validator")]
#[command(
    about = "Send a probe email through an SMTP endpoint and validate DKIM or TLS on the delivered copy"
)]
struct Args {
    /// SMTP host to submit the probe through
    #[arg(long, default_value = "localhost")]
    smtp_host: String,

    /// SMTP port
    #[arg(long, default_value_t = 25)]
    smtp_port: u16,

    /// Negotiate STARTTLS on the SMTP connection before sending
    #[arg(long)]
    smtp_starttls: bool,

    /// SMTP username (AUTH is skipped when no credentials are set)
    #[arg(long, env = "SMTP_USERNAME")]
    smtp_user: Option<String>,

    /// SMTP password
    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    smtp_password: Option<String>,

    /// IMAP host holding the destination mailbox
    #[arg(long, default_value = "localhost")]
    imap_host: String,

    /// IMAP port (STARTTLS is negotiated on it)
    #[arg(long, default_value_t = 143)]
    imap_port: u16,

    /// IMAP username
    #[arg(long, env = "IMAP_USERNAME")]
    imap_user: String,

    /// IMAP password
    #[arg(long, env = "IMAP_PASSWORD", hide_env_values = true)]
    imap_password: String,

    /// Mailbox the probe is expected to land in
    #[arg(long, default_value = "INBOX")]
    mailbox: String,

    /// Envelope sender and From address of the probe
    #[arg(long)]
    sender: String,

    /// Recipient address the probe is sent to
    #[arg(long)]
    to: String,

    /// Validation rule to apply to the delivered copy (dkim or tls)
    #[arg(long, default_value = "dkim")]
    validate: ValidationRule,

    /// Write the raw delivered message to this file before validating
    #[arg(long)]
    output: Option<PathBuf>,

    /// Give up waiting for delivery after this long (e.g. 90s, 2m)
    #[arg(long, default_value = "60s", value_parser = parse_duration)]
    timeout: Duration,

    /// Pause between mailbox checks while waiting for delivery
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    poll_interval: Duration,

    /// Output the verdict as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            smtp: SmtpConfig {
                host: self.smtp_host.clone(),
                port: self.smtp_port,
                starttls: self.smtp_starttls,
                username: self.smtp_user.clone(),
                password: self.smtp_password.clone(),
            },
            imap: ImapConfig {
                host: self.imap_host.clone(),
                port: self.imap_port,
                username: self.imap_user.clone(),
                password: self.imap_password.clone(),
                mailbox: self.mailbox.clone(),
            },
            sender: self.sender.clone(),
            recipient: self.to.clone(),
            rule: self.validate,
            output: self.output.clone(),
            fetch_timeout: self.timeout,
            poll_interval: self.poll_interval,
        }
    }
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s).map_err(|e| format!("Invalid duration '{s}': {e}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load .env before parsing so env-backed flags pick it up.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = args.probe_config();

    match probe::run(&config, &DnsDkimVerifier).await {
        Ok(verdict) => {
            if args.json {
                let encoded =
                    serde_json::to_string_pretty(&verdict).expect("verdict serializes");
                println!("{encoded}");
            } else {
                println!("{}", verdict.message);
            }
            ExitCode::from(verdict.exit_code())
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}
