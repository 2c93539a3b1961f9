//! # bridge-agent
//!
//! `event-bridge` binary: loads settings, initializes logging, starts the
//! relay server and runs it until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use bridge_server::{BridgeServer, ServerConfig};
use bridge_settings::{BridgeSettings, LoadedSettings, RejectedOverride};
use chrono::{DateTime, Utc};
use clap::Parser;

/// LAPLACE Event Bridge relay server.
#[derive(Parser, Debug)]
#[command(name = "event-bridge", about = "LAPLACE Event Bridge relay server", version)]
struct Cli {
    /// Settings file (defaults to `~/.laplace/event-bridge.json` when present).
    #[arg(long, env = "LEB_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Shared secret clients must present.
    #[arg(long)]
    auth: Option<String>,

    /// Log every payload and delivery.
    #[arg(long)]
    debug: bool,
}

impl Cli {
    /// File and environment layers, then flags on top.
    ///
    /// Nothing is logged here; skipped environment values come back in
    /// [`LoadedSettings::rejected`].
    fn resolve_settings(&self) -> Result<LoadedSettings> {
        let mut loaded = match &self.config {
            Some(path) => {
                ensure!(path.exists(), "config file not found: {}", path.display());
                bridge_settings::load_settings_from_path(path)
            }
            None => bridge_settings::load_settings(),
        }
        .context("failed to load settings")?;

        self.apply(&mut loaded.settings);
        loaded.settings.validate().context("invalid settings")?;
        Ok(loaded)
    }

    fn apply(&self, settings: &mut BridgeSettings) {
        if let Some(host) = &self.host {
            settings.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(auth) = &self.auth {
            settings.auth_token.clone_from(auth);
        }
        if self.debug {
            settings.debug = true;
        }
    }
}

/// Report environment values that were skipped during loading.
fn warn_rejected(rejected: &[RejectedOverride]) {
    for entry in rejected {
        entry.warn();
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag { "✅ Enabled" } else { "❌ Disabled" }
}

/// Startup banner printed once the listener is bound.
fn banner(settings: &BridgeSettings, port: u16, started: DateTime<Utc>) -> String {
    format!(
        "🌸 LAPLACE Event Bridge Server\n\
         🚀 Server running at http://{host}:{port}\n\
         🔐 Authentication: {auth}\n\
         🐛 Debug Mode: {debug}\n\
         ⏱️ Started at: {started}\n\
         \n\
         Waiting for connections...",
        host = settings.host,
        auth = enabled(settings.auth_enabled()),
        debug = enabled(settings.debug),
        started = started.format("%a, %d %b %Y %H:%M:%S GMT"),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let LoadedSettings { settings, rejected } = cli.resolve_settings()?;

    bridge_core::logging::init_subscriber(settings.debug);
    warn_rejected(&rejected);

    let server = BridgeServer::new(ServerConfig::from(&settings));
    let (addr, handle) = match server.listen().await {
        Ok(bound) => bound,
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            return Err(e).context("failed to start server");
        }
    };

    println!("{}", banner(&settings, addr.port(), Utc::now()));
    tracing::info!(%addr, auth = settings.auth_enabled(), debug = settings.debug, "event bridge started");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    tracing::info!("shutting down");
    server
        .shutdown()
        .graceful_shutdown(vec![handle], Some(settings.shutdown_timeout()))
        .await;
    tracing::info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use bridge_core::logging::capture_logs;
    use chrono::TimeZone;
    use tracing::Level;

    use super::*;

    #[test]
    fn cli_defaults_leave_settings_untouched() {
        let cli = Cli::parse_from(["event-bridge"]);
        let mut settings = BridgeSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings, BridgeSettings::default());
    }

    #[test]
    fn cli_flags_override_settings() {
        let cli = Cli::parse_from([
            "event-bridge",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--auth",
            "secret",
            "--debug",
        ]);
        let mut settings = BridgeSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.auth_token, "secret");
        assert!(settings.debug);
    }

    #[test]
    fn cli_rejects_invalid_port() {
        assert!(Cli::try_parse_from(["event-bridge", "--port", "70000"]).is_err());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let cli = Cli::parse_from(["event-bridge", "--config", missing.to_str().unwrap()]);
        let err = cli.resolve_settings().unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event-bridge.json");
        std::fs::write(&path, r#"{"port": 1234, "sendQueueCapacity": 8}"#).unwrap();

        let cli = Cli::parse_from([
            "event-bridge",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "4321",
        ]);
        let settings = cli.resolve_settings().unwrap().settings;
        assert_eq!(settings.send_queue_capacity, 8);
        assert_eq!(settings.port, 4321);
    }

    #[test]
    fn invalid_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event-bridge.json");
        std::fs::write(&path, "{ not json").unwrap();

        let cli = Cli::parse_from(["event-bridge", "--config", path.to_str().unwrap()]);
        assert!(cli.resolve_settings().is_err());
    }

    #[test]
    fn rejected_env_values_are_warned() {
        let mut settings = BridgeSettings::default();
        let rejected = bridge_settings::apply_overrides_from(&mut settings, |name| {
            (name == "LEB_PORT").then(|| "abc".to_owned())
        });

        let (logs, _guard) = capture_logs();
        warn_rejected(&rejected);

        assert_eq!(logs.count_at_level(Level::WARN), 1);
        let event = logs.find("invalid env var").unwrap();
        assert_eq!(event.field("key"), Some("LEB_PORT"));
        assert_eq!(event.field("value"), Some("abc"));
        assert_eq!(settings.port, BridgeSettings::default().port);
    }

    #[test]
    fn banner_lines() {
        let settings = BridgeSettings {
            auth_token: "pw".into(),
            ..BridgeSettings::default()
        };
        let started = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let text = banner(&settings, 9696, started);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "🌸 LAPLACE Event Bridge Server");
        assert_eq!(lines[1], "🚀 Server running at http://localhost:9696");
        assert_eq!(lines[2], "🔐 Authentication: ✅ Enabled");
        assert_eq!(lines[3], "🐛 Debug Mode: ❌ Disabled");
        assert_eq!(lines[4], "⏱️ Started at: Tue, 02 Jan 2024 03:04:05 GMT");
        assert_eq!(lines[5], "");
        assert_eq!(lines[6], "Waiting for connections...");
    }
}
