//! `keywardd` — the approval broker daemon.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]

use anyhow::Context;
use clap::Parser;
use keyward_audit::{AuditEvent, AuditSink};
use keyward_config::Config;
use keyward_daemon::registry::Resolution;
use keyward_daemon::{broker::Broker, http, poller, socket};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Local, privilege-separated approval broker for secret reads.
#[derive(Debug, Parser)]
#[command(name = "keywardd", version, about)]
struct Args {
    /// Path of the configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the request socket path.
    #[arg(long)]
    socket: Option<PathBuf>,
}

/// Files to remove on the way out. Dropped exactly once on every exit
/// path, tolerating partial initialisation: fields are only populated once
/// the corresponding resource exists.
#[derive(Default)]
struct Teardown {
    socket_path: Option<PathBuf>,
    pid_file: Option<PathBuf>,
}

impl Drop for Teardown {
    fn drop(&mut self) {
        for path in [self.socket_path.take(), self.pid_file.take()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "teardown failed to remove file");
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,keywardd=info,keyward_daemon=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(socket) = args.socket {
        config.socket_path = socket;
    }

    let provider = keyward_provider::build_provider(&config.provider)?;
    provider
        .validate()
        .await
        .with_context(|| format!("provider '{}' failed validation", provider.name()))?;

    let channels = keyward_channel::build_channels(&config.channels)?;
    let mut healthy = Vec::new();
    for channel in channels {
        match channel.validate().await {
            Ok(()) => healthy.push(channel),
            Err(e) => {
                warn!(channel = channel.name(), error = %e, "channel failed validation; disabling");
            }
        }
    }
    if !config.vaults.gated.is_empty() && healthy.is_empty() {
        anyhow::bail!("gated vaults are configured but no notification channel is usable");
    }

    let audit = Arc::new(AuditSink::open(&config.audit_log)?);
    let broker = Broker::new(&config, provider, healthy, Arc::clone(&audit));

    audit.append(&AuditEvent::DaemonStart {
        socket: config.socket_path.display().to_string(),
        http_port: config.http_port,
        provider: broker.provider_name().to_owned(),
        channels: broker.channel_names(),
    });

    let mut teardown = Teardown::default();

    match std::fs::write(&config.pid_file, std::process::id().to_string()) {
        Ok(()) => teardown.pid_file = Some(config.pid_file.clone()),
        Err(e) => warn!(path = %config.pid_file.display(), error = %e, "cannot write pid file"),
    }

    // The HTTP listener binds eagerly so a taken port fails startup instead
    // of surfacing as a dead callback path later.
    let http_listener = http::bind(config.http_port)
        .await
        .with_context(|| format!("cannot bind http callback listener on port {}", config.http_port))?;

    let socket_path = config.socket_path.clone();
    teardown.socket_path = Some(socket_path.clone());
    let socket_task = {
        let broker = Arc::clone(&broker);
        tokio::spawn(async move {
            if let Err(e) = socket::serve(&socket_path, broker).await {
                error!(error = %e, "socket server exited");
            }
        })
    };
    let http_task = {
        let broker = Arc::clone(&broker);
        tokio::spawn(async move {
            if let Err(e) = http::serve(http_listener, broker).await {
                error!(error = %e, "http listener exited");
            }
        })
    };
    let poller_task = poller::spawn(config.pending_dir.clone(), Arc::clone(broker.registry()));

    info!(
        socket = %config.socket_path.display(),
        http_port = config.http_port,
        provider = broker.provider_name(),
        "keyward daemon running"
    );

    wait_for_shutdown().await;
    info!("shutdown signal received");

    socket_task.abort();
    http_task.abort();
    poller_task.abort();

    let denied = broker.registry().drain(Resolution::Shutdown).await;
    if denied > 0 {
        // Give the woken waiters a beat to write their denial responses
        // and audit records before the process exits.
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    audit.append(&AuditEvent::DaemonStop {
        pending_denied: denied,
    });

    drop(teardown);
    Ok(())
}

/// Block until SIGINT or SIGTERM.
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => Some(term),
        Err(e) => {
            warn!(error = %e, "cannot install SIGTERM handler");
            None
        }
    };

    match term.as_mut() {
        Some(term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        None => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}
