//! # Mosaic Server
//!
//! Boots the platform and serves its HTTP surface with `Axum`.
//!
//! Startup is driven by the kernel's phase sequencer: the `http-layer` phase checks the TLS
//! material and the `api-routes` phase assembles the router on top of the process registry.
//!
//! ## Example
//! ```no_run
//! use mosaic_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder()
//!         .port(4583)
//!         .build()
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

mod router;

use anyhow::{Context, Result, anyhow};
use axum::Router;
use axum_server::Handle;
use mosaic::domain::config::{AppConfig, LoggingConfig, ServerConfig};
use mosaic::kernel::bootstrap::{EventBusObserver, Phase, PhaseContext, Platform};
use mosaic::kernel::{BoxFuture, KernelError};
use mosaic_event_bus::EventBus;
use mosaic_logger::{LogHandle, Logger};
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

/// Initializes the global subscriber from the `[logging]` section.
///
/// # Errors
/// Returns an error for an invalid level or when a subscriber is already installed.
pub fn init_logger(name: &str, cfg: &LoggingConfig) -> Result<Logger> {
    let mut builder =
        Logger::builder().name(name).level_str(&cfg.level)?.console(cfg.console).json(cfg.json);
    if let Some(filter) = &cfg.env_filter {
        builder = builder.env_filter(filter);
    }
    if let Some(path) = &cfg.path {
        builder = builder.path(path);
    }
    builder.init().context("Failed to initialize logging")
}

/// A fluent builder for configuring and initializing the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    cfg: AppConfig,
    events: Option<EventBus>,
    logger: Option<LogHandle>,
}

impl ServerBuilder {
    /// Set up the server's configuration.
    pub fn config(mut self, cfg: AppConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.cfg.server.port = port;
        self
    }

    /// Bus receiving the startup lifecycle events. A private bus is used otherwise.
    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Root log handle handed to the modules.
    pub fn logger(mut self, logger: LogHandle) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Runs every startup phase and assembles the router.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, a phase fails (connection, module
    /// instantiation, missing TLS files) or no router was produced.
    ///
    /// # Examples
    /// ```no_run
    /// # use mosaic_server::Server;
    /// # async fn example() -> anyhow::Result<()> {
    /// let server = Server::builder()
    ///     .build()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn build(self) -> Result<Server> {
        let address = SocketAddr::new(self.cfg.server.address, self.cfg.server.port);
        info!(address = %address, "Initializing server");

        let events = self.events.unwrap_or_default();
        let logger = self.logger.unwrap_or_else(|| LogHandle::new("mosaic"));

        let platform = mosaic::bootstrapper(self.cfg.clone())
            .logger(logger)
            .observer(EventBusObserver::new(events.clone()))
            .hook(Phase::HttpLayer, validate_ssl)
            .hook(Phase::ApiRoutes, mount_routes)
            .run()
            .await
            .map_err(|e| anyhow!("Platform bootstrap failed: {e}"))?;

        let router = platform
            .container
            .resolve::<Router>(router::ROUTER_KEY)
            .context("Router was not assembled")?;

        info!(
            mode = %platform.mode,
            elapsed_ms = platform.total_elapsed().as_secs_f64() * 1000.0,
            "Platform ready"
        );
        Ok(Server { cfg: self.cfg, platform, router: Router::clone(&router), events })
    }
}

fn validate_ssl(ctx: PhaseContext) -> BoxFuture<'static, Result<(), KernelError>> {
    Box::pin(async move { check_ssl_files(&ctx.config.server) })
}

fn check_ssl_files(server: &ServerConfig) -> Result<(), KernelError> {
    let Some(ssl) = &server.ssl else {
        return Ok(());
    };

    for (what, path) in [("certificate", &ssl.cert), ("key", &ssl.key)] {
        if !path.exists() {
            return Err(KernelError::Configuration {
                message: format!("SSL {what} not found at: {}", path.display()).into(),
                context: Some("server.ssl".into()),
            });
        }
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = ssl.key.metadata()
            && metadata.permissions().mode() & 0o077 != 0
        {
            tracing::warn!(
                "SECURITY: SSL Private Key {} has insecure permissions (should be 600)",
                ssl.key.display()
            );
        }
    }
    Ok(())
}

fn mount_routes(ctx: PhaseContext) -> BoxFuture<'static, Result<(), KernelError>> {
    Box::pin(async move {
        let router = router::init(ctx.container.clone());
        ctx.container.register_value(router::ROUTER_KEY, router);
        Ok(())
    })
}

/// A fully started platform ready to serve.
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    cfg: AppConfig,
    platform: Platform,
    router: Router,
    events: EventBus,
}

impl Server {
    /// Returns a new [`ServerBuilder`] to configure the server.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Starts the server and runs until the shutdown signal is received.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the configured address
    /// or if SSL/TLS setup fails.
    pub async fn run(self) -> Result<()> {
        let address = SocketAddr::new(self.cfg.server.address, self.cfg.server.port);
        info!(address = %address, ssl = self.cfg.server.ssl.is_some(), "Starting server");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let handle = Handle::<SocketAddr>::new();
        let shutdown_handle = handle.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!("Error while waiting for shutdown signal: {e}");
                return;
            }
            info!("Shutdown signal received, starting graceful shutdown...");
            events.shutdown();
            shutdown_handle.graceful_shutdown(Some(std::time::Duration::from_secs(30)));
        });

        if let Some(ssl_config) = &self.cfg.server.ssl {
            info!("Starting HTTPS server on https://{address}");

            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                &ssl_config.cert,
                &ssl_config.key,
            )
            .await
            .context("Failed to load SSL/TLS certificates")?;

            axum_server::bind_rustls(address, tls_config)
                .handle(handle)
                .serve(app)
                .await
                .context("HTTPS server failed")?;
        } else {
            info!("Starting HTTP server on http://{address}");

            axum_server::bind(address)
                .handle(handle)
                .serve(app)
                .await
                .context("HTTP server failed")?;
        }

        info!("Server shutdown complete");
        Ok(())
    }

    /// The started platform.
    #[must_use]
    pub const fn platform(&self) -> &Platform {
        &self.platform
    }

    /// The HTTP router, for serving through a custom listener or driving it in tests.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => {
            res.context("Ctrl+C signal received")?;
        },
        res = terminate => {
            res.context("SIGTERM signal received")?;
        },
    }

    Ok(())
}
