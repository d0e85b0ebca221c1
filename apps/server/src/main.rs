use anyhow::Context;
use mosaic::kernel::config::load_app_config;
use mosaic_server::{Server, init_logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = load_app_config(Some("server")).context("Critical: Configuration is malformed")?;
    let _log = init_logger(env!("CARGO_PKG_NAME"), &cfg.logging)?;

    Server::builder().config(cfg).build().await?.run().await
}
