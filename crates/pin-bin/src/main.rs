//! Pin device entrypoint. Boot sequence lives in `lib.rs` so integration
//! tests can build the router directly; this just configures logging,
//! installs the panic hook, and hands off to it.

use anyhow::Result;
use clap::Parser;
use pin::{Args, AppStartup};

#[tokio::main]
async fn main() -> Result<()> {
    let mut startup = AppStartup::new();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();

    let args = Args::parse();
    pin::run(args).await
}
