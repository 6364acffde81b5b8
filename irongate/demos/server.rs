//! NTG exchange simulator managed by a connection manager.
//!
//! Run with: `cargo run --example server`

use irongate::prelude::*;
use irongate::session::config::{HOST, PASSWORD, PORT, USERNAME};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let manager = ConnectionManager::builder(default_factory())
        .environment("simulation")
        .build()?;

    let identity = ServiceIdentity::new("simulation", "exchange");
    manager
        .add_service(
            ServiceDescriptor::new("exchange", NTG_SERVER)
                .environment("simulation")
                .setting(HOST, "127.0.0.1")
                .setting(PORT, "9000")
                .setting(USERNAME, "TRADER1")
                .setting(PASSWORD, "secret")
                .handler(LOGGING_HANDLER),
        )
        .await?;
    manager.init_service(identity.clone()).await?;
    manager.start_service(identity.clone()).await?;

    println!("NTG server listening on 127.0.0.1:9000");
    println!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");
    manager.dispose_manager().await;
    Ok(())
}
