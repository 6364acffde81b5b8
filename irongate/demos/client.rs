//! NTG client sending one order and printing what comes back.
//!
//! Start the server demo first, then run with: `cargo run --example client`

use irongate::prelude::*;
use irongate::session::ntg::dictionary::{NAMESPACE, NEW_ORDER};
use std::sync::Arc;
use std::time::Duration;

struct PrintListener;

impl SessionListener for PrintListener {
    fn on_state_change(&self, session: &str, snapshot: SessionSnapshot) {
        println!("[{session}] {} ({})", snapshot.state, snapshot.status);
    }

    fn on_message(&self, session: &str, message: &Message) {
        println!("[{session}] <- {}", message.name());
        for (field, value) in message.fields() {
            println!("    {field} = {value:?}");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = SessionConfig::new()
        .peer("127.0.0.1", 9000)
        .credentials("TRADER1", "secret")
        .heartbeat(Duration::from_secs(3), 5);
    let connector = Arc::new(TcpConnector::new(config.tcp_client_config()));

    let session = Session::builder("demo-client", Arc::new(NtgProtocol::new()?))
        .config(config)
        .connector(connector)
        .listener(Arc::new(PrintListener))
        .build()?;

    session.connect().await?;
    tracing::info!(session = session.name(), "logged in");

    let order = Message::new(NEW_ORDER, NAMESPACE)
        .with("ClientOrderID", "DEMO-1")
        .with("InstrumentID", 133_215)
        .with("OrderType", 2)
        .with("TIF", 0)
        .with("Side", 1)
        .with("OrderQty", 100)
        .with("LimitPrice", "101.25".parse::<Decimal>()?);
    session.send(&order).await?;
    println!("-> {}", order.name());

    tokio::time::sleep(Duration::from_secs(10)).await;

    session.logout(Some("demo done")).await?;
    session.dispose().await;
    Ok(())
}
