//! Shared fixtures for the IronGate benchmarks.

use chrono::DateTime;
use irongate_codec::{Codec, CodecConfig};
use irongate_core::{Decimal, Message};
use irongate_session::ntg::dictionary::{EXECUTION_REPORT, HEARTBEAT, NAMESPACE, NEW_ORDER};
use irongate_session::ntg::ntg_dictionary;
use std::sync::Arc;

/// Builds the NTG codec.
///
/// # Panics
/// Panics if the built-in dictionary is inconsistent.
#[must_use]
pub fn ntg_codec() -> Arc<Codec> {
    let dictionary = ntg_dictionary().expect("NTG dictionary");
    Arc::new(Codec::from_dictionary(&dictionary, CodecConfig::default()).expect("NTG codec"))
}

/// A limit order with every optional field present.
#[must_use]
pub fn new_order() -> Message {
    Message::new(NEW_ORDER, NAMESPACE)
        .with("ClientOrderID", "ORD-000000000001")
        .with("TraderID", "TRADER1")
        .with("Account", "ACC-1")
        .with("InstrumentID", 133_215)
        .with("OrderType", 2)
        .with("TIF", 0)
        .with("Side", 1)
        .with("OrderQty", 1_000)
        .with("DisplayQty", 100)
        .with("LimitPrice", Decimal::new(1_234_567, 4))
        .with("ExpireDateTime", timestamp(1_700_000_000, 0))
}

/// A fill report.
#[must_use]
pub fn execution_report() -> Message {
    Message::new(EXECUTION_REPORT, NAMESPACE)
        .with("ExecutionID", "EXEC-1")
        .with("ClientOrderID", "ORD-000000000001")
        .with("OrderID", "OID-1")
        .with("ExecType", "F")
        .with("OrderStatus", 2)
        .with("OrderRejectCode", 0)
        .with("ExecutedPrice", Decimal::new(1_234_567, 4))
        .with("ExecutedQty", 1_000)
        .with("LeavesQty", 0)
        .with("TransactTime", timestamp(1_700_000_000, 123_456_000))
}

/// A heartbeat, the smallest frame.
#[must_use]
pub fn heartbeat() -> Message {
    Message::new(HEARTBEAT, NAMESPACE)
}

fn timestamp(secs: i64, nanos: u32) -> DateTime<chrono::Utc> {
    DateTime::from_timestamp(secs, nanos).expect("timestamp in range")
}
