//! NTG message layouts.

use irongate_core::FieldType;
use irongate_schema::{
    FieldDescriptor, InMemoryDictionary, MessageSchema, SchemaError, TYPE_ATTRIBUTE,
    UNIT_ATTRIBUTE,
};

/// Dictionary namespace.
pub const NAMESPACE: &str = "NTG";

/// Logon request.
pub const LOGON: &str = "Logon";
/// Logon reply.
pub const LOGON_REPLY: &str = "LogonReply";
/// Logout.
pub const LOGOUT: &str = "Logout";
/// Heartbeat.
pub const HEARTBEAT: &str = "Heartbeat";
/// Session-level reject.
pub const REJECT: &str = "Reject";
/// New order.
pub const NEW_ORDER: &str = "NewOrder";
/// Order cancel request.
pub const ORDER_CANCEL_REQUEST: &str = "OrderCancelRequest";
/// Execution report.
pub const EXECUTION_REPORT: &str = "ExecutionReport";

/// Field names used by the session layer.
pub mod fields {
    /// Logon user.
    pub const COMP_ID: &str = "CompID";
    /// Logon password.
    pub const PASSWORD: &str = "Password";
    /// Replacement password.
    pub const NEW_PASSWORD: &str = "NewPassword";
    /// Protocol version.
    pub const MESSAGE_VERSION: &str = "MessageVersion";
    /// Reject code, 0 meaning accepted.
    pub const REJECT_CODE: &str = "RejectCode";
    /// Days until the password expires.
    pub const PASSWORD_EXPIRY_DAY_COUNT: &str = "PasswordExpiryDayCount";
    /// Logout reason.
    pub const REASON: &str = "Reason";
}

fn alpha(name: &str, length: usize) -> FieldDescriptor {
    FieldDescriptor::new(name, FieldType::Alpha, length)
}

fn int32(name: &str) -> FieldDescriptor {
    FieldDescriptor::new(name, FieldType::Int32, 4)
}

fn uint(name: &str, length: usize) -> FieldDescriptor {
    FieldDescriptor::new(name, FieldType::DecimalUint, length).attribute(TYPE_ATTRIBUTE, "Uint64")
}

fn price(name: &str) -> FieldDescriptor {
    FieldDescriptor::new(name, FieldType::DecimalPrice, 8)
        .precision(8)
        .attribute(TYPE_ATTRIBUTE, "Price")
}

/// Builds the NTG dictionary.
///
/// # Errors
/// Returns [`SchemaError`] if a layout is inconsistent.
pub fn ntg_dictionary() -> Result<InMemoryDictionary, SchemaError> {
    use fields::*;

    let messages = [
        MessageSchema::builder(LOGON, NAMESPACE, b'A')
            .field(alpha(COMP_ID, 11))
            .field(alpha(PASSWORD, 25))
            .field(alpha(NEW_PASSWORD, 25).optional())
            .field(int32(MESSAGE_VERSION).default_value(1))
            .build()?,
        MessageSchema::builder(LOGON_REPLY, NAMESPACE, b'B')
            .field(int32(REJECT_CODE))
            .field(alpha(PASSWORD_EXPIRY_DAY_COUNT, 30).optional())
            .build()?,
        MessageSchema::builder(LOGOUT, NAMESPACE, b'5')
            .field(alpha(REASON, 20).optional())
            .build()?,
        MessageSchema::builder(HEARTBEAT, NAMESPACE, b'0').build()?,
        MessageSchema::builder(REJECT, NAMESPACE, b'3')
            .field(int32(REJECT_CODE))
            .field(alpha("RejectReason", 30).optional())
            .field(alpha("RejectedMessageType", 1).optional())
            .field(alpha("ClientOrderID", 20).optional())
            .build()?,
        MessageSchema::builder(NEW_ORDER, NAMESPACE, b'D')
            .field(alpha("ClientOrderID", 20))
            .field(alpha("TraderID", 11).optional())
            .field(alpha("Account", 10).optional())
            .field(int32("InstrumentID"))
            .field(uint("OrderType", 1))
            .field(uint("TIF", 1))
            .field(uint("Side", 1))
            .field(uint("OrderQty", 4))
            .field(uint("DisplayQty", 4).optional())
            .field(price("LimitPrice").optional())
            .field(FieldDescriptor::new("ExpireDateTime", FieldType::DateTime, 4).optional())
            .build()?,
        MessageSchema::builder(ORDER_CANCEL_REQUEST, NAMESPACE, b'F')
            .field(alpha("ClientOrderID", 20))
            .field(alpha("OrigClientOrderID", 20))
            .field(int32("InstrumentID"))
            .field(uint("Side", 1))
            .build()?,
        MessageSchema::builder(EXECUTION_REPORT, NAMESPACE, b'8')
            .field(alpha("ExecutionID", 12))
            .field(alpha("ClientOrderID", 20))
            .field(alpha("OrderID", 12))
            .field(alpha("ExecType", 1))
            .field(uint("OrderStatus", 1))
            .field(int32("OrderRejectCode"))
            .field(price("ExecutedPrice").optional())
            .field(uint("ExecutedQty", 4).optional())
            .field(uint("LeavesQty", 4))
            .field(
                FieldDescriptor::new("TransactTime", FieldType::DateTime, 8)
                    .attribute(UNIT_ATTRIBUTE, "micros")
                    .optional(),
            )
            .build()?,
    ];

    messages
        .into_iter()
        .try_fold(InMemoryDictionary::new(NAMESPACE), InMemoryDictionary::with_message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use irongate_codec::{Codec, CodecConfig};
    use irongate_schema::DictionaryProvider;

    #[test]
    fn test_dictionary_builds() {
        let dictionary = ntg_dictionary().unwrap();
        assert_eq!(dictionary.len(), 8);
        assert_eq!(dictionary.message_schema(LOGON).unwrap().payload_length(), 65);
        assert_eq!(dictionary.field_schema(fields::COMP_ID).unwrap().length, 11);
        assert!(Codec::from_dictionary(&dictionary, CodecConfig::default()).is_ok());
    }
}
