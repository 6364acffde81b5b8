//! Prelude module for convenient imports.
//!
//! ```ignore
//! use irongate::prelude::*;
//! ```

// Core types
pub use irongate_core::error::{Error as CoreError, Result as CoreResult};
pub use irongate_core::{Decimal, FieldType, Message, TimeUnit, Value};

// Dictionaries and codec
pub use irongate_codec::{Codec, CodecConfig, CodecError, ResyncPolicy};
pub use irongate_schema::{
    DictionaryProvider, FieldDescriptor, InMemoryDictionary, MessageSchema, Presence,
    SchemaError,
};

// Transport
pub use irongate_transport::{
    BoxedStream, Connector, FrameCodec, TcpAcceptor, TcpClientConfig, TcpConnector,
    TcpServerConfig, TransportError,
};

// Sessions
pub use irongate_session::{
    HeartbeatStrategy, NtgProtocol, Session, SessionBuilder, SessionConfig, SessionError,
    SessionListener, SessionProtocol, SessionRole, SessionSnapshot, SessionState, SessionStatus,
};

// Registry
pub use irongate_registry::{
    ConnectionManager, ConnectionManagerBuilder, EventLevel, EventListener, FileServiceStore,
    InMemoryServiceStore, InMemoryVariableSetStore, RegistryError, Service, ServiceContext,
    ServiceDescriptor, ServiceError, ServiceEvent, ServiceFactory, ServiceHandler,
    ServiceIdentity, ServiceListener, ServiceStatus, ServiceStore, VariableSet,
};

// Services
pub use irongate_services::{
    COLLECTING_HANDLER, CollectingHandler, LOGGING_HANDLER, LoggingHandler, NTG_CLIENT,
    NTG_SERVER, NtgClientService, NtgServerService, default_factory,
};
