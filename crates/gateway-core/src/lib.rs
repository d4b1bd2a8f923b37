//! # Gateway Core
//!
//! Core types, collaborator traits, and error handling for the metering gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - Keys, provider settings, routes and the provider policy table
//! - The inbound request view the authenticator reads and rewrites
//! - Request/usage shapes consumed by the cost estimators
//! - Collaborator traits (caches, stores, counters, cipher) and in-memory implementations
//! - Error types and handling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod inbound;
pub mod key;
pub mod memory;
pub mod provider;
pub mod request;
pub mod responses;
pub mod route;
pub mod store;

// Re-export commonly used types
pub use error::{ExpirationKind, GatewayError, GatewayResult, StoreError, StoreResult};
pub use inbound::InboundRequest;
pub use key::{anonymize, Key, TimeUnit};
pub use memory::{
    MemoryCounter, MemoryKeyStore, MemoryRouteStore, MemorySettingStore, MemorySettingsCache,
};
pub use provider::{AuthHeader, CustomProvider, ProviderKind, ProviderSetting, SettingUpdate};
pub use request::{
    ChatCompletionRequest, ChatMessage, EmbeddingRequest, FunctionCall, FunctionDefinition,
    MessageContent, MessageRole, TextInput, ToolDefinition,
};
pub use responses::{ResponseObject, ResponseRequest, ResponseStreamEvent, ResponseTool, ResponseUsage};
pub use route::{Route, RouteStep};
pub use store::{
    CipherContext, Counter, Decryptor, Encryptor, KeyCache, ProviderSettingStore, RouteStore,
    SettingResolver, SettingsCache, WindowedCounter,
};
