// wgpanel-api: Async Rust client for the WireGuard panel REST API

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

mod auth;
mod clients;
mod interfaces;
mod servers;
mod service;

pub use client::ApiClient;
pub use error::{ApiFailure, Error};
pub use models::{
    Client, ClientState, Interface, InterfaceStateSnapshot, NetworkConfig, OffsetCheck,
    OffsetCheckRequest, Server, ServiceConfig, SnatConfig,
};
pub use transport::{TlsMode, TransportConfig};
