//! Workspace REST client for the dashboard migration pipeline.
//!
//! Layers, bottom-up: a single-attempt [`transport::Transport`], the
//! [`retry::RetryingClient`] wrapping it, typed endpoint calls in
//! [`api::WorkspaceApi`], and the normalized listings in [`catalog`].

pub mod api;
pub mod catalog;
pub mod models;
pub mod retry;
pub mod transport;

pub use api::WorkspaceApi;
pub use catalog::{Catalog, CatalogError};
pub use retry::{RetryPolicy, RetryingClient};
pub use transport::{
    ApiRequest, ApiResponse, Connector, HttpConnector, HttpTransport, Method, Transport,
    TransportError,
};
