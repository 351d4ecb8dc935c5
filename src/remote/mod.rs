//! The remote CAS adapter (C4): the `RemoteStore` contract, the HTTP
//! gateway fallback chain, and the priority read path over both.

mod download;
mod gateway;
mod store;

pub use download::{download, DownloadOptions};
pub use gateway::{default_gateways, is_error_page, GatewayChain};
pub use store::{RemoteObject, RemoteStore};
