pub mod base;
pub mod http_client;

pub use base::AuthServiceClient;
pub use http_client::HttpAuthClient;
