pub mod client;
pub mod response;
pub mod transport;
pub mod types;

// Re-export commonly used types for convenient access
pub use client::HttpTransport;
pub use response::ApiResponse;
pub use transport::{RequestOptions, Transport};
pub use types::{Method, Status};
