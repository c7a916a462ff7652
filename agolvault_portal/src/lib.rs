pub mod client;
pub mod config;
pub mod errors;
pub mod token;
pub mod transport;
pub mod types;

pub use client::PortalClient;
pub use config::PortalConfig;
pub use errors::{PortalError, PortalResult};
pub use token::{Credentials, Token};
pub use transport::{HttpTransport, RestTransport};
pub use types::{ContentItem, ContentListing, LayerInfo, ServiceMetadata, UserProfile};
