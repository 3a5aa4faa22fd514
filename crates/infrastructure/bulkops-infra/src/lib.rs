pub mod net;

// Re-exports for convenience
pub use net::path::{expand_item_path, parse_pulp_id_from_href};
pub use net::{default_http_client, HttpRestClient, Method, RestClient, RestError};
