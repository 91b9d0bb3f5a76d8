pub mod client_api;
pub mod kv_client;
