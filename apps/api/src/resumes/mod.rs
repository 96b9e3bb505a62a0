pub mod filter;
pub mod handlers;
pub mod store;
pub mod suggestions;
pub mod upload;
