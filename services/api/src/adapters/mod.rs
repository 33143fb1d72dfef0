pub mod auth;
pub mod backend;
pub mod token_store;

pub use auth::HttpAuthAdapter;
pub use backend::HttpBackendAdapter;
pub use token_store::SqliteTokenStore;
