pub mod auth;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod routes;
pub mod state;
pub mod ws_handler;

// Re-export the main handlers to make them easily accessible
// to the binary that builds the web server router.
pub use middleware::require_token;
pub use routes::build_router;
pub use ws_handler::ws_handler;
