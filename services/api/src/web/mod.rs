pub mod rest;
pub mod state;

// Re-export the router assembly and OpenAPI definition to make them easily
// accessible to the binary that builds the web server.
pub use rest::{router, ApiDoc};
