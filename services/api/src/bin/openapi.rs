//! services/api/src/bin/openapi.rs
//!
//! Prints the OpenAPI specification to stdout so a client can be generated
//! without starting the server.

use api_lib::web::ApiDoc;
use utoipa::OpenApi;

fn main() {
    let spec = ApiDoc::openapi()
        .to_pretty_json()
        .expect("failed to serialize the OpenAPI spec");
    println!("{spec}");
}
