// Export OpenAPI specification as JSON
//
// Usage: cargo run --bin export-openapi > docs/openapi.json

use webforge_api::openapi::ApiDoc;

fn main() {
    match ApiDoc::to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to render OpenAPI spec: {e}");
            std::process::exit(1);
        }
    }
}
