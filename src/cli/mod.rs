//! # CLI Module
//!
//! Command-line front end of the `typedapi-petstore` binary, which bundles a
//! small in-memory pet store API.
//!
//! ## Commands
//!
//! ### `spec`
//!
//! Print the generated document as JSON (default) or YAML, optionally with
//! generator options loaded from a YAML file:
//!
//! ```bash
//! typedapi-petstore spec --format yaml --options generator.yaml
//! ```
//!
//! ### `request`
//!
//! Push one request through the dispatcher and print status, headers and body:
//!
//! ```bash
//! typedapi-petstore request GET '/pets?status=available&limit=2'
//! typedapi-petstore request POST /pets \
//!     -H 'X-Api-Key: petstore-demo-key' \
//!     --body '{"name": "Bella", "tag": "dog"}'
//! ```
//!
//! ### `routes`
//!
//! List every operation in the order paths are matched.

mod commands;
pub mod petstore;


pub use commands::{run_cli, run_cli_to, Cli, Commands, OutputFormat};
