use super::petstore::PetStore;
use crate::dispatcher::RequestHandler;
use crate::generator::{GeneratorOptions, OpenApiGenerator};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use http::header::CONTENT_TYPE;
use http::Method;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;

/// Command-line interface of the pet store demo
///
/// Prints the generated OpenAPI document and pushes single requests through
/// the dispatcher without a network listener.
#[derive(Parser, Debug)]
#[command(name = "typedapi-petstore")]
#[command(about = "typedapi pet store demo", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the generated OpenAPI document
    Spec {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// YAML file with generator options (servers, title and version overrides)
        #[arg(short, long)]
        options: Option<PathBuf>,
    },
    /// Dispatch one request and print the response
    Request {
        /// HTTP method, e.g. GET
        method: String,

        /// Request target including the query string, e.g. /pets?limit=2
        uri: String,

        /// Request header as `Name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,
    },
    /// List operations in match order
    Routes,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

/// Execute the CLI command, writing results to stdout.
///
/// # Errors
///
/// Returns an error if the options file cannot be read, the document cannot
/// be generated, or the request is malformed.
pub fn run_cli(cli: Cli) -> Result<()> {
    let stdout = std::io::stdout();
    run_cli_to(cli, &mut stdout.lock())
}

/// Same as [`run_cli`] with an explicit output sink.
pub fn run_cli_to<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    match cli.command {
        Commands::Spec { format, options } => {
            let options = match options {
                Some(path) => GeneratorOptions::from_file(&path)?,
                None => GeneratorOptions::default(),
            };
            let document = OpenApiGenerator::new(options)
                .generate::<PetStore>()
                .context("Failed to generate the OpenAPI document")?;
            let rendered = match format {
                OutputFormat::Json => document.to_json_pretty()?,
                OutputFormat::Yaml => document.to_yaml()?,
            };
            writeln!(out, "{}", rendered.trim_end())?;
        }
        Commands::Request {
            method,
            uri,
            headers,
            body,
        } => {
            let handler = petstore_handler()?;
            let request = build_request(&method, &uri, &headers, body)?;
            let response = handler.handle(&request)?;
            writeln!(out, "HTTP {}", response.status())?;
            for (name, value) in response.headers() {
                writeln!(out, "{name}: {}", value.to_str().unwrap_or("<binary>"))?;
            }
            writeln!(out)?;
            let body = response.body();
            match serde_json::from_slice::<Value>(body) {
                Ok(json) => writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?,
                Err(_) if body.is_empty() => {}
                Err(_) => writeln!(out, "{}", String::from_utf8_lossy(body))?,
            }
        }
        Commands::Routes => {
            let handler = petstore_handler()?;
            for route in handler.router().route_summaries() {
                writeln!(out, "{route}")?;
            }
        }
    }
    Ok(())
}

fn petstore_handler() -> Result<RequestHandler<PetStore>> {
    let handler = RequestHandler::new(PetStore::new())?;
    let provider = PetStore::authentication_provider(handler.document());
    Ok(handler.with_authentication_provider(provider))
}

fn build_request(
    method: &str,
    uri: &str,
    headers: &[String],
    body: Option<String>,
) -> Result<http::Request<Vec<u8>>> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {method}"))?;
    let mut builder = http::Request::builder().method(method).uri(uri);
    let mut has_content_type = false;
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow!("Header must look like `Name: value`, got {header:?}"))?;
        has_content_type |= name.trim().eq_ignore_ascii_case(CONTENT_TYPE.as_str());
        builder = builder.header(name.trim(), value.trim());
    }
    if body.is_some() && !has_content_type {
        builder = builder.header(CONTENT_TYPE, "application/json");
    }
    builder
        .body(body.map(String::into_bytes).unwrap_or_default())
        .context("Invalid request")
}
