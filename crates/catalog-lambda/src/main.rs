//! AWS Lambda function for the catalog HTTP API.
//!
//! Built as `bootstrap` for the `provided.al2023` runtime.

use lambda_runtime::Error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    catalog_lambda::run().await
}
