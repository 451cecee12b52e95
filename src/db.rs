use anyhow::Context;
use mongodb::{bson::doc, options::ClientOptions, Client, Database};

use crate::config::MongoConfig;

const DEFAULT_DATABASE: &str = "crud_database";

/// Connects, verifies the deployment answers a ping, and returns the database
/// handle. Startup aborts on failure.
pub async fn connect(cfg: &MongoConfig) -> anyhow::Result<Database> {
    let options = ClientOptions::parse(&cfg.uri)
        .await
        .context("parse MongoDB connection string")?;

    let hosts = options
        .hosts
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let name = cfg
        .database
        .clone()
        .or_else(|| options.default_database.clone())
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

    let client = Client::with_options(options).context("build MongoDB client")?;
    let db = client.database(&name);

    db.run_command(doc! { "ping": 1 })
        .await
        .context("connect to MongoDB")?;

    tracing::info!(hosts = %hosts, database = %name, "MongoDB connected");
    Ok(db)
}
