use anyhow::Context;
use mongodb::{Client, Database, options::ClientOptions};

use crate::config::Config;

const APP_NAME: &str = "usuarios-services";

/// Builds the process-wide MongoDB client and selects the configured database.
///
/// The driver pools connections internally and connects lazily, so this
/// only fails on an unparsable `MONGO_URL`. The first operation against the
/// server (index creation at startup) waits for server selection.
pub async fn connect(config: &Config) -> anyhow::Result<Database> {
    let mut options = ClientOptions::parse(config.mongo_url())
        .await
        .context("parse MONGO_URL")?;
    options.app_name = Some(APP_NAME.to_owned());

    let client = Client::with_options(options).context("build MongoDB client")?;
    let database = client.database(config.mongo_db());

    tracing::info!(database = config.mongo_db(), "MongoDB client initialized");

    Ok(database)
}
