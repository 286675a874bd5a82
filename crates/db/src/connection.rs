use std::time::Duration;

use mongodb::{Client, Database, error::Result, options::ClientOptions};
use nexmeet_config::{DatabaseSettings, Settings};
use tracing::{debug, info};

const APP_NAME: &str = "nexmeet";

/// Startup gives up on an unreachable server after this long.
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn client_options(db: &DatabaseSettings) -> Result<ClientOptions> {
    let mut options = ClientOptions::parse(&db.url).await?;
    options.app_name = Some(APP_NAME.to_string());
    options.max_pool_size = db.max_pool_size.or(options.max_pool_size);
    options.min_pool_size = db.min_pool_size.or(options.min_pool_size);
    if options.server_selection_timeout.is_none() {
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
    }
    Ok(options)
}

/// Opens the meeting store and pings it before handing out the database.
pub async fn connect(settings: &Settings) -> Result<Database> {
    let db = &settings.database;
    let options = client_options(db).await?;
    debug!(
        max_pool = ?options.max_pool_size,
        min_pool = ?options.min_pool_size,
        "MongoDB client options"
    );

    let client = Client::with_options(options)?;
    let database = client.database(&db.name);
    database.run_command(bson::doc! { "ping": 1 }).await?;

    info!(db = %db.name, "Connected to MongoDB");
    Ok(database)
}
