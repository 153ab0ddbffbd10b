use mongodb::{Client, Database, bson::doc};
use tokio::time::sleep;
use tracing::debug;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

/// Build a client and wait, with backoff, until the database answers a ping.
pub async fn establish_connection(config: &MongoConfig) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);

    let mut attempts = 0;
    let mut delay = config.retry.initial_delay;

    loop {
        let Err(err) = database.run_command(doc! { "ping": 1 }).await else {
            return Ok((client, database));
        };

        attempts += 1;
        if attempts >= config.retry.max_attempts {
            return Err(MongoDaoError::InitialPing {
                attempts,
                source: err,
            });
        }

        debug!(
            attempts,
            database = %config.database_name,
            delay_ms = delay.as_millis() as u64,
            "MongoDB not reachable yet; backing off"
        );
        sleep(delay).await;
        delay = config.retry.next_delay(delay);
    }
}
