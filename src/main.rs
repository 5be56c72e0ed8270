use std::{io, sync::Arc};

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use mongodb::Client;
use tracing_subscriber::EnvFilter;

mod balance;
mod config;
mod error;
mod party;
mod report;
mod routes;
mod schemas;
mod settlement;
mod store;

use crate::config::Config;
use crate::store::{MemoryPartyStore, MongoPartyStore, PartyStore};

async fn open_store(config: &Config) -> io::Result<Arc<dyn PartyStore>> {
    match &config.mongodb_uri {
        Some(uri) => {
            tracing::info!("Connecting to MongoDB");
            let client = Client::with_uri_str(uri).await.map_err(io::Error::other)?;
            tracing::info!(
                database = %config.database,
                collection = %config.collection,
                "Connected"
            );
            let store = MongoPartyStore::new(&client, &config.database, &config.collection)
                .await
                .map_err(io::Error::other)?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("MONGODB_URI is not set, parties are kept in memory only");
            Ok(Arc::new(MemoryPartyStore::default()))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().map_err(io::Error::other)?;
    let store = web::Data::from(open_store(&config).await?);

    tracing::info!("Listening on {}:{}", config.bind_address, config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(store.clone())
            .configure(routes::configure)
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await
}
