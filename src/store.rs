use async_trait::async_trait;
use futures::TryStreamExt;
use indexmap::IndexMap;
use mongodb::{
    bson::doc,
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Collection, IndexModel,
};
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::schemas::Party;

/// Where party documents live. Handlers get one injected through app data.
#[async_trait]
pub trait PartyStore: Send + Sync {
    async fn insert(&self, party: Party) -> Result<()>;

    async fn find(&self, id: &str) -> Result<Option<Party>>;

    async fn list(&self) -> Result<Vec<Party>>;

    /// Overwrites the whole document. The last writer wins.
    async fn replace(&self, party: &Party) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;
}

pub struct MongoPartyStore {
    parties: Collection<Party>,
}

const DUPLICATE_KEY: i32 = 11000;

fn party_id_index() -> IndexModel {
    IndexModel::builder()
        .keys(doc! { "id": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

impl MongoPartyStore {
    /// Opens the collection and makes sure party ids are unique in it.
    pub async fn new(client: &Client, database: &str, collection: &str) -> Result<Self> {
        let parties: Collection<Party> = client.database(database).collection(collection);
        parties.create_index(party_id_index(), None).await?;
        Ok(MongoPartyStore { parties })
    }
}

#[async_trait]
impl PartyStore for MongoPartyStore {
    async fn insert(&self, party: Party) -> Result<()> {
        match self.parties.insert_one(&party, None).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(AppError::PartyExists(party.id)),
            Err(err) => Err(err.into()),
        }
    }

    async fn find(&self, id: &str) -> Result<Option<Party>> {
        Ok(self.parties.find_one(doc! { "id": id }, None).await?)
    }

    async fn list(&self) -> Result<Vec<Party>> {
        let cursor = self.parties.find(None, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn replace(&self, party: &Party) -> Result<()> {
        let result = self
            .parties
            .replace_one(doc! { "id": party.id.as_str() }, party, None)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::PartyNotFound(party.id.clone()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = self.parties.delete_one(doc! { "id": id }, None).await?;
        if result.deleted_count == 0 {
            return Err(AppError::PartyNotFound(id.to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPartyStore {
    parties: RwLock<IndexMap<String, Party>>,
}

#[async_trait]
impl PartyStore for MemoryPartyStore {
    async fn insert(&self, party: Party) -> Result<()> {
        let mut parties = self.parties.write().await;
        if parties.contains_key(&party.id) {
            return Err(AppError::PartyExists(party.id));
        }
        parties.insert(party.id.clone(), party);
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<Party>> {
        Ok(self.parties.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Party>> {
        Ok(self.parties.read().await.values().cloned().collect())
    }

    async fn replace(&self, party: &Party) -> Result<()> {
        match self.parties.write().await.get_mut(&party.id) {
            Some(stored) => {
                *stored = party.clone();
                Ok(())
            }
            None => Err(AppError::PartyNotFound(party.id.clone())),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.parties.write().await.shift_remove(id) {
            Some(_) => Ok(()),
            None => Err(AppError::PartyNotFound(id.to_string())),
        }
    }
}
