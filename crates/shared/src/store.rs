use async_trait::async_trait;

use crate::{
    domain::{CitizenRecord, StoredCitizen},
    error::StoreError,
};

/// Persistence contract the desktop core talks to.
///
/// Both calls are async and fallible; failures are reported as a
/// [`StoreError`] whose message is safe to show to the user.
#[async_trait]
pub trait CitizenStore: Send + Sync {
    async fn save(&self, record: CitizenRecord) -> Result<StoredCitizen, StoreError>;
    async fn list_all(&self) -> Result<Vec<StoredCitizen>, StoreError>;
}
