use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::users::repo_types::{NewUser, PageWindow, UserChanges, UserDocument, UserFilter};

pub const USERS_COLLECTION: &str = "users";

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cast to ObjectId failed for value \"{0}\"")]
    InvalidId(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("store error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        let duplicate = match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
            ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
            _ => false,
        };
        if duplicate {
            StoreError::Duplicate(err.to_string())
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}

pub(crate) fn parse_id(id: &str) -> StoreResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
}

/// Persistence primitives for user records.
///
/// Writes on an existing record are single atomic operations that return the
/// updated record, or `None` when no record has that id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: NewUser) -> StoreResult<UserDocument>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<UserDocument>>;

    /// Records matching `filter`, newest first, restricted to `window`.
    async fn find_page(&self, filter: &UserFilter, window: PageWindow)
        -> StoreResult<Vec<UserDocument>>;

    async fn count(&self, filter: &UserFilter) -> StoreResult<u64>;

    async fn update_fields(&self, id: &str, changes: UserChanges)
        -> StoreResult<Option<UserDocument>>;

    /// Removes the record; `false` when it did not exist.
    async fn delete(&self, id: &str) -> StoreResult<bool>;
}

pub struct MongoUserStore {
    collection: Collection<UserDocument>,
}

impl MongoUserStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<UserDocument>(USERS_COLLECTION),
        }
    }

    /// Unique index backing email uniqueness.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(index).await?;
        debug!(collection = USERS_COLLECTION, "indexes ensured");
        Ok(())
    }

    fn build_filter(filter: &UserFilter) -> Document {
        let mut doc = doc! {};

        if let Some(active) = filter.is_active {
            doc.insert("isActive", active);
        }

        if let Some(ref role) = filter.role {
            doc.insert("role", role.as_str());
        }

        if let Some(ref search) = filter.search {
            let pattern = regex::escape(search);
            doc.insert(
                "$or",
                vec![
                    doc! { "name": { "$regex": pattern.as_str(), "$options": "i" } },
                    doc! { "email": { "$regex": pattern.as_str(), "$options": "i" } },
                ],
            );
        }

        doc
    }

    fn build_set(changes: &UserChanges) -> Document {
        let mut set = doc! { "updatedAt": DateTime::now() };

        if let Some(ref name) = changes.name {
            set.insert("name", name.as_str());
        }
        if let Some(ref email) = changes.email {
            set.insert("email", email.as_str());
        }
        if let Some(ref hash) = changes.password_hash {
            set.insert("password", hash.as_str());
        }
        if let Some(age) = changes.age {
            set.insert("age", age);
        }
        if let Some(role) = changes.role {
            set.insert("role", role.as_ref());
        }
        if let Some(active) = changes.is_active {
            set.insert("isActive", active);
        }

        doc! { "$set": set }
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    #[instrument(skip(self, user))]
    async fn insert(&self, user: NewUser) -> StoreResult<UserDocument> {
        let doc = user.into_document();
        self.collection.insert_one(&doc).await?;
        info!(user_id = %doc.id, "user inserted");
        Ok(doc)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<UserDocument>> {
        let oid = parse_id(id)?;
        let user = self.collection.find_one(doc! { "_id": oid }).await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_page(
        &self,
        filter: &UserFilter,
        window: PageWindow,
    ) -> StoreResult<Vec<UserDocument>> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .skip(window.skip)
            .limit(window.limit as i64)
            .build();

        let cursor = self
            .collection
            .find(Self::build_filter(filter))
            .with_options(options)
            .await?;
        let users: Vec<UserDocument> = cursor.try_collect().await?;
        Ok(users)
    }

    #[instrument(skip(self))]
    async fn count(&self, filter: &UserFilter) -> StoreResult<u64> {
        let total = self
            .collection
            .count_documents(Self::build_filter(filter))
            .await?;
        Ok(total)
    }

    #[instrument(skip(self, changes))]
    async fn update_fields(
        &self,
        id: &str,
        changes: UserChanges,
    ) -> StoreResult<Option<UserDocument>> {
        let oid = parse_id(id)?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let user = self
            .collection
            .find_one_and_update(doc! { "_id": oid }, Self::build_set(&changes))
            .with_options(options)
            .await?;
        if user.is_some() {
            info!(user_id = %oid, "user updated");
        }
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let oid = parse_id(id)?;
        let result = self.collection.delete_one(doc! { "_id": oid }).await?;
        if result.deleted_count > 0 {
            info!(user_id = %oid, "user deleted");
        }
        Ok(result.deleted_count > 0)
    }
}
