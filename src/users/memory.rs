use std::sync::RwLock;

use async_trait::async_trait;
use mongodb::bson::DateTime;

use crate::users::repo::{parse_id, StoreError, StoreResult, UserStore};
use crate::users::repo_types::{NewUser, PageWindow, UserChanges, UserDocument, UserFilter};

/// Vec-backed store for router tests. Enforces the same unique email index
/// as the MongoDB collection.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<Vec<UserDocument>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_poisoned() -> StoreError {
        StoreError::Backend("Lock poisoned".to_string())
    }
}

/// Predicate form of the list filter.
fn matches(filter: &UserFilter, user: &UserDocument) -> bool {
    if let Some(active) = filter.is_active {
        if user.is_active != active {
            return false;
        }
    }
    if let Some(role) = &filter.role {
        if user.role.as_ref() != role.as_str() {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        return user.name.to_lowercase().contains(&needle)
            || user.email.to_lowercase().contains(&needle);
    }
    true
}

/// Overwrites every present field, like a `$set`.
fn apply(changes: &UserChanges, user: &mut UserDocument) {
    if let Some(name) = &changes.name {
        user.name = name.clone();
    }
    if let Some(email) = &changes.email {
        user.email = email.clone();
    }
    if let Some(hash) = &changes.password_hash {
        user.password = hash.clone();
    }
    if let Some(age) = changes.age {
        user.age = Some(age);
    }
    if let Some(role) = changes.role {
        user.role = role;
    }
    if let Some(active) = changes.is_active {
        user.is_active = active;
    }
    user.updated_at = DateTime::now();
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: NewUser) -> StoreResult<UserDocument> {
        let mut users = self.users.write().map_err(|_| Self::lock_poisoned())?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(user.email));
        }
        let doc = user.into_document();
        users.push(doc.clone());
        Ok(doc)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<UserDocument>> {
        let oid = parse_id(id)?;
        let users = self.users.read().map_err(|_| Self::lock_poisoned())?;
        Ok(users.iter().find(|u| u.id == oid).cloned())
    }

    async fn find_page(
        &self,
        filter: &UserFilter,
        window: PageWindow,
    ) -> StoreResult<Vec<UserDocument>> {
        let users = self.users.read().map_err(|_| Self::lock_poisoned())?;
        // Newest insert first among equal timestamps.
        let mut matching: Vec<UserDocument> =
            users.iter().rev().filter(|u| matches(filter, u)).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching
            .into_iter()
            .skip(window.skip as usize)
            .take(window.limit as usize)
            .collect())
    }

    async fn count(&self, filter: &UserFilter) -> StoreResult<u64> {
        let users = self.users.read().map_err(|_| Self::lock_poisoned())?;
        Ok(users.iter().filter(|u| matches(filter, u)).count() as u64)
    }

    async fn update_fields(
        &self,
        id: &str,
        changes: UserChanges,
    ) -> StoreResult<Option<UserDocument>> {
        let oid = parse_id(id)?;
        let mut users = self.users.write().map_err(|_| Self::lock_poisoned())?;
        if let Some(ref email) = changes.email {
            if users.iter().any(|u| u.id != oid && &u.email == email) {
                return Err(StoreError::Duplicate(email.clone()));
            }
        }
        Ok(users.iter_mut().find(|u| u.id == oid).map(|user| {
            apply(&changes, user);
            user.clone()
        }))
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let oid = parse_id(id)?;
        let mut users = self.users.write().map_err(|_| Self::lock_poisoned())?;
        let before = users.len();
        users.retain(|u| u.id != oid);
        Ok(users.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::Role;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.into(),
            email: email.into(),
            password_hash: "hash".into(),
            age: None,
            role: Role::User,
        }
    }

    #[test]
    fn filter_combines_conditions() {
        let mut doc = new_user("Ann Lee", "ann@example.com").into_document();
        let filter = UserFilter {
            is_active: Some(true),
            role: None,
            search: Some("ANN".into()),
        };
        assert!(matches(&filter, &doc));

        doc.is_active = false;
        assert!(!matches(&filter, &doc));

        let by_email = UserFilter {
            search: Some("example.com".into()),
            ..Default::default()
        };
        assert!(matches(&by_email, &doc));

        let by_role = UserFilter {
            role: Some("admin".into()),
            ..Default::default()
        };
        assert!(!matches(&by_role, &doc));
    }

    #[test]
    fn apply_leaves_absent_fields_alone() {
        let mut doc = new_user("Ann", "ann@example.com").into_document();
        doc.age = Some(30);
        let before = doc.clone();
        apply(
            &UserChanges {
                name: Some("Ann Smith".into()),
                ..Default::default()
            },
            &mut doc,
        );

        assert_eq!(doc.name, "Ann Smith");
        assert_eq!(doc.email, before.email);
        assert_eq!(doc.age, before.age);
        assert_eq!(doc.role, before.role);
        assert_eq!(doc.is_active, before.is_active);
        assert_eq!(doc.password, before.password);
        assert_eq!(doc.created_at, before.created_at);
    }

    #[tokio::test]
    async fn crud_cycle() {
        let store = InMemoryUserStore::new();
        let created = store.insert(new_user("Ann", "ann@example.com")).await.unwrap();
        let id = created.id.to_hex();

        assert_eq!(store.find_by_id(&id).await.unwrap(), Some(created.clone()));

        let updated = store
            .update_fields(&id, UserChanges::active(false))
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.is_active);

        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
        assert_eq!(store.find_by_id(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("Ann", "ann@example.com")).await.unwrap();
        let err = store.insert(new_user("Other", "ann@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn pages_are_newest_first() {
        let store = InMemoryUserStore::new();
        for i in 0..5 {
            store
                .insert(new_user(&format!("User {}", i), &format!("u{}@example.com", i)))
                .await
                .unwrap();
        }
        let page = store
            .find_page(&UserFilter::default(), PageWindow { skip: 0, limit: 2 })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].name, "User 4");
        assert_eq!(page[1].name, "User 3");

        let last = store
            .find_page(&UserFilter::default(), PageWindow { skip: 4, limit: 2 })
            .await
            .unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].name, "User 0");
    }

    #[tokio::test]
    async fn malformed_id_fails_lookup() {
        let store = InMemoryUserStore::new();
        let err = store.find_by_id("123").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(_)));
    }
}
