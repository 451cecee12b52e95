use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::users::repo_types::{PageWindow, Role, UserDocument, UserFilter};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// Raw list query. Kept as strings so bad numbers fall back to defaults
/// instead of rejecting the request.
#[derive(Debug, Default)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub is_active: Option<String>,
    pub role: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    /// Builds the query from decoded pairs. A repeated key keeps its first value.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut query.page,
                "limit" => &mut query.limit,
                "isActive" => &mut query.is_active,
                "role" => &mut query.role,
                "search" => &mut query.search,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }

    pub fn filter(&self) -> UserFilter {
        let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(String::from);
        UserFilter {
            is_active: self.is_active.as_deref().map(|v| v == "true"),
            role: non_empty(&self.role),
            search: non_empty(&self.search),
        }
    }

    pub fn pagination(&self) -> Pagination {
        let positive = |v: &Option<String>| {
            v.as_deref()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|n| *n > 0)
        };
        Pagination {
            page: positive(&self.page).unwrap_or(DEFAULT_PAGE),
            limit: positive(&self.limit).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn window(&self) -> PageWindow {
        PageWindow {
            skip: (self.page - 1)
                .saturating_mul(self.limit)
                .min(i64::MAX as u64),
            limit: self.limit,
        }
    }

    /// `ceil(total / limit)`
    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

/// Response view of a user; the password never leaves the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    pub role: Role,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<UserDocument> for PublicUser {
    fn from(u: UserDocument) -> Self {
        Self {
            id: u.id.to_hex(),
            name: u.name,
            email: u.email,
            age: u.age,
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at.to_time_0_3(),
            updated_at: u.updated_at.to_time_0_3(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserPage {
    pub success: bool,
    pub count: usize,
    pub total: u64,
    pub page: u64,
    pub pages: u64,
    pub data: Vec<PublicUser>,
}
