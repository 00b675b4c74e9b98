//! In-process stores with the same semantics as the PostgreSQL ones.
//!
//! Used by the HTTP test-suite and for running the API without a database.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
use tokio::sync::RwLock;

use super::{ContentStore, UserStore};
use crate::error::{AppError, Result};
use crate::models::{
    BatchOutcome, ContentFilter, ContentRecord, NewContent, NewUser, Page, RowOutcome, User,
};

#[derive(Default)]
struct UserTable {
    rows: Vec<User>,
    next_id: i64,
}

#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<UserTable>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the active flag of an account; returns false if it does not exist.
    pub async fn set_active(&self, username: &str, active: bool) -> bool {
        let mut table = self.inner.write().await;
        match table.rows.iter_mut().find(|u| u.username == username) {
            Some(user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let mut table = self.inner.write().await;

        if table.rows.iter().any(|u| u.username == user.username) {
            return Err(AppError::Conflict("username already registered".to_string()));
        }
        if table.rows.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("email already registered".to_string()));
        }

        table.next_id += 1;
        let created = User {
            id: table.next_id,
            username: user.username.clone(),
            email: user.email.clone(),
            hashed_password: user.hashed_password.clone(),
            is_active: true,
            created_at: Utc::now(),
        };
        table.rows.push(created.clone());
        Ok(created)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let table = self.inner.read().await;
        Ok(table.rows.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let table = self.inner.read().await;
        Ok(table.rows.iter().find(|u| u.email == email).cloned())
    }
}

#[derive(Default)]
struct ContentTable {
    rows: Vec<ContentRecord>,
    next_id: i64,
}

#[derive(Default)]
pub struct MemoryContentStore {
    inner: RwLock<ContentTable>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn list(&self, filter: &ContentFilter, page: Page) -> Result<Vec<ContentRecord>> {
        let table = self.inner.read().await;
        let matching: Vec<ContentRecord> = table
            .rows
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        Ok(page.slice(&matching))
    }

    async fn search(&self, q: &str, page: Page) -> Result<Vec<ContentRecord>> {
        let table = self.inner.read().await;
        let matching: Vec<ContentRecord> = table
            .rows
            .iter()
            .filter(|r| r.matches_text(q))
            .cloned()
            .collect();
        Ok(page.slice(&matching))
    }

    async fn get(&self, id: i64) -> Result<Option<ContentRecord>> {
        let table = self.inner.read().await;
        Ok(table.rows.iter().find(|r| r.id == id).cloned())
    }

    async fn count(&self, content_type: Option<&str>) -> Result<i64> {
        let table = self.inner.read().await;
        let count = table
            .rows
            .iter()
            .filter(|r| content_type.map_or(true, |t| r.content_type.as_deref() == Some(t)))
            .count();
        Ok(count as i64)
    }

    async fn rating_counts(&self) -> Result<Vec<(String, i64)>> {
        let table = self.inner.read().await;
        let mut counts: Vec<(String, i64)> = Vec::new();
        for rating in table.rows.iter().filter_map(|r| r.rating.as_deref()) {
            if rating.is_empty() {
                continue;
            }
            match counts.iter_mut().find(|(r, _)| r == rating) {
                Some((_, n)) => *n += 1,
                None => counts.push((rating.to_string(), 1)),
            }
        }
        Ok(counts)
    }

    async fn distinct_ratings(&self) -> Result<Vec<String>> {
        let table = self.inner.read().await;
        let ratings: BTreeSet<String> = table
            .rows
            .iter()
            .filter_map(|r| r.rating.clone())
            .filter(|r| !r.is_empty())
            .collect();
        Ok(ratings.into_iter().collect())
    }

    async fn listed_in_values(&self) -> Result<Vec<String>> {
        let table = self.inner.read().await;
        Ok(table
            .rows
            .iter()
            .filter_map(|r| r.listed_in.clone())
            .filter(|v| !v.is_empty())
            .collect())
    }

    async fn country_values(&self) -> Result<Vec<String>> {
        let table = self.inner.read().await;
        let countries: BTreeSet<String> = table
            .rows
            .iter()
            .filter_map(|r| r.country.clone())
            .filter(|v| !v.is_empty())
            .collect();
        Ok(countries.into_iter().collect())
    }

    async fn upsert_batch(&self, rows: &[NewContent]) -> Result<BatchOutcome> {
        let mut table = self.inner.write().await;
        let mut outcome = BatchOutcome::default();

        for row in rows {
            let position = table.rows.iter().position(|r| r.show_id == row.show_id);
            let result = RowOutcome::classify(position.map(|i| &table.rows[i]), row);

            match (result, position) {
                (RowOutcome::Inserted, _) => {
                    table.next_id += 1;
                    let record = ContentRecord::from_new(table.next_id, row);
                    table.rows.push(record);
                }
                (RowOutcome::Updated, Some(i)) => table.rows[i].apply(row),
                _ => {}
            }
            outcome.record(result);
        }

        Ok(outcome)
    }
}
