use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info};

use shared::domain::{Category, CategoryKey};

/// Storefront categories created on first start.
pub const DEFAULT_CATEGORIES: &[(&str, &str, &str, bool)] = &[
    ("all", "All Products", "grid", true),
    ("new-arrivals", "New Arrivals", "sparkles", false),
    ("clothing", "Clothing", "shirt", false),
    ("shoes", "Shoes", "shoe", false),
    ("accessories", "Accessories", "watch", false),
    ("gifts", "Gifts", "gift", false),
];

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct NewCategory<'a> {
    pub key: &'a str,
    pub label: &'a str,
    pub icon: &'a str,
    pub is_system: bool,
}

#[derive(Debug, Clone)]
pub struct StoredCategory {
    pub category: Category,
    pub updated_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to `sqlite::memory:` opens its own database.
        let max_connections = if database_url.starts_with("sqlite::memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Appends a category after the current last position.
    pub async fn create_category(&self, new: &NewCategory<'_>) -> Result<Category> {
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO categories (key, label, icon, sort_order, is_system, created_at, updated_at)
             VALUES (?, ?, ?, (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM categories), ?, ?, ?)
             RETURNING key, label, icon, sort_order, is_system",
        )
        .bind(new.key)
        .bind(new.label)
        .bind(new.icon)
        .bind(new.is_system)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to insert category '{}'", new.key))?;
        category_from_row(&row)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT key, label, icon, sort_order, is_system
             FROM categories
             ORDER BY sort_order ASC, key ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list categories")?;
        rows.iter().map(category_from_row).collect()
    }

    pub async fn get_category(&self, key: &CategoryKey) -> Result<Option<Category>> {
        let row = sqlx::query(
            "SELECT key, label, icon, sort_order, is_system FROM categories WHERE key = ?",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(category_from_row).transpose()
    }

    /// Returns `None` when no category has `key`.
    pub async fn update_category(
        &self,
        key: &CategoryKey,
        label: Option<&str>,
        sort_order: Option<i64>,
    ) -> Result<Option<StoredCategory>> {
        let now = Utc::now();
        let row = sqlx::query(
            "UPDATE categories
             SET label = COALESCE(?, label),
                 sort_order = COALESCE(?, sort_order),
                 updated_at = ?
             WHERE key = ?
             RETURNING key, label, icon, sort_order, is_system, updated_at",
        )
        .bind(label)
        .bind(sort_order)
        .bind(now)
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to update category '{key}'"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        debug!(%key, ?sort_order, "category updated");
        Ok(Some(StoredCategory {
            category: category_from_row(&row)?,
            updated_at: row.try_get("updated_at")?,
        }))
    }

    pub async fn update_sort_order(&self, key: &CategoryKey, sort_order: i64) -> Result<bool> {
        Ok(self
            .update_category(key, None, Some(sort_order))
            .await?
            .is_some())
    }

    pub async fn delete_category(&self, key: &CategoryKey) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE key = ?")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete category '{key}'"))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn category_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Inserts [`DEFAULT_CATEGORIES`] when the table is empty. Returns how many were added.
    pub async fn seed_default_categories(&self) -> Result<usize> {
        if self.category_count().await? > 0 {
            return Ok(0);
        }

        for (key, label, icon, is_system) in DEFAULT_CATEGORIES {
            self.create_category(&NewCategory {
                key,
                label,
                icon,
                is_system: *is_system,
            })
            .await?;
        }
        info!(count = DEFAULT_CATEGORIES.len(), "seeded default categories");
        Ok(DEFAULT_CATEGORIES.len())
    }

    /// Rewrites `sort_order` to 0..N-1 following the current listing order.
    /// Returns the number of rows that changed.
    pub async fn normalize_sort_orders(&self) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let keys: Vec<(String, i64)> = sqlx::query_as(
            "SELECT key, sort_order FROM categories ORDER BY sort_order ASC, key ASC",
        )
        .fetch_all(&mut *tx)
        .await?;

        let now = Utc::now();
        let mut changed = 0;
        for (position, (key, sort_order)) in keys.iter().enumerate() {
            let position = position as i64;
            if *sort_order == position {
                continue;
            }
            sqlx::query("UPDATE categories SET sort_order = ?, updated_at = ? WHERE key = ?")
                .bind(position)
                .bind(now)
                .bind(key)
                .execute(&mut *tx)
                .await?;
            changed += 1;
        }
        tx.commit().await?;
        Ok(changed)
    }
}

fn category_from_row(row: &SqliteRow) -> Result<Category> {
    Ok(Category {
        key: CategoryKey(row.try_get("key")?),
        label: row.try_get("label")?,
        icon: row.try_get("icon")?,
        sort_order: row.try_get("sort_order")?,
        is_system: row.try_get("is_system")?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
