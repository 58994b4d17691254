use crate::config::Config;
use crate::error::StorageError;
use crate::models::{NewProduct, Product};
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

const SCHEMA: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL UNIQUE,
        price REAL NOT NULL,
        quantity INTEGER NOT NULL,
        image TEXT NOT NULL,
        date_created TEXT NOT NULL,
        name_folded TEXT NOT NULL,
        description_folded TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        date_created TEXT NOT NULL
    )",
];

const PRODUCT_COLUMNS: &str = "id, name, description, price, quantity, image, date_created";

/// Opens the connection pool and creates any missing tables.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .context("Invalid DATABASE_URL")?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .context("Failed to create schema")?;
    }

    Ok(pool)
}

#[derive(Clone)]
pub struct ProductStorage {
    pool: SqlitePool,
}

impl ProductStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, StorageError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    pub async fn add_product(&self, product: NewProduct) -> Result<Product, StorageError> {
        let name_folded = fold_case(&product.name);
        let description_folded = fold_case(&product.description);

        let saved = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products
                 (name, description, price, quantity, image, date_created, name_folded, description_folded)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product.name)
        .bind(product.description)
        .bind(product.price)
        .bind(product.quantity)
        .bind(product.image)
        .bind(Utc::now())
        .bind(name_folded)
        .bind(description_folded)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    /// Case-insensitive substring match against name or description.
    ///
    /// Both sides are folded by [`fold_case`]; SQLite's own `lower()` only handles ASCII.
    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>, StorageError> {
        let pattern = format!("%{}%", escape_like(&fold_case(query)));

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE name_folded LIKE $1 ESCAPE '\\' OR description_folded LIKE $1 ESCAPE '\\'
             ORDER BY id"
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }
}

fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
