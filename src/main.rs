mod config;
mod error;
mod models;
mod storage;
mod user_models;
mod user_storage;

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use config::Config;
use error::ApiError;
use models::{CreateProductRequest, MessageResponse, Product, SearchRequest};
use std::sync::Arc;
use storage::ProductStorage;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;
use user_models::{CreateUserRequest, LoginRequest, LoginResponse, NewUser};
use user_storage::UserStorage;

const LIST_PRODUCTS: &str = "Error fetching products";
const ADD_PRODUCT: &str = "Error adding product";
const ADD_USER: &str = "Error adding user";
const LOGIN: &str = "Error logging in";
const REGISTER: &str = "Error registering user";
const SEARCH: &str = "Error searching products";

/// bcrypt ignores everything past this many bytes.
const MAX_PASSWORD_BYTES: usize = 72;

struct AppState {
    config: Config,
    products: ProductStorage,
    users: UserStorage,
}

impl AppState {
    fn new(config: Config, pool: sqlx::SqlitePool) -> Self {
        Self {
            config,
            products: ProductStorage::new(pool.clone()),
            users: UserStorage::new(pool),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let pool = storage::connect(&config).await?;
    let bind_addr = config.bind_addr;

    let app = router(Arc::new(AppState::new(config, pool)));

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!(%bind_addr, "catalog service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("catalog service stopped");
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/products", get(get_products).post(add_product))
        .route("/users", post(add_user))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/search", post(search))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

async fn get_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state
        .products
        .list_products()
        .await
        .map_err(|e| ApiError::storage(LIST_PRODUCTS, e))?;

    Ok(Json(products))
}

async fn add_product(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::payload(ADD_PRODUCT, e))?;

    let saved = state
        .products
        .add_product(payload.into())
        .await
        .map_err(|e| ApiError::storage(ADD_PRODUCT, e))?;

    info!(id = saved.id, name = %saved.name, "product added");
    Ok(Json(MessageResponse::new("Product added successfully")))
}

async fn add_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::payload(ADD_USER, e))?;
    create_user(&state, payload, ADD_USER).await?;

    Ok(Json(MessageResponse::new("User added successfully")))
}

async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::payload(REGISTER, e))?;
    create_user(&state, payload, REGISTER).await?;

    Ok(Json(MessageResponse::new("User registered successfully")))
}

async fn create_user(
    state: &AppState,
    payload: CreateUserRequest,
    message: &'static str,
) -> Result<(), ApiError> {
    if payload.password.len() > MAX_PASSWORD_BYTES {
        return Err(ApiError::BadRequest {
            message,
            detail: format!("password must be at most {} bytes", MAX_PASSWORD_BYTES),
        });
    }

    let cost = state.config.bcrypt_cost;
    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::internal(message, e))?
        .map_err(|e| ApiError::internal(message, e))?;

    let saved = state
        .users
        .create_user(NewUser {
            username: payload.username,
            password_hash,
            email: payload.email,
        })
        .await
        .map_err(|e| ApiError::storage(message, e))?;

    info!(id = saved.id, username = %saved.username, email = %saved.email, "user created");
    Ok(())
}

async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::payload(LOGIN, e))?;

    // No stored hash can stand for a longer password.
    if payload.password.len() > MAX_PASSWORD_BYTES {
        return Err(ApiError::Unauthorized);
    }

    let user = state
        .users
        .get_user_by_username(&payload.username)
        .await
        .map_err(|e| ApiError::storage(LOGIN, e))?
        .ok_or(ApiError::Unauthorized)?;

    let password = payload.password;
    let password_hash = user.password_hash;
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
        .await
        .map_err(|e| ApiError::internal(LOGIN, e))?
        .map_err(|e| ApiError::internal(LOGIN, e))?;

    if !valid {
        return Err(ApiError::Unauthorized);
    }

    info!(username = %user.username, "login successful");
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user: user.username,
    }))
}

async fn search(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::payload(SEARCH, e))?;

    let products = state
        .products
        .search_products(&payload.search_query)
        .await
        .map_err(|e| ApiError::storage(SEARCH, e))?;

    Ok(Json(products))
}
