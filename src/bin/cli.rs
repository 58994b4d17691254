use anyhow::{bail, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use prettytable::{Cell, Row, Table};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "A CLI tool for the product catalog service", long_about = None)]
struct Cli {
    #[arg(long, default_value = "http://localhost:3000", help = "Base URL of the catalog service")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List all products")]
    Products,

    #[command(about = "Add a new product")]
    AddProduct {
        #[arg(short, long, help = "Product name")]
        name: String,

        #[arg(short, long, help = "Product description")]
        description: String,

        #[arg(short, long, help = "Unit price")]
        price: f64,

        #[arg(short, long, help = "Quantity in stock")]
        quantity: i64,
    },

    #[command(about = "Search products by name or description")]
    Search {
        #[arg(help = "Text to look for")]
        query: String,
    },

    #[command(about = "Create a new user account")]
    Register {
        #[arg(short, long, help = "Username")]
        username: String,

        #[arg(short, long, help = "Password")]
        password: String,

        #[arg(short, long, help = "Email address")]
        email: String,
    },

    #[command(about = "Check a username and password")]
    Login {
        #[arg(short, long, help = "Username")]
        username: String,

        #[arg(short, long, help = "Password")]
        password: String,
    },
}

#[derive(Debug, Serialize)]
struct CreateProductRequest {
    name: String,
    description: String,
    price: f64,
    quantity: i64,
}

#[derive(Debug, Serialize)]
struct SearchRequest {
    search_query: String,
}

#[derive(Debug, Serialize)]
struct CreateUserRequest {
    username: String,
    password: String,
    email: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct Product {
    id: i64,
    name: String,
    description: String,
    price: f64,
    quantity: i64,
    date_created: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    message: String,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = Client::new();

    if let Err(e) = run_command(&client, &cli.url, cli.command).await {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_command(client: &Client, base: &str, command: Commands) -> Result<()> {
    match command {
        Commands::Products => {
            let response = client.get(format!("{}/products", base)).send().await?;
            let products: Vec<Product> = read_json(response).await?;
            print_products(&products, "📭 No products found.");
        }
        Commands::AddProduct {
            name,
            description,
            price,
            quantity,
        } => {
            let payload = CreateProductRequest {
                name,
                description,
                price,
                quantity,
            };
            let response = client
                .post(format!("{}/products", base))
                .json(&payload)
                .send()
                .await?;
            let result: MessageResponse = read_json(response).await?;
            println!("✅ {}", result.message);
        }
        Commands::Search { query } => {
            let response = client
                .post(format!("{}/search", base))
                .json(&SearchRequest {
                    search_query: query.clone(),
                })
                .send()
                .await?;
            let products: Vec<Product> = read_json(response).await?;
            print_products(&products, &format!("📭 No products match '{}'.", query));
        }
        Commands::Register {
            username,
            password,
            email,
        } => {
            let payload = CreateUserRequest {
                username: username.clone(),
                password,
                email,
            };
            let response = client
                .post(format!("{}/auth/register", base))
                .json(&payload)
                .send()
                .await?;
            let result: MessageResponse = read_json(response).await?;
            println!("✅ {}", result.message);
            println!("👤 Username: {}", username);
        }
        Commands::Login { username, password } => {
            let response = client
                .post(format!("{}/auth/login", base))
                .json(&LoginRequest { username, password })
                .send()
                .await?;
            let result: LoginResponse = read_json(response).await?;
            println!("✅ Login successful!");
            println!("👤 Welcome back, {}!", result.user);
        }
    }

    Ok(())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await?;
    match serde_json::from_str::<MessageResponse>(&text) {
        Ok(MessageResponse {
            message,
            error: Some(error),
        }) => bail!("{} ({}): {}", message, status, error),
        Ok(MessageResponse { message, .. }) => bail!("{} ({})", message, status),
        Err(_) => bail!("Request failed ({}): {}", status, text),
    }
}

fn print_products(products: &[Product], empty_message: &str) {
    if products.is_empty() {
        println!("{}", empty_message);
        return;
    }

    println!("\n📋 Products ({})\n", products.len());

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("ID"),
        Cell::new("Name"),
        Cell::new("Description"),
        Cell::new("Price"),
        Cell::new("Qty"),
        Cell::new("Added"),
    ]));

    for product in products {
        let added = product.date_created.with_timezone(&Local);

        table.add_row(Row::new(vec![
            Cell::new(&product.id.to_string()),
            Cell::new(&product.name),
            Cell::new(&product.description),
            Cell::new(&format!("{:.2}", product.price)),
            Cell::new(&product.quantity.to_string()),
            Cell::new(&added.format("%Y-%m-%d %H:%M").to_string()),
        ]));
    }

    table.printstd();
    println!();
}
