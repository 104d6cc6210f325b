//! Shopfront CLI - Database migrations and cart tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! sf-cli migrate storefront
//!
//! # Inspect a cart
//! sf-cli cart show user123
//!
//! # Add a demo item to a cart
//! sf-cli cart seed user123
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `cart show` - Print a stored cart
//! - `cart seed` - Add a demo line item

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(author, version, about = "Shopfront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Inspect and seed carts
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run storefront database migrations
    Storefront,
}

#[derive(Subcommand)]
enum CartAction {
    /// Print a cart and verify its stored total
    Show {
        /// Cart owner ID
        owner: String,
    },
    /// Add a demo line item to a cart
    Seed {
        /// Cart owner ID
        owner: String,

        /// Product reference
        #[arg(short, long, default_value = "demo-pineapple")]
        product: String,

        /// Display name
        #[arg(short, long, default_value = "Demo Pineapple")]
        name: String,

        /// Unit price
        #[arg(long, default_value = "12.50")]
        price: Decimal,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: i32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Storefront => commands::migrate::storefront().await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show { owner } => commands::cart::show(&owner).await?,
            CartAction::Seed {
                owner,
                product,
                name,
                price,
                quantity,
            } => {
                commands::cart::seed(
                    &owner,
                    commands::cart::SeedItem {
                        product,
                        name,
                        price,
                        quantity,
                    },
                )
                .await?;
            }
        },
    }
    Ok(())
}
