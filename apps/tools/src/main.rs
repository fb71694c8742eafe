use anyhow::Result;
use clap::{Parser, Subcommand};
use shared::domain::Icon;
use storage::{NewCategory, Storage};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/storefront.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert the default categories into an empty database.
    Seed,
    CreateCategory {
        key: String,
        label: String,
        #[arg(long, default_value = "grid")]
        icon: String,
        #[arg(long)]
        system: bool,
    },
    /// Rewrite sort orders as 0..n in the current listing order.
    Normalize,
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::Seed => {
            let inserted = storage.seed_default_categories().await?;
            println!("seeded {inserted} categories");
        }
        Command::CreateCategory {
            key,
            label,
            icon,
            system,
        } => {
            let category = storage
                .create_category(&NewCategory {
                    key: &key,
                    label: &label,
                    icon: Icon::from_key(&icon).key(),
                    is_system: system,
                })
                .await?;
            println!(
                "created category key={} sort_order={}",
                category.key, category.sort_order
            );
        }
        Command::Normalize => {
            let rewritten = storage.normalize_sort_orders().await?;
            println!("rewrote {rewritten} sort orders");
        }
        Command::List => {
            for category in storage.list_categories().await? {
                println!(
                    "{:>4}  {:<16} {:<20} {}{}",
                    category.sort_order,
                    category.key.as_str(),
                    category.label,
                    category.icon,
                    if category.is_system { "  (system)" } else { "" }
                );
            }
        }
    }

    Ok(())
}
