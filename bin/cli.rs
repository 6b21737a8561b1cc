//! CLI - Command Line Interface
//!
//! Available Commands:
//! - catalog list               - Print every product
//! - catalog get <ID>           - Print one product
//! - catalog add --title ...    - Create a product
//! - catalog update <ID> ...    - Change some fields of a product
//! - catalog delete <ID>        - Remove a product
//! - catalog demo               - Walk through add/update/get/delete on the configured file

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use catalog_core::{CatalogConfig, ConfigError, NewProduct, Product, ProductId, ProductPatch};
use catalog_persistence::{SharedProductStore, StoreError, create_json_store};

/// CLI Errors
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Nothing to update: pass at least one field")]
    EmptyUpdate,

    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Catalog CLI
#[derive(Parser, Debug)]
#[command(name = "catalog")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Backing JSON file (overrides config and CATALOG_DATA_FILE)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// List all products
    List,

    /// Show one product
    Get(IdArgs),

    /// Create a product
    Add(AddArgs),

    /// Update some fields of a product
    Update(UpdateArgs),

    /// Delete a product
    Delete(IdArgs),

    /// Run the add/update/get/delete walkthrough
    Demo,
}

#[derive(Args, Debug)]
pub(crate) struct IdArgs {
    /// Product id
    pub id: ProductId,
}

#[derive(Args, Debug)]
pub(crate) struct AddArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub description: String,

    #[arg(long)]
    pub price: f64,

    #[arg(long)]
    pub thumbnail: String,

    /// Unique product code
    #[arg(long)]
    pub code: String,

    #[arg(long)]
    pub stock: u32,
}

impl From<AddArgs> for NewProduct {
    fn from(args: AddArgs) -> Self {
        Self {
            title: args.title,
            description: args.description,
            price: args.price,
            thumbnail: args.thumbnail,
            code: args.code,
            stock: args.stock,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct UpdateArgs {
    /// Product id
    pub id: ProductId,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub price: Option<f64>,

    #[arg(long)]
    pub thumbnail: Option<String>,

    #[arg(long)]
    pub code: Option<String>,

    #[arg(long)]
    pub stock: Option<u32>,
}

impl UpdateArgs {
    fn into_parts(self) -> (ProductId, ProductPatch) {
        let patch = ProductPatch {
            title: self.title,
            description: self.description,
            price: self.price,
            thumbnail: self.thumbnail,
            code: self.code,
            stock: self.stock,
        };
        (self.id, patch)
    }
}

/// Parse CLI arguments and execute commands
pub async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    if cli.verbose {
        init_logging();
    }

    let config = resolve_config(&cli)?;
    info!("Using product file {}", config.storage.path.display());

    let store = create_json_store(config.storage);
    let format = cli.output.unwrap_or(OutputFormat::Pretty);
    let mut stdout = std::io::stdout().lock();
    execute(cli.command, &store, format, &mut stdout).await
}

/// Config file, then `CATALOG_DATA_FILE`, then `--file`; later sources win.
pub(crate) fn resolve_config(cli: &Cli) -> Result<CatalogConfig, CliError> {
    let mut config = CatalogConfig::load(cli.config.as_deref())?;
    if let Some(file) = &cli.file {
        config.storage.path = file.clone();
    }
    Ok(config)
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) async fn execute<W: Write>(
    command: Commands,
    store: &SharedProductStore,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        Commands::List => {
            let products = store.list().await?;
            print_products(out, format, &products)
        }
        Commands::Get(args) => {
            let product = store.get_by_id(args.id).await?;
            print_product(out, format, &product)
        }
        Commands::Add(args) => {
            let product = store.add(args.into()).await?;
            print_product(out, format, &product)
        }
        Commands::Update(args) => {
            let (id, patch) = args.into_parts();
            if patch.is_empty() {
                return Err(CliError::EmptyUpdate);
            }
            let product = store.update(id, patch).await?;
            print_product(out, format, &product)
        }
        Commands::Delete(args) => {
            let product = store.delete(args.id).await?;
            match format {
                OutputFormat::Json => print_product(out, format, &product),
                OutputFormat::Pretty => {
                    writeln!(out, "Deleted product {}", product.id)?;
                    Ok(())
                }
            }
        }
        Commands::Demo => run_demo(store, format, out).await,
    }
}

/// Adds two products, edits the first, looks up the second, deletes it, and
/// prints the list after each step.
async fn run_demo<W: Write>(
    store: &SharedProductStore,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), CliError> {
    writeln!(out, "== initial")?;
    print_products(out, format, &store.list().await?)?;

    let first = store
        .add(NewProduct {
            title: "producto prueba".to_string(),
            description: "Este es un producto prueba".to_string(),
            price: 200.0,
            thumbnail: "Sin imagen".to_string(),
            code: "abc123".to_string(),
            stock: 25,
        })
        .await?;
    writeln!(out, "== added {}", first.id)?;
    print_products(out, format, &store.list().await?)?;

    let second = store
        .add(NewProduct {
            title: "producto prueba 2".to_string(),
            description: "Este es el segundo producto prueba".to_string(),
            price: 400.0,
            thumbnail: "Sin imagen".to_string(),
            code: "def123".to_string(),
            stock: 15,
        })
        .await?;
    writeln!(out, "== added {}", second.id)?;
    print_products(out, format, &store.list().await?)?;

    let patch = ProductPatch {
        title: Some("producto prueba editado".to_string()),
        description: Some("editado satisfactoriamente".to_string()),
        ..Default::default()
    };
    let edited = store.update(first.id, patch).await?;
    writeln!(out, "== updated {}", edited.id)?;
    print_product(out, format, &edited)?;

    let found = store.get_by_id(second.id).await?;
    writeln!(out, "== found {}", found.id)?;
    print_product(out, format, &found)?;

    store.delete(second.id).await?;
    writeln!(out, "== deleted {}", second.id)?;
    print_products(out, format, &store.list().await?)?;

    Ok(())
}

fn print_product<W: Write>(
    out: &mut W,
    format: OutputFormat,
    product: &Product,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(product)?)?,
        OutputFormat::Pretty => writeln!(out, "{}", describe(product))?,
    }
    Ok(())
}

fn print_products<W: Write>(
    out: &mut W,
    format: OutputFormat,
    products: &[Product],
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(products)?)?,
        OutputFormat::Pretty if products.is_empty() => writeln!(out, "(no products)")?,
        OutputFormat::Pretty => {
            for product in products {
                writeln!(out, "{}", describe(product))?;
            }
        }
    }
    Ok(())
}

fn describe(product: &Product) -> String {
    format!(
        "#{} [{}] {} - {} | price {} | stock {} | {}",
        product.id,
        product.code,
        product.title,
        product.description,
        product.price,
        product.stock,
        product.thumbnail
    )
}
