//! TechMarket kiosk: an interactive terminal kiosk over the product catalog,
//! plus one-shot commands for scripting inventory changes.

pub mod config;
pub mod controller;
pub mod form;
mod tui;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use config::{BackendArgs, KioskConfig};
use console::style;
use form::{FormField, FormState};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use techmarket_catalog::{Backend, Catalog, ListOrder, ProductChange, ProductId};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "techmarket")]
#[command(version, about = "TechMarket catalog kiosk and inventory tools", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub backend: BackendArgs,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Append logs to this file. The kiosk logs nothing without it.
    #[arg(long, global = true, env = "TECHMARKET_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Defaults to `kiosk`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Open the interactive kiosk
    Kiosk,

    /// Print the catalog
    List {
        /// Sort order
        #[arg(long, value_enum, default_value_t = OrderArg::Latest)]
        order: OrderArg,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Add a product
    Add {
        #[arg(long)]
        title: String,

        /// Price; `,` or `.` as decimal separator (e.g. 4999,90)
        #[arg(long)]
        price: String,

        #[arg(long)]
        description: Option<String>,

        /// Image URL
        #[arg(long)]
        image: Option<String>,
    },

    /// Change some fields of a product, leaving the others as they are
    Update {
        /// Product ID
        id: ProductId,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        price: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Image URL
        #[arg(long)]
        image: Option<String>,
    },

    /// Delete a product
    Delete {
        /// Product ID
        id: ProductId,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderArg {
    /// Newest first
    Latest,
    /// By title
    Alphabetical,
}

impl From<OrderArg> for ListOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Latest => ListOrder::LatestFirst,
            OrderArg::Alphabetical => ListOrder::Alphabetical,
        }
    }
}

/// Main entry point for the CLI.
pub fn main() -> Result<()> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Kiosk);
    init_logging(
        cli.verbose,
        cli.log_file.as_deref(),
        command == Commands::Kiosk,
    )?;

    let config = KioskConfig::resolve(&cli.backend)?;
    let catalog = config.open_catalog()?;
    let mut out = std::io::stdout().lock();

    match command {
        Commands::Kiosk => {
            drop(out);
            tui::run(catalog, config.passcode)
        }
        Commands::List { order, json } => list_products(&catalog, order.into(), json, &mut out),
        Commands::Add {
            title,
            price,
            description,
            image,
        } => {
            let form = form_from_args(Some(title), Some(price), description, image);
            add_product(&catalog, &form, &mut out)
        }
        Commands::Update {
            id,
            title,
            price,
            description,
            image,
        } => {
            let form = form_from_args(title, price, description, image);
            update_product(&catalog, id, &form, &mut out)
        }
        Commands::Delete { id, yes } => {
            let confirm = |id: ProductId| {
                if yes {
                    return Ok(true);
                }
                dialoguer::Confirm::new()
                    .with_prompt(format!("Delete product ID: {id}?"))
                    .default(false)
                    .interact()
                    .context("Confirmation prompt failed; pass --yes to skip it")
            };
            delete_product(&catalog, id, confirm, &mut out)
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

/// `RUST_LOG` wins; otherwise `warn`, or `debug` with `--verbose`.
///
/// The kiosk owns the terminal, so it only logs when a file is given.
/// Commands log to stderr.
fn init_logging(verbose: bool, log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None if interactive => return Ok(()),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    result.map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}

// ============================================================================
// Commands
// ============================================================================

fn form_from_args(
    title: Option<String>,
    price: Option<String>,
    description: Option<String>,
    image: Option<String>,
) -> FormState {
    let mut form = FormState::new();
    let values = [title, price, description, image];
    for (field, value) in FormField::ALL.into_iter().zip(values) {
        if let Some(value) = value {
            form.set_field(field, value);
        }
    }
    form
}

fn list_products<B: Backend>(
    catalog: &Catalog<B>,
    order: ListOrder,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let products = catalog.list(order).context("Failed to load the catalog")?;

    if json {
        serde_json::to_writer_pretty(&mut *out, &products)?;
        writeln!(out)?;
        return Ok(());
    }

    if products.is_empty() {
        writeln!(out, "No products in the catalog.")?;
        return Ok(());
    }
    for p in &products {
        writeln!(
            out,
            "{:<5}  {:<28}  {:>12}  {}",
            p.id,
            p.title,
            p.display_price(),
            p.description.as_deref().unwrap_or("-"),
        )?;
    }
    Ok(())
}

fn add_product<B: Backend>(
    catalog: &Catalog<B>,
    form: &FormState,
    out: &mut impl Write,
) -> Result<()> {
    let fields = form.to_fields()?;
    catalog.insert(&fields).context("Failed to add product")?;
    tracing::info!(title = %fields.title, "product added");
    writeln!(
        out,
        "{} Product added: {} ({})",
        style("✓").green(),
        fields.title,
        techmarket_catalog::format_price(fields.price),
    )?;
    Ok(())
}

fn update_product<B: Backend>(
    catalog: &Catalog<B>,
    id: ProductId,
    form: &FormState,
    out: &mut impl Write,
) -> Result<()> {
    let patch = form.to_patch()?;
    let matched = catalog
        .update(Some(id), &ProductChange::PartialPatch(patch))
        .with_context(|| format!("Failed to update product {id}"))?;
    if matched == 0 {
        bail!("No product with ID {id}.");
    }
    tracing::info!(id, "product updated");
    writeln!(out, "{} Product {id} updated.", style("✓").green())?;
    Ok(())
}

fn delete_product<B: Backend>(
    catalog: &Catalog<B>,
    id: ProductId,
    confirm: impl FnOnce(ProductId) -> Result<bool>,
    out: &mut impl Write,
) -> Result<()> {
    if !confirm(id)? {
        tracing::debug!(id, "delete declined");
        writeln!(out, "Cancelled.")?;
        return Ok(());
    }
    let matched = catalog
        .delete(Some(id))
        .with_context(|| format!("Failed to delete product {id}"))?;
    if matched == 0 {
        bail!("No product with ID {id}.");
    }
    tracing::info!(id, "product deleted");
    writeln!(out, "{} Product {id} removed.", style("✓").green())?;
    Ok(())
}
