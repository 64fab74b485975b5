use std::{fs, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use goods_receipts::{
    config,
    models::{DocumentUpload, EntityId, GoodsReceipt, ReceiptSummary},
    services::{FormEvent, ReceiptFormController},
    ReceiptServices, ServiceError,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize()?;

    match cli.command {
        Commands::List(args) => handle_list(&context, args, cli.json).await?,
        Commands::Show(args) => handle_show(&context, args, cli.json).await?,
        Commands::Approve(args) => handle_approve(&context, args, cli.json).await?,
        Commands::Submit(args) => handle_submit(&context, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "receipts", about = "Goods receipt workflow from the command line", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List receipts, newest first, optionally filtered by keyword
    List(ListArgs),
    /// Show one receipt with its line items
    Show(ReceiptArgs),
    /// Approve a draft receipt
    Approve(ReceiptArgs),
    /// Create or update a draft from a JSON file
    Submit(SubmitArgs),
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, help = "Search keyword, e.g. a receipt code")]
    keyword: Option<String>,
}

#[derive(Args)]
struct ReceiptArgs {
    #[arg(help = "Receipt id")]
    id: String,
}

#[derive(Args)]
struct SubmitArgs {
    #[arg(long, help = "Path to the draft JSON file")]
    file: PathBuf,
}

/// Draft as written by hand for `submit`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftFile {
    #[serde(default)]
    receipt_id: Option<EntityId>,
    purchase_order_id: EntityId,
    #[serde(default)]
    warehouse_id: Option<EntityId>,
    #[serde(default)]
    supplier_id: Option<EntityId>,
    #[serde(default)]
    receipt_date: Option<DateTime<Utc>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    lines: Vec<DraftLine>,
    #[serde(default)]
    documents: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftLine {
    product_id: EntityId,
    #[serde(default)]
    quantity: Option<u32>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    unit_price: Option<Decimal>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    stack: Option<u32>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    fee: Option<Decimal>,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitOutcome {
    receipt_id: Option<EntityId>,
}

struct CliContext {
    services: ReceiptServices,
}

impl CliContext {
    fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load client config")?;
        config::init_tracing(&config.log_level, config.log_json);
        debug!(api_base_url = %config.api_base_url, "receipts CLI starting");

        let services = ReceiptServices::from_config(config).map_err(user_error)?;
        Ok(Self { services })
    }
}

fn user_error(err: ServiceError) -> anyhow::Error {
    anyhow!(err.user_message())
}

async fn handle_list(context: &CliContext, args: ListArgs, json: bool) -> Result<()> {
    let list = context.services.list_controller();
    let keyword = args.keyword.unwrap_or_default();
    list.refresh(&keyword)
        .await
        .map_err(|e| anyhow!(e.notification("Load receipts")))?;

    let receipts = list.receipts();
    if json {
        return print_json(&receipts);
    }
    if receipts.is_empty() {
        println!("No goods receipts found");
    }
    for receipt in &receipts {
        render_summary(receipt);
    }
    Ok(())
}

async fn handle_show(context: &CliContext, args: ReceiptArgs, json: bool) -> Result<()> {
    let detail = context.services.detail_loader();
    let receipt = detail
        .load(&EntityId::from(args.id))
        .await
        .map_err(|e| anyhow!(e.notification("Load receipt")))?;

    if json {
        return print_json(&receipt);
    }
    render_receipt(&receipt);
    Ok(())
}

async fn handle_approve(context: &CliContext, args: ReceiptArgs, json: bool) -> Result<()> {
    let detail = context.services.detail_loader();
    detail
        .load(&EntityId::from(args.id))
        .await
        .map_err(|e| anyhow!(e.notification("Load receipt")))?;
    let receipt = detail
        .approve()
        .await
        .map_err(|e| anyhow!(e.notification("Approve")))?;

    if json {
        return print_json(&receipt);
    }
    println!(
        "Goods receipt {} is now {}",
        receipt.display_code(),
        receipt.status.label()
    );
    Ok(())
}

async fn handle_submit(context: &CliContext, args: SubmitArgs, json: bool) -> Result<()> {
    let raw = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read draft file {}", args.file.display()))?;
    let draft: DraftFile = serde_json::from_str(&raw)
        .with_context(|| format!("draft file {} is not valid", args.file.display()))?;

    let form = context.services.form_controller();
    fill_form(&form, draft).await.map_err(|e| anyhow!(e.user_message()))?;

    let event = form
        .submit()
        .await
        .map_err(|e| anyhow!(e.notification("Save receipt")))?;
    let receipt_id = match event {
        Some(FormEvent::Submitted { id }) => id,
        Some(FormEvent::Cancelled) | None => return Err(anyhow!("the receipt was not saved")),
    };

    if json {
        return print_json(&SubmitOutcome { receipt_id });
    }
    match receipt_id {
        Some(id) => println!("Goods receipt {} saved", id),
        None => println!("Goods receipt saved"),
    }
    Ok(())
}

async fn fill_form(form: &ReceiptFormController, draft: DraftFile) -> Result<(), ServiceError> {
    form.open(draft.receipt_id).await?;
    form.select_purchase_order(Some(draft.purchase_order_id)).await?;

    if draft.warehouse_id.is_some() {
        form.select_warehouse(draft.warehouse_id)?;
    }
    if draft.supplier_id.is_some() && !form.snapshot().supplier_locked {
        form.select_supplier(draft.supplier_id)?;
    }
    if let Some(date) = draft.receipt_date {
        form.set_receipt_date(date)?;
    }
    if draft.description.is_some() {
        form.set_description(draft.description)?;
    }
    if draft.note.is_some() {
        form.set_note(draft.note)?;
    }

    for line in draft.lines {
        let defaults = form.line_defaults(&line.product_id)?;
        let mut input = defaults.into_input();
        if let Some(quantity) = line.quantity {
            input.quantity = quantity;
        }
        if let Some(unit_price) = line.unit_price {
            input.unit_price = unit_price;
        }
        if let Some(location) = line.location {
            input = input.with_location(location);
        }
        if let Some(stack) = line.stack {
            input = input.with_stack(stack);
        }
        if let Some(fee) = line.fee {
            input = input.with_fee(fee);
        }
        if let Some(note) = line.note {
            input = input.with_note(note);
        }
        form.add_line_item(input)?;
    }

    for path in draft.documents {
        let bytes = fs::read(&path).map_err(|e| {
            ServiceError::ValidationError(format!("cannot read document {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        form.attach_document(DocumentUpload {
            file_name,
            content_type: None,
            bytes,
        })
        .await?;
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_summary(receipt: &ReceiptSummary) {
    println!(
        "- {} • {} • {} • supplier {} • subtotal {}",
        receipt.display_code(),
        receipt
            .receipt_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string()),
        receipt.status.label(),
        receipt
            .supplier
            .as_ref()
            .map(|s| s.label().to_string())
            .unwrap_or_else(|| "-".to_string()),
        receipt.sub_total
    );
}

fn render_receipt(receipt: &GoodsReceipt) {
    println!(
        "Goods receipt {} ({})",
        receipt.display_code(),
        receipt.status.label()
    );
    if let Some(order) = receipt.purchase_order_ref() {
        println!("  purchase order: {}", order);
    }
    if let Some(warehouse) = receipt.warehouse_ref() {
        println!("  warehouse: {}", warehouse);
    }
    if let Some(supplier) = receipt.supplier_ref() {
        println!("  supplier: {}", supplier);
    }
    for item in &receipt.products {
        println!(
            "  • {} x {} @ {} (total {}, location {}, stack {})",
            item.quantity,
            item.product_name.as_deref().unwrap_or(item.product_id.as_str()),
            item.unit_price,
            item.total_price,
            if item.location.is_empty() { "-" } else { &item.location },
            item.stack
        );
    }
    for document in &receipt.documents {
        println!("  document: {}", document.name);
    }
    match receipt.computed_sub_total() {
        Ok(total) => println!("  subtotal: {}", total),
        Err(issue) => println!("  subtotal: {}", issue),
    }
}
