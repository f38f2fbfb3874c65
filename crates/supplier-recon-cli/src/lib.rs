//! Command surface for the supplier reconciliation workspace.
//!
//! The `srq` binary plays the role of the external ingest/display
//! collaborator: it reads an order-extract document (a JSON array of rows
//! already renamed to the three logical fields), drives import cycles,
//! records qualification answers, and prints listings and the unified view
//! as tables or pretty JSON.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use supplier_recon_core::{
    CapabilityAnswer, CapabilityAnswers, OrderRow, PaymentTerms, QualificationRecord,
    QualificationStatus, SupplierMetric, UnifiedRow,
};
use supplier_recon_store_json::ReconWorkspace;

#[derive(Debug, Parser)]
#[command(name = "srq")]
#[command(about = "Supplier reconciliation and qualification CLI")]
pub struct Cli {
    /// Directory holding the persisted store documents.
    #[arg(long, default_value = "./supplier_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import an order extract and replace the metrics snapshot.
    Import(ImportArgs),
    /// List the persisted supplier metrics.
    Suppliers {
        #[command(subcommand)]
        command: SuppliersCommand,
    },
    /// Record or inspect qualification assessments.
    Qualify {
        #[command(subcommand)]
        command: Box<QualifyCommand>,
    },
    /// Print the unified reconciliation view.
    View(ViewArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Order extract document: a JSON array of rows with `supplier`,
    /// `acknowledged_at` and `ready_at` fields.
    #[arg(long)]
    file: PathBuf,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
pub enum SuppliersCommand {
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
pub enum QualifyCommand {
    Set(QualifySetArgs),
    Show(QualifyShowArgs),
}

#[derive(Debug, Args)]
pub struct QualifySetArgs {
    #[arg(long)]
    supplier: String,
    #[arg(long)]
    contact: Option<String>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    customs_handling: Option<AnswerArg>,
    #[arg(long)]
    shipment_tracking: Option<AnswerArg>,
    #[arg(long)]
    express_shipping: Option<AnswerArg>,
    #[arg(long)]
    packaging_compliance: Option<AnswerArg>,
    #[arg(long)]
    dedicated_contact: Option<AnswerArg>,
    #[arg(long)]
    standard_lead_days: Option<u32>,
    #[arg(long)]
    express_lead_days: Option<u32>,
    #[arg(long)]
    payment_terms: Option<PaymentTermsArg>,
    #[arg(long, default_value = "pending")]
    status: StatusArg,
    #[arg(long)]
    comment: Option<String>,
}

#[derive(Debug, Args)]
pub struct QualifyShowArgs {
    #[arg(long)]
    supplier: String,
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AnswerArg {
    Yes,
    No,
    Partial,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Pending,
    Approved,
    Conditional,
    Rejected,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PaymentTermsArg {
    Prepaid,
    Net30,
    Net60,
    LetterOfCredit,
}

fn map_answer(arg: AnswerArg) -> CapabilityAnswer {
    match arg {
        AnswerArg::Yes => CapabilityAnswer::Yes,
        AnswerArg::No => CapabilityAnswer::No,
        AnswerArg::Partial => CapabilityAnswer::Partial,
    }
}

fn map_status(arg: StatusArg) -> QualificationStatus {
    match arg {
        StatusArg::Pending => QualificationStatus::Pending,
        StatusArg::Approved => QualificationStatus::Approved,
        StatusArg::Conditional => QualificationStatus::Conditional,
        StatusArg::Rejected => QualificationStatus::Rejected,
    }
}

fn map_payment_terms(arg: PaymentTermsArg) -> PaymentTerms {
    match arg {
        PaymentTermsArg::Prepaid => PaymentTerms::Prepaid,
        PaymentTermsArg::Net30 => PaymentTerms::Net30,
        PaymentTermsArg::Net60 => PaymentTerms::Net60,
        PaymentTermsArg::LetterOfCredit => PaymentTerms::LetterOfCredit,
    }
}

/// Executes the parsed top-level CLI command graph.
///
/// # Errors
/// Returns an error when the workspace cannot be loaded or the requested
/// command fails; persisted state is left untouched on failure.
pub fn run_cli(cli: Cli) -> Result<()> {
    let mut workspace = ReconWorkspace::open(&cli.data_dir);
    workspace.load().context("failed loading workspace stores")?;

    match cli.command {
        Command::Import(args) => run_import(args, &mut workspace),
        Command::Suppliers { command } => run_suppliers(command, &workspace),
        Command::Qualify { command } => run_qualify(*command, &mut workspace),
        Command::View(args) => run_view(&args, &workspace),
    }
}

fn run_import(args: ImportArgs, workspace: &mut ReconWorkspace) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed reading order extract {}", args.file.display()))?;
    let rows: Vec<OrderRow> = serde_json::from_str(&raw)
        .map_err(|err| anyhow!("malformed order extract document: {err}"))?;

    let report = workspace.import(&rows)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "imported {} supplier(s) from {} row(s); skipped {} row(s); {} negative delay sample(s)",
            report.metrics.len(),
            rows.len(),
            report.skipped_rows,
            report.negative_delay_samples
        );
        print_metrics_table(&report.metrics);
    }
    Ok(())
}

fn run_suppliers(command: SuppliersCommand, workspace: &ReconWorkspace) -> Result<()> {
    match command {
        SuppliersCommand::List(args) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(workspace.metrics())?);
            } else {
                print_metrics_table(workspace.metrics());
            }
            Ok(())
        }
    }
}

fn run_qualify(command: QualifyCommand, workspace: &mut ReconWorkspace) -> Result<()> {
    match command {
        QualifyCommand::Set(args) => {
            let record = QualificationRecord {
                supplier_name: args.supplier,
                contact: args.contact.unwrap_or_default(),
                country: args.country.unwrap_or_default(),
                answers: CapabilityAnswers {
                    customs_handling: args.customs_handling.map(map_answer),
                    shipment_tracking: args.shipment_tracking.map(map_answer),
                    express_shipping: args.express_shipping.map(map_answer),
                    packaging_compliance: args.packaging_compliance.map(map_answer),
                    dedicated_contact: args.dedicated_contact.map(map_answer),
                },
                declared_standard_lead_days: args.standard_lead_days,
                declared_express_lead_days: args.express_lead_days,
                payment_terms: args.payment_terms.map(map_payment_terms),
                status: map_status(args.status),
                comment: args.comment.unwrap_or_default(),
            };

            workspace.record_qualification(record.clone())?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        QualifyCommand::Show(args) => {
            let Some(record) = workspace.qualification(&args.supplier) else {
                return Err(anyhow!(
                    "no qualification recorded for supplier {}",
                    args.supplier
                ));
            };
            println!("{}", serde_json::to_string_pretty(record)?);
            Ok(())
        }
    }
}

fn run_view(args: &ViewArgs, workspace: &ReconWorkspace) -> Result<()> {
    let view = workspace.unified_view();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view_table(&view);
    }
    Ok(())
}

fn format_mean(mean_lead_days: Option<f64>) -> String {
    match mean_lead_days {
        Some(mean) => format!("{mean:.1}"),
        None => "n/a".to_string(),
    }
}

fn print_metrics_table(metrics: &[SupplierMetric]) {
    println!(
        "{:<32} {:<8} {:<10} urgency",
        "supplier", "orders", "mean_days"
    );
    println!("{}", "-".repeat(64));
    for metric in metrics {
        println!(
            "{:<32} {:<8} {:<10} {}",
            metric.supplier_name,
            metric.order_count,
            format_mean(metric.mean_lead_days),
            metric.urgency.as_str()
        );
    }
}

fn print_view_table(view: &[UnifiedRow]) {
    println!(
        "{:<32} {:<8} {:<10} {:<13} {:<12} qualified",
        "supplier", "orders", "mean_days", "urgency", "status"
    );
    println!("{}", "-".repeat(90));
    for row in view {
        println!(
            "{:<32} {:<8} {:<10} {:<13} {:<12} {}",
            row.supplier_name,
            row.order_count,
            format_mean(row.mean_lead_days),
            row.urgency.as_str(),
            row.status.as_str(),
            if row.qualified { "yes" } else { "no" }
        );
    }
}
