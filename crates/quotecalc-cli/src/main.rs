//! quotecalc CLI - recalculates quote cash-flow templates

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use quotecalc::prelude::*;
use quotecalc::{bulk_product_template, fill_template, load_workbook, parse_bulk_products};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "quotecalc")]
#[command(author, version, about = "Quote cash-flow template calculator")]
struct Cli {
    /// JSON file overriding the default template layout
    #[arg(long, global = true)]
    layout: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill a template from a quote, recalculate FC and print VPL and margin
    Calculate {
        /// Cash-flow template (.xlsx)
        template: PathBuf,

        /// Quote as JSON
        quote: PathBuf,

        /// Also save the recalculated workbook
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fill a template with a quote's line items without recalculating
    Fill {
        /// Cash-flow template (.xlsx)
        template: PathBuf,

        /// Quote as JSON
        quote: PathBuf,

        /// Output file (default: fluxo-de-caixa-<quote>.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate one sheet and print every non-empty cell
    Evaluate {
        /// Input workbook (.xlsx)
        input: PathBuf,

        /// Sheet to evaluate
        #[arg(short, long, default_value = "FC")]
        sheet: String,
    },

    /// Write the blank bulk product upload sheet
    Template {
        /// Output file
        #[arg(default_value = "produtos.xlsx")]
        output: PathBuf,
    },

    /// Read products from a filled upload sheet and print them as JSON
    Import {
        /// Filled upload (.xlsx)
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let layout = read_layout(cli.layout.as_deref())?;

    match cli.command {
        Commands::Calculate {
            template,
            quote,
            output,
        } => calculate(&template, &quote, output.as_deref(), &layout),
        Commands::Fill {
            template,
            quote,
            output,
        } => fill(&template, &quote, output, &layout),
        Commands::Evaluate { input, sheet } => evaluate(&input, &sheet),
        Commands::Template { output } => write_upload_template(&output),
        Commands::Import { input } => import(&input),
    }
}

fn read_layout(path: Option<&Path>) -> Result<TemplateLayout> {
    let Some(path) = path else {
        return Ok(TemplateLayout::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read layout '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid layout in '{}'", path.display()))
}

fn read_quote(path: &Path) -> Result<Quote> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read quote '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid quote in '{}'", path.display()))
}

fn open(path: &Path) -> Result<Workbook> {
    Workbook::open(path).with_context(|| format!("Failed to open '{}'", path.display()))
}

fn calculate(
    template: &Path,
    quote: &Path,
    output: Option<&Path>,
    layout: &TemplateLayout,
) -> Result<()> {
    let quote = read_quote(quote)?;
    let mut workbook = open(template)?;

    let result = update_cash_flow(&mut workbook, &quote, layout)
        .with_context(|| format!("Failed to update cash flow for quote {}", quote.number))?;

    if let Some(failure) = &result.failure {
        eprintln!("Warning: recalculation failed, outputs read from stored values: {failure}");
    }
    if !result.outputs.defaulted.is_empty() {
        eprintln!(
            "Warning: defaulted to 0: {}",
            result.outputs.defaulted.join(", ")
        );
    }

    if let Some(path) = output {
        workbook
            .save(path)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        eprintln!("Wrote '{}'", path.display());
    }

    let json = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
    println!("{json}");
    Ok(())
}

fn fill(
    template: &Path,
    quote: &Path,
    output: Option<PathBuf>,
    layout: &TemplateLayout,
) -> Result<()> {
    let quote = read_quote(quote)?;
    let mut workbook = open(template)?;

    let report = fill_template(&mut workbook, &quote, layout)
        .with_context(|| format!("Failed to fill template for quote {}", quote.number))?;

    let path = output
        .unwrap_or_else(|| PathBuf::from(format!("fluxo-de-caixa-{}.xlsx", quote.number)));
    workbook
        .save(&path)
        .with_context(|| format!("Failed to write '{}'", path.display()))?;

    eprintln!(
        "Wrote '{}' ({} cells created, {} overwritten)",
        path.display(),
        report.created,
        report.overwritten
    );
    Ok(())
}

fn evaluate(input: &Path, sheet: &str) -> Result<()> {
    let mut workbook = open(input)?;
    let table = workbook
        .evaluate_sheet_with_options(sheet, &CalculationOptions { write_back: false })
        .with_context(|| format!("Failed to evaluate sheet '{sheet}'"))?;

    let mut stdout = io::stdout().lock();
    for (address, value) in table.iter() {
        writeln!(stdout, "{address}\t{value}").context("Failed to write to stdout")?;
    }

    let stats = table.stats();
    eprintln!(
        "Evaluated {} formulas ({} errors)",
        stats.cells_calculated, stats.errors
    );
    Ok(())
}

fn write_upload_template(output: &Path) -> Result<()> {
    if output.exists() {
        bail!("'{}' already exists", output.display());
    }
    let workbook = bulk_product_template().context("Failed to build upload template")?;
    workbook
        .save(output)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;
    eprintln!("Wrote '{}'", output.display());
    Ok(())
}

fn import(input: &Path) -> Result<()> {
    let bytes =
        std::fs::read(input).with_context(|| format!("Failed to read '{}'", input.display()))?;
    let workbook = load_workbook(&bytes)
        .with_context(|| format!("'{}' is not a valid workbook", input.display()))?;
    let products = parse_bulk_products(&workbook)
        .with_context(|| format!("Failed to read products from '{}'", input.display()))?;

    let json = serde_json::to_string_pretty(&products).context("Failed to serialize products")?;
    println!("{json}");
    eprintln!("Read {} products", products.len());
    Ok(())
}
