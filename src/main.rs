use anyhow::Context;
use clap::Parser;
use sheet_sms::core::{MessagingGateway, SpreadsheetSource};
use sheet_sms::utils::error::ErrorSeverity;
use sheet_sms::utils::{logger, validation::Validate};
use sheet_sms::{
    AppConfig, CampaignEngine, CampaignError, CliArgs, ConsoleProgress, ContactLoader,
    CsvDirectorySource, Dispatcher, PreparedCampaign,
};
use sheet_sms::core::CampaignSummary;
use std::time::Duration;

const PREVIEW_ROWS: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    logger::init_logger(args.verbose, args.log_json);
    tracing::info!("Starting sheet-sms");

    if let Err(e) = args.validate() {
        exit_with(&e);
    }

    let config = AppConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load config file '{}'", args.config))?;
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        exit_with(&e);
    }

    let result = match &args.csv_dir {
        Some(dir) => {
            tracing::info!("Reading contacts from CSV files in {}", dir);
            run(CsvDirectorySource::new(dir), &args, &config).await
        }
        None => match config.sheets_source() {
            Ok(source) => run(source, &args, &config).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        tracing::error!(
            "Campaign failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        if let CampaignError::Aborted { partial, .. } = &e {
            println!();
            println!("⚠️ Campaign aborted, messages handled before the crash:");
            print_summary(partial);
        }
        exit_with(&e);
    }
    Ok(())
}

async fn run<S: SpreadsheetSource>(
    source: S,
    args: &CliArgs,
    config: &AppConfig,
) -> sheet_sms::Result<()> {
    let request = args.campaign_request()?;
    let pacing = args
        .pacing_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.pacing());

    let engine = CampaignEngine::new(
        ContactLoader::new(source),
        Dispatcher::new(config.gateway()?).with_pacing(pacing),
    )
    .with_unit_cost(config.unit_cost());

    println!("1️⃣ Loading contacts...");
    let prepared = engine.prepare(&request).await?;
    println!("✅ Data loaded successfully!");
    println!();
    display_preview(&prepared, engine.dispatcher().gateway());

    if args.dry_run {
        println!("🔍 DRY RUN: no messages were sent.");
        return Ok(());
    }

    println!("🚀 Launching campaign...");
    let summary = engine.launch(&prepared, &ConsoleProgress).await?;

    println!();
    println!("🎉 Campaign completed!");
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &CampaignSummary) {
    println!("  ✅ Sent successfully: {}", summary.sent);
    println!("  ❌ Failed: {}", summary.failed);
    if !summary.failures.is_empty() {
        println!("  Failed numbers:");
        for failure in &summary.failures {
            println!("    {}", failure);
        }
    }
}

fn display_preview<G: MessagingGateway>(prepared: &PreparedCampaign, gateway: &G) {
    let table = &prepared.table;

    println!("2️⃣ Preview & configure");
    println!("  Columns: {}", table.columns().join(", "));
    for record in table.preview(PREVIEW_ROWS) {
        let cells: Vec<&str> = table
            .columns()
            .iter()
            .map(|c| record.get(c).unwrap_or_default())
            .collect();
        println!("    {}", cells.join(" | "));
    }
    println!("  Phone column: {}", prepared.phone_column);
    println!("  📊 Total contacts: {}", table.size());
    println!();

    println!("3️⃣ Message");
    println!("  {}", prepared.template.as_str());
    println!(
        "  Characters used: {}/{}",
        prepared.template.char_count(),
        sheet_sms::domain::model::MAX_MESSAGE_CHARS
    );
    println!("  Estimated cost: ${}", prepared.estimated_cost);
    println!("  Total messages: {}", table.size());
    match gateway.sender() {
        Some(from) if gateway.is_authenticated() => println!("  Sending from: {}", from),
        _ => println!("  ⚠️ Gateway credentials missing, sending is disabled"),
    }
    println!();
}

fn exit_with(e: &CampaignError) -> ! {
    tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
