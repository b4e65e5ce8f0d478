use anyhow::{Context, Result, bail};
use tracing::{info, info_span, trace, warn};

use hrb_cli::config::BridgeConfig;
use hrb_cli::logging::redact_value;
use hrb_ingest::{read_csv_records, write_data_values, write_record_set};
use hrb_load::{AggregateClient, MemoryDestination, MySqlDestination, MySqlSource, SubmissionOutcome};
use hrb_migrate::{
    ART_HISTORY_QUERY, PERSON_ID_COLUMN, PERSON_TABLE, PRISONERS_QUERY, PrisonSource, run_migration,
};
use hrb_model::{DataValueSet, RunReport, Value};
use hrb_transform::{FactReshaper, ValuePolicy, pivot_records};

use crate::cli::{AggregateArgs, MigrateArgs, PolicyArg, ReverseArgs};
use crate::types::CommandResult;

pub fn run_aggregate(config: &BridgeConfig, args: &AggregateArgs) -> Result<CommandResult> {
    let span = info_span!("aggregate", input = %args.input.display());
    let _guard = span.enter();

    let section = config.aggregate()?;
    let resolver = config.lookups.resolver().context("build lookup tables")?;
    let reshape_config = section.reshape_config();
    let reshaper = FactReshaper::new(&reshape_config, &resolver)?;

    let records = read_csv_records(&args.input)
        .with_context(|| format!("read {}", args.input.display()))?;
    let reshaped = reshaper.reshape_all(&records);
    let policy = args.policy.map_or(section.value_policy, |policy| match policy {
        PolicyArg::NonNegative => ValuePolicy::NonNegative,
        PolicyArg::StrictlyPositive => ValuePolicy::StrictlyPositive,
    });
    let checked = policy.apply(&reshaped.facts);

    let mut result = CommandResult::new("aggregate");
    result.report.extend_diagnostics(reshaped.diagnostics);
    result.report.extend_diagnostics(checked.diagnostics);

    if let Some(path) = &args.output {
        write_data_values(path, &checked.values)
            .with_context(|| format!("write {}", path.display()))?;
        result
            .report
            .record_write(path.display().to_string(), checked.values.len() as u64);
    }

    if args.dry_run {
        info!(values = checked.values.len(), "dry run, nothing submitted");
        return Ok(finish(result));
    }
    if checked.values.is_empty() {
        warn!("no data values to submit");
        return Ok(finish(result));
    }

    let server = config.dhis2()?;
    let password = args
        .password
        .as_deref()
        .context("no aggregate server password; set HRB_DHIS2_PASSWORD or pass --dhis2-password")?;
    let client = AggregateClient::new(&server.base_url, &server.username, password, server.timeout())?;
    let payload = DataValueSet::new(checked.values);
    let outcome = client.submit(&payload)?;
    match &outcome {
        SubmissionOutcome::Accepted { .. } => {
            result.report.record_write(client.endpoint(), payload.len() as u64);
        }
        SubmissionOutcome::Rejected { status, .. } => {
            result
                .report
                .record_failure(client.endpoint(), format!("rejected with HTTP {status}"));
        }
    }
    result.outcome = Some(outcome);
    Ok(finish(result))
}

pub fn run_migrate(config: &BridgeConfig, args: &MigrateArgs) -> Result<CommandResult> {
    let span = info_span!("migrate", dry_run = args.dry_run);
    let _guard = span.enter();

    let settings = &config.migration.settings;
    let source = load_prison_source(args)?;
    let mut result = CommandResult::new("migrate");

    if args.dry_run {
        let mut destination = MemoryDestination::permissive();
        if args.watermark > 0 {
            destination.seed(PERSON_TABLE, vec![(PERSON_ID_COLUMN, Value::Int(args.watermark))]);
        }
        let outcome = run_migration(&source, &mut destination, settings, &mut result.report);
        result.capture(outcome);
        return Ok(finish(result));
    }

    let url = args
        .destination_url
        .as_deref()
        .context("no destination; pass --destination-url or --dry-run")?;
    let mut destination = MySqlDestination::connect(url).context("connect to destination")?;
    let lock = &config.migration;
    if !destination.acquire_lock(&lock.lock_name, lock.lock_timeout_secs)? {
        bail!(
            "migration lock '{}' is held by another run",
            lock.lock_name
        );
    }
    let outcome = run_migration(&source, &mut destination, settings, &mut result.report);
    if let Err(err) = destination.release_lock(&lock.lock_name) {
        warn!(error = %err, "failed to release migration lock");
    }
    result.capture(outcome);
    Ok(finish(result))
}

pub fn run_reverse(config: &BridgeConfig, args: &ReverseArgs) -> Result<CommandResult> {
    let span = info_span!("reverse", input = %args.input.display());
    let _guard = span.enter();

    let resolver = config.lookups.resolver().context("build lookup tables")?;
    let records = read_csv_records(&args.input)
        .with_context(|| format!("read {}", args.input.display()))?;
    let pivoted = pivot_records(&records, &resolver)?;
    write_record_set(&args.output, &pivoted.records)
        .with_context(|| format!("write {}", args.output.display()))?;

    let mut result = CommandResult::new("reverse");
    result
        .report
        .record_write(args.output.display().to_string(), pivoted.records.len() as u64);
    result.report.extend_diagnostics(pivoted.diagnostics);
    Ok(finish(result))
}

fn load_prison_source(args: &MigrateArgs) -> Result<PrisonSource> {
    if let (Some(prisoners), Some(art_history)) = (&args.prisoners, &args.art_history) {
        return Ok(PrisonSource {
            prisoners: read_csv_records(prisoners)
                .with_context(|| format!("read {}", prisoners.display()))?,
            art_history: read_csv_records(art_history)
                .with_context(|| format!("read {}", art_history.display()))?,
        });
    }
    let url = args
        .source_url
        .as_deref()
        .context("no source; pass --prisoners with --art-history, or --source-url")?;
    let mut source = MySqlSource::connect(url).context("connect to source database")?;
    Ok(PrisonSource {
        prisoners: source.fetch(PRISONERS_QUERY)?,
        art_history: source.fetch(ART_HISTORY_QUERY)?,
    })
}

fn finish(result: CommandResult) -> CommandResult {
    log_diagnostics(&result.report);
    info!(
        command = result.command,
        rows = result.report.total_rows(),
        skipped = result.report.diagnostics.len(),
        "run finished"
    );
    result
}

fn log_diagnostics(report: &RunReport) {
    for diagnostic in &report.diagnostics {
        let text = diagnostic.to_string();
        trace!(scope = %diagnostic.scope, detail = redact_value(&text), "skipped input");
    }
}
