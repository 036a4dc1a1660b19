//! `crm-bulk` - run bulk actions against an in-memory CRM store

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use crm_bulk::{
    ActionKind, BulkConfig, BulkOrchestrator, MemoryStore, Notification, Notifier,
    NoopInvalidator, RecordId, RecordSnapshot, Selection, StoreError,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter};

/// Keeps notifications so they can be printed after the run
#[derive(Debug, Default)]
struct CollectingNotifier(Mutex<Vec<Notification>>);

impl Notifier for CollectingNotifier {
    fn notify(&self, notification: Notification) {
        tracing::debug!(kind = ?notification.kind, "{}", notification.message);
        self.0.lock().push(notification);
    }
}

fn cli() -> Command {
    Command::new("crm-bulk")
        .version(crm_bulk::VERSION)
        .about("CRM bulk mutation orchestrator")
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("Path to a TOML config file"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("run")
                .about("Seed opportunities and run one bulk action over all of them")
                .arg(
                    Arg::new("action")
                        .long("action")
                        .required(true)
                        .value_parser(|s: &str| s.parse::<ActionKind>())
                        .help("change_stage, change_status, assign_owner or archive"),
                )
                .arg(
                    Arg::new("value")
                        .long("value")
                        .help("New stage, status or owner id"),
                )
                .arg(
                    Arg::new("records")
                        .long("records")
                        .default_value("5")
                        .value_parser(value_parser!(i64).range(1..))
                        .help("Number of opportunities to seed and select"),
                )
                .arg(
                    Arg::new("select")
                        .long("select")
                        .value_delimiter(',')
                        .value_parser(value_parser!(i64))
                        .help("Record ids to select (default: every seeded record)"),
                )
                .arg(
                    Arg::new("latency-ms")
                        .long("latency-ms")
                        .default_value("100")
                        .value_parser(value_parser!(u64))
                        .help("Simulated latency of every store call"),
                )
                .arg(
                    Arg::new("fail-ids")
                        .long("fail-ids")
                        .value_delimiter(',')
                        .value_parser(value_parser!(i64))
                        .help("Record ids whose update fails"),
                )
                .arg(
                    Arg::new("fail-audit")
                        .long("fail-audit")
                        .action(ArgAction::SetTrue)
                        .help("Make audit record creation fail"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(Command::new("config").about("Print the effective configuration as TOML"))
}

/// Log subscriber writing to `writer`; stdout is left to the report
fn log_subscriber<W>(
    json: bool,
    filter: EnvFilter,
    writer: W,
) -> Box<dyn tracing::Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        Box::new(registry.with(tracing_subscriber::fmt::layer().json().with_writer(writer)))
    } else {
        Box::new(registry.with(tracing_subscriber::fmt::layer().with_writer(writer)))
    }
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing::subscriber::set_global_default(log_subscriber(json, filter, std::io::stderr))
        .context("installing log subscriber")
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<BulkConfig> {
    match matches.get_one::<String>("config") {
        Some(path) => BulkConfig::load(path).with_context(|| format!("loading {path}")),
        None => Ok(BulkConfig::default()),
    }
}

fn seed(store: &MemoryStore, resource: &str, count: i64) -> Vec<RecordSnapshot> {
    (1..=count)
        .map(|id| {
            let record = json!({
                "id": id,
                "name": format!("Opportunity {id}"),
                "stage": "new_lead",
                "status": "active",
                "customer_organization_id": 100 + id,
                "opportunity_owner_id": 1,
            });
            store.insert(resource, record.clone());
            RecordSnapshot::new(record)
        })
        .collect()
}

async fn run(matches: &ArgMatches, config: BulkConfig) -> anyhow::Result<bool> {
    let action = *matches
        .get_one::<ActionKind>("action")
        .context("missing --action")?;
    let records = *matches.get_one::<i64>("records").context("missing --records")?;
    let latency = *matches.get_one::<u64>("latency-ms").context("missing --latency-ms")?;
    let json_output = matches.get_flag("json");

    let store = MemoryStore::new().with_latency(Duration::from_millis(latency));
    let snapshots = seed(&store, &config.resource, records);
    for id in matches.get_many::<i64>("fail-ids").into_iter().flatten() {
        store.fail_update(
            RecordId::Int(*id),
            StoreError::Rejected(format!("injected failure for {id}")),
        );
    }
    store.fail_create(matches.get_flag("fail-audit"));
    let store = Arc::new(store);

    let selected: Vec<RecordId> = match matches.get_many::<i64>("select") {
        Some(ids) => ids.copied().map(RecordId::Int).collect(),
        None => snapshots.iter().filter_map(RecordSnapshot::id).collect(),
    };
    let selection = Selection::from_ids_and_records(selected, &snapshots);
    let selected = selection.len();

    let notifier = Arc::new(CollectingNotifier::default());
    let orchestrator = BulkOrchestrator::new(
        Arc::clone(&store) as Arc<dyn crm_bulk::RecordStore>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        Arc::new(NoopInvalidator),
    )
    .with_config(config);

    orchestrator.select(selection);
    orchestrator.open_dialog(action);
    if let Some(value) = matches.get_one::<String>("value") {
        orchestrator.set_parameter(value.as_str());
    }
    if !orchestrator.can_execute() {
        bail!("{action} requires --value");
    }

    let start = Instant::now();
    let report = orchestrator.handle_execute_bulk_action().await?;
    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let (succeeded, failed) = report
        .outcome()
        .map_or((0, 0), |o| (o.success_count(), o.failure_count()));
    let aborted = report.is_aborted();
    // The process would exit before detached audit tasks finish, so wait here
    let audit = match report.into_audit() {
        Some(batch) => Some(batch.wait().await),
        None => None,
    };
    let notifications = notifier.0.lock().clone();

    if json_output {
        let output = json!({
            "action": action,
            "records": records,
            "selected": selected,
            "succeeded": succeeded,
            "failed": failed,
            "aborted": aborted,
            "elapsed_ms": elapsed_ms,
            "notifications": notifications,
            "audit": audit.map(|a| json!({"created": a.created, "failed": a.failed})),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Bulk {action} over {selected} of {records} record(s)");
        for notification in &notifications {
            println!("  [{:?}] {}", notification.kind, notification.message);
        }
        if let Some(audit) = audit {
            println!("  Audit: {} created, {} failed", audit.created, audit.failed);
        }
        println!("  Elapsed: {elapsed_ms}ms");
    }

    Ok(failed == 0 && !aborted)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"))?;
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("run", args)) => {
            let clean = run(args, config).await?;
            std::process::exit(if clean { 0 } else { 1 });
        }
        Some(("config", _)) => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
        _ => {}
    }
    Ok(())
}
