use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use microloan_risk::assessment::AssessmentService;
use microloan_risk::config::AppConfig;
use microloan_risk::dashboard::format_dashboard;
use microloan_risk::error::AppError;
use microloan_risk::import::import_borrowers_from_path;
use microloan_risk::llm::LlmClient;
use microloan_risk::policy::ApprovalPolicy;
use microloan_risk::refresh::RefreshJob;
use microloan_risk::regional::RegionalData;
use microloan_risk::routes::{router, ApiState};
use microloan_risk::store::BorrowerStore;
use microloan_risk::telemetry;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "Microloan Risk Assessment Tool",
    about = "Score and track microloan borrowers against regional economic data",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the borrower dashboard to the console
    Dashboard,
    /// Import borrowers from a CSV file and assess each row
    Import(ImportArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// CSV file with name,region,loan_amount[,repayment_rate] columns
    #[arg(long)]
    file: PathBuf,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Dashboard => run_dashboard(),
        Command::Import(args) => run_import(args),
    }
}

fn build_service(config: &AppConfig) -> Result<AssessmentService, AppError> {
    let store = BorrowerStore::open(&config.database.path)
        .map_err(|err| AppError::store("opening borrower store", err))?;
    let regional = RegionalData::load_or_builtin(&config.regional.path);
    let llm = config.llm.api_key.clone().map(LlmClient::new);
    Ok(AssessmentService::new(
        store,
        regional,
        ApprovalPolicy::default(),
        llm,
    ))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let store = BorrowerStore::open(&config.database.path)
        .map_err(|err| AppError::store("opening borrower store", err))?;
    let regional = RegionalData::load_or_builtin(&config.regional.path);
    let llm = config.llm.api_key.clone().map(LlmClient::new);
    if llm.is_none() {
        info!("no API key configured, explanation enhancement disabled");
    }
    let service = Arc::new(AssessmentService::new(
        store.clone(),
        regional,
        ApprovalPolicy::default(),
        llm,
    ));

    RefreshJob::new(
        store,
        ApprovalPolicy::default(),
        config.regional.path.clone(),
        config.refresh.interval,
    )
    .spawn();

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = ApiState {
        service,
        readiness: readiness_flag.clone(),
    };

    let app = router(state)
        .layer(Extension(Arc::new(prometheus_handle)))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "microloan risk assessment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_dashboard() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config)?;
    let borrowers = service
        .list()
        .map_err(|err| AppError::store("listing borrowers", err))?;
    println!("{}", format_dashboard(&borrowers));
    Ok(())
}

fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config)?;
    let summary = import_borrowers_from_path(&service, &args.file)?;
    println!(
        "Imported {} borrower(s), rejected {} malformed row(s)",
        summary.imported, summary.rejected
    );
    Ok(())
}
