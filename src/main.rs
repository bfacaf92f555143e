use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use scorecard_report::config::AppConfig;
use scorecard_report::error::AppError;
use scorecard_report::mail::SmtpMailer;
use scorecard_report::routes::{router, AppState};
use scorecard_report::scorecard::pdf::PdfRenderer;
use scorecard_report::scorecard::AssessmentSubmission;
use scorecard_report::telemetry;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "Scorecard Report Service",
    about = "Render cyber resilience scorecard PDFs and email them to submitters",
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
    /// Render a submission JSON file to a PDF without emailing it
    Render(RenderArgs),
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
struct RenderArgs {
    /// Path to a JSON file holding an assessment submission
    input: PathBuf,
    /// Output directory for the rendered PDF (defaults to PDF_OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Render(args) => run_render(args),
    }
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

    let mailer = SmtpMailer::from_config(&config.smtp)?;
    let renderer = PdfRenderer::new(&config.output.directory);

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
        renderer: Arc::new(renderer),
        mailer: Arc::new(mailer),
    };

    let app = router(state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, smtp_host = %config.smtp.host, "scorecard report service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_render(args: RenderArgs) -> Result<(), AppError> {
    let config = AppConfig::load().ok();
    let output_dir = args
        .output_dir
        .or_else(|| config.map(|c| c.output.directory))
        .unwrap_or_else(|| PathBuf::from("pdf_output"));

    let raw = std::fs::read(&args.input)?;
    let submission: AssessmentSubmission =
        serde_json::from_slice(&raw).map_err(AppError::Decode)?;

    let renderer = PdfRenderer::new(output_dir);
    let path = renderer.render(&submission)?.persist();
    println!("Rendered {}", path.display());
    Ok(())
}
