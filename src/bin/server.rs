use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use pattern_cut::Error;
use pattern_cut::config::Config;
use pattern_cut::report::OptimizationReport;
use pattern_cut::solver::Solver;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::InvalidConfig(_) | Error::InvalidItemGeometry { .. } | Error::Input { .. } => {
            StatusCode::BAD_REQUEST
        }
        Error::NoFeasibleSolution | Error::TooManyPatterns { .. } | Error::InfeasibleDemand { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Error::Solver(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Runs one search to completion. Blocking; call from a worker thread.
fn run(config: Config) -> Result<OptimizationReport, Error> {
    let mut solver = Solver::new(&config)?;
    let outcome = solver.solve_with_progress(|p| {
        tracing::info!(generation = p.generation, best_cost = p.best_cost, "progress");
    })?;
    Ok(OptimizationReport::new(&outcome, solver.evaluator().item_types()))
}

async fn optimize(
    Json(config): Json<Config>,
) -> Result<Json<OptimizationReport>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&config).unwrap_or_default(),
        "POST /optimize"
    );

    config
        .validate()
        .map_err(|e| (status_for(&e), e.to_string()))?;

    // A worker that panics yields no partial result.
    let report = tokio::task::spawn_blocking(move || run(config))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "optimization worker failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "optimization worker failed".to_string(),
            )
        })?
        .map_err(|e| (status_for(&e), e.to_string()))?;

    Ok(Json(report))
}

fn app() -> Router {
    Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

fn main() {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    // Reporting is off unless a DSN is configured.
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(serve());
}

async fn serve() {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app()).await.unwrap();
}
