use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use course_server::api::{self, AppState};
use course_server::store::sqlite::SqliteStore;
use course_server::store::{AssignmentStore, CourseCatalog, ProgressStore};
use course_server::utils::init_log;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to database file
    #[arg(short, long, default_value = "./database/course.db")]
    database: PathBuf,

    /// Log directory, stdout when omitted
    #[arg(short, long)]
    log: Option<PathBuf>,

    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value = "8080")]
    port: u16,
}

#[derive(OpenApi)]
#[openapi(paths(
    course_server::api::progress::get_user_course_progress,
    course_server::api::progress::update_user_course_progress,
    course_server::api::progress::get_user_enrolled_courses,
    course_server::api::progress::get_all_students_progress,
    course_server::api::assignment::create_assignment,
    course_server::api::assignment::list_assignments,
    course_server::api::assignment::get_user_assignment,
    course_server::api::assignment::get_user_assigned_courses,
    course_server::api::assignment::get_manager_assigned_courses,
))]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let _guard = init_log(args.log.clone());

    let store = Arc::new(SqliteStore::open(&args.database).await?);
    let state = AppState::new(
        store.clone() as Arc<dyn ProgressStore>,
        store.clone() as Arc<dyn AssignmentStore>,
        store as Arc<dyn CourseCatalog>,
    );

    let app = api::router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;
    tracing::info!("listening on http://{}:{}", args.host, args.port);
    tracing::info!(
        "swagger ui at http://{}:{}/swagger-ui",
        args.host,
        args.port
    );
    axum::serve(listener, app).await?;

    Ok(())
}
