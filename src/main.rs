use actix_cors::Cors;
use actix_web::{
    http::header,
    middleware::{DefaultHeaders, Logger},
    web, App, HttpResponse, HttpServer, Responder,
};
use campaign_backend::{
    config::Config,
    helper::publisher::SimulatedPublisher,
    helper::queue_processor::QueueProcessor,
    models::db_operations::document_store::DocumentStore,
    models::RolePermissionTable,
    routes,
    setup::db_setup,
    AppState,
};
use r2d2_sqlite::SqliteConnectionManager;
use r2d2::Pool;
use std::fs;
use std::sync::Arc;
use clap::Parser;
use std::path::PathBuf;

/// A simple handler for the root URL.
async fn root_handler() -> impl Responder {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}

#[derive(Parser, Debug)]
#[command(
    name = "campaign_server",
    author,
    version,
    about = "Starts the campaign workflow server."
)]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

fn build_cors(allowed_origins: &str) -> Cors {
    let allowed_headers = vec![
        header::ACCEPT,
        header::CONTENT_TYPE,
        header::HeaderName::from_static("x-user-id"),
        header::HeaderName::from_static("x-organization-id"),
    ];
    if allowed_origins.trim() == "*" {
        Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(allowed_headers)
            .max_age(3600)
    } else {
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
            cors = cors.allowed_origin(origin);
        }
        cors.allowed_methods(vec!["GET", "POST"])
            .allowed_headers(allowed_headers)
            .max_age(3600)
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    // Load configuration first
    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    // Initialize logger using the value from config
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    for path in [config.members_db_path(), config.documents_db_path()] {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create database directory");
        }
    }

    let store = DocumentStore::open(&config.documents_db_path())
        .expect("FATAL: Failed to open the document store.");

    let manager = SqliteConnectionManager::file(config.members_db_path());
    let pool = Pool::builder()
        .build(manager)
        .expect("FATAL: Failed to create Rusqlite connection pool.");
    {
        let mut conn = pool.get().expect("Failed to get DB connection for initial setup.");
        db_setup::setup_members_db(&mut conn).expect("FATAL: Failed to prepare the members table.");
    }

    let publisher = Arc::new(SimulatedPublisher);
    let processor = Arc::new(QueueProcessor::new(store.clone(), publisher, &config.queue));
    log::info!(
        "Queue processor {} polling every {}s",
        processor.worker_id(),
        config.queue.poll_interval().as_secs()
    );

    actix_web::rt::spawn(processor.clone().run_polling(config.queue.poll_interval()));

    let app_state = web::Data::new(AppState {
        store,
        permissions: Arc::new(RolePermissionTable::standard()),
        processor,
    });

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    println!("🚀 Server starting at http://{}", server_address);

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&config.allowed_origins))
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
            )
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(pool.clone()))
            .app_data(app_state.clone())
            .configure(routes::config_api)
            .route("/", web::get().to(root_handler))
    })
    .bind(server_address)?
    .run()
    .await
}
