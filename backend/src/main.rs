use actix_web::{web, App, HttpServer};
use choir_binder::config::{Config, DEFAULT_CONFIG_PATH};
use choir_binder::pipeline::renderer::{PdfRenderer, SheetRenderer};
use choir_binder::pipeline::resolver::MediaLocator;
use choir_binder::pipeline::scratch::ScratchArea;
use choir_binder::pipeline::Pipeline;
use choir_binder::regeneration::policy::DebouncePolicy;
use choir_binder::regeneration::state::{start_regeneration_worker, RegenerationState, SettleDelays};
use choir_binder::regeneration::Regenerator;
use choir_binder::services;
use choir_binder::store::{EventSource, GenerationLog, SqliteEventStore};
use clap::Parser;
use env_logger::Env;
use log::info;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about = "Event PDF assembly service")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let args = Args::parse();

    let config = Config::load(&args.config).map_err(io::Error::other)?;
    let time_zone = config.time_zone().map_err(io::Error::other)?;

    let store = Arc::new(SqliteEventStore::new(&config.database));
    store.init_schema().map_err(io::Error::other)?;

    let renderer: Arc<dyn SheetRenderer> = Arc::new(
        PdfRenderer::from_font_dir(&config.fonts_dir, &config.font_family, time_zone)
            .map_err(|e| io::Error::other(e.to_string()))?,
    );
    let events: Arc<dyn EventSource> = store.clone();
    let pipeline = Arc::new(Pipeline::new(
        events,
        renderer,
        MediaLocator::new(&config.public_dir),
        ScratchArea::new(&config.scratch_dir),
        time_zone,
    ));

    let log: Arc<dyn GenerationLog> = store.clone();
    let regenerator = Arc::new(Regenerator::new(
        pipeline.clone(),
        log.clone(),
        DebouncePolicy::new(config.debounce_window()),
        config.events_output_dir(),
    ));
    let delays = SettleDelays {
        created: Duration::from_millis(config.create_delay_ms),
        updated: Duration::from_millis(config.update_delay_ms),
    };

    // Start regeneration worker
    let (regeneration_state, rx) = RegenerationState::new();
    tokio::spawn(start_regeneration_worker(
        regeneration_state.clone(),
        rx,
        regenerator,
        delays,
    ));

    let host = config.host.clone();
    let port = config.port;
    info!("Server running at http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(64 * 1024))
            .app_data(web::Data::from(pipeline.clone()))
            .app_data(web::Data::from(log.clone()))
            .app_data(web::Data::from(store.clone()))
            .app_data(web::Data::new(regeneration_state.clone()))
            .service(services::events::configure_routes())
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
