use crate::config::Config;
use crate::startup::AppState;

#[macro_use]
extern crate tracing;

mod cipher;
mod config;
mod db;
mod error;
mod locks;
mod polls;
mod startup;
mod storage;
mod voting;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "INFO");
        }
    }
    // initialize tracing
    tracing_subscriber::fmt::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let app_state = match AppState::new(&config) {
        Ok(app_state) => app_state,
        Err(e) => {
            error!("unable to initialize storage: {e}");
            std::process::exit(1);
        }
    };

    let app = startup::app(app_state);

    let addr = config.bind_addr;
    info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Unable to spawn tcp listener");

    axum::serve(listener, app).await.unwrap();
}
