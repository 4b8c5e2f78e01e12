use std::error::Error;
use std::fs;
use std::sync::Arc;

use futures::future::FutureExt;
use tokio::sync::mpsc;
use warp::Filter;

use camp_backend::config::Config;
use camp_backend::db::{self, SqliteDb};
use camp_backend::environment::Environment;
use camp_backend::routes;
use log::{info, initialize_logger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();
    let config = Config::from_env()?;

    info!(logger, "Starting..."; "main_port" => config.port, "admin_port" => config.admin_port);

    if let Some(directory) = config.database_directory() {
        fs::create_dir_all(&directory)?;
    }

    info!(logger, "Creating database pool..."; "database_url" => config.database_url.as_str());
    let pool = db::connect(&config.database_url).await?;

    info!(logger, "Running migrations...");
    db::migrate(&pool).await?;

    let logger = Arc::new(logger);
    let environment = Environment::new(logger.clone(), Arc::new(SqliteDb::new(pool)));

    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate = Arc::new(move || {
        let termination_sender = termination_sender.clone();

        async move {
            // a closed channel means shutdown is already under way
            let _ = termination_sender.send(()).await;
        }
        .boxed()
    });

    let should_terminate = async move {
        termination_receiver.recv().await;
    }
    .shared();

    let ctrlc = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let signal = tokio::signal::ctrl_c();

        async move {
            tokio::select! {
                _ = should_terminate => {},
                _ = signal => {
                    terminate().await;
                }
            }
        }
    };

    let main_server = {
        let should_terminate = should_terminate.clone();

        let (_, main_server) = warp::serve(routes::make_api(environment))
            .bind_with_graceful_shutdown(([0, 0, 0, 0], config.port), async {
                should_terminate.await;
            });

        main_server
    };

    let admin_server = {
        let should_terminate = should_terminate.clone();

        let routes = routes::admin::make_healthz_route()
            .or(routes::admin::make_termination_route(terminate));

        let (_, admin_server) = warp::serve(routes)
            .bind_with_graceful_shutdown(([0, 0, 0, 0], config.admin_port), async {
                should_terminate.await;
            });

        admin_server
    };

    tokio::join!(ctrlc, main_server, admin_server);

    info!(logger, "Exiting gracefully...");

    Ok(())
}
