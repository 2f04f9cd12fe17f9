use std::error::Error;
use std::sync::Arc;

use futures::future::FutureExt;
use tokio::sync::mpsc;
use warp::Filter;

use log::{info, initialize_logger};
use workshop_backend::config::get_variable;
use workshop_backend::db::PgDb;
use workshop_backend::environment::{Config, Environment};
use workshop_backend::routes;
use workshop_backend::urls::Urls;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let main_port: u16 = get_variable("BACKEND_PORT")
        .parse()
        .expect("parse BACKEND_PORT as u16");
    let admin_port: u16 = get_variable("BACKEND_ADMIN_PORT")
        .parse()
        .expect("parse BACKEND_ADMIN_PORT as u16");

    info!(logger, "Starting..."; "main_port" => main_port, "admin_port" => admin_port);
    let logger = Arc::new(logger);

    info!(logger, "Creating database pool...");
    let connection_string = get_variable("BACKEND_DB_CONNECTION_STRING");
    let pool = sqlx::Pool::connect(&connection_string)
        .await
        .expect("create database pool from BACKEND_DB_CONNECTION_STRING");
    let db = Arc::new(PgDb::new(pool));

    let urls = Arc::new(Urls::new(
        get_variable("BACKEND_BASE_URL"),
        get_variable("BACKEND_WORKSHOPS_PATH"),
        get_variable("BACKEND_AUTH_PATH"),
    ));

    let config = Config::new(
        get_variable("BACKEND_ADMIN_EMAIL"),
        get_variable("BACKEND_ADMIN_PASSWORD"),
    );
    let environment = Environment::new(logger.clone(), db, urls, config);

    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate: routes::admin::TerminationFunctionWrapper = Arc::new(move || {
        let termination_sender = termination_sender.clone();

        async move {
            termination_sender.send(()).await.unwrap();
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
            let terminate = terminate.clone();

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

        let logger2 = logger.clone();

        let signup_route = routes::make_signup_route(environment.clone());
        let login_route = routes::make_login_route(environment.clone());
        let workshops_list_route = routes::make_workshops_list_route(environment.clone());
        let workshop_create_route = routes::make_workshop_create_route(environment.clone());
        let registered_workshops_route = routes::make_registered_workshops_route(environment.clone());
        let workshop_retrieve_route = routes::make_workshop_retrieve_route(environment.clone());
        let workshop_update_route = routes::make_workshop_update_route(environment.clone());
        let workshop_delete_route = routes::make_workshop_delete_route(environment.clone());
        let workshop_video_route = routes::make_workshop_video_route(environment.clone());
        let workshop_register_route = routes::make_workshop_register_route(environment.clone());
        let workshop_registrations_route =
            routes::make_workshop_registrations_route(environment.clone());

        let routes = signup_route
            .or(login_route)
            .or(workshops_list_route)
            .or(workshop_create_route)
            .or(registered_workshops_route)
            .or(workshop_video_route)
            .or(workshop_register_route)
            .or(workshop_registrations_route)
            .or(workshop_retrieve_route)
            .or(workshop_update_route)
            .or(workshop_delete_route)
            .recover(move |r| routes::format_rejection(logger2.clone(), r));

        let (_, main_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), async {
                should_terminate.await;
            });

        main_server
    };

    let admin_server = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let routes = routes::admin::make_healthz_route(environment.clone()).or(
            routes::admin::make_termination_route(environment.clone(), terminate),
        );

        let (_, admin_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], admin_port), async {
                should_terminate.await;
            });

        admin_server
    };

    tokio::join!(ctrlc, main_server, admin_server);

    info!(logger, "Exiting gracefully...");

    Ok(())
}
