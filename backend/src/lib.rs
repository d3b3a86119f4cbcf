pub mod catchers;
pub mod config;
pub mod cors;
pub mod error;
pub mod mailer;
pub mod notifier;
pub mod pg_store;
pub mod processor;
pub mod rate_limiter;
pub mod registry;
pub mod routes;
pub mod store;
pub mod utils;
pub mod verifier;

use std::sync::Arc;
use rocket::{catchers, routes, Build, Rocket};

use crate::{
    catchers::{bad_request, forbidden, internal_error, not_found, too_many_requests, unprocessable},
    config::AppConfig,
    cors::CORS,
    mailer::Mailer,
    routes::*,
    store::Stores,
    utils::Clock,
};

/// Assembles the service over the given collaborators. `main` passes the
/// Postgres store and the real mailer; tests pass in-memory doubles.
pub fn build_rocket(
    config: &AppConfig,
    stores: Stores,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
) -> Rocket<Build> {
    let app_state = AppState::new(config, stores, mailer, clock);

    rocket::build()
        .attach(CORS::new(config.allowed_origin.clone()))
        .manage(app_state)
        .mount(
            "/api",
            routes![
                health,
                election,
                all_options,
                request_otp,
                verify_otp,
                register_voter,
                cast_ballot,
                get_results,
                get_position_results,
                send_voter_emails,
                admin_stats
            ],
        )
        .register(
            "/",
            catchers![
                bad_request,
                forbidden,
                not_found,
                unprocessable,
                too_many_requests,
                internal_error
            ],
        )
}
