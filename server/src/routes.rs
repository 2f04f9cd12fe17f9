use std::sync::Arc;

use log::{error, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, WithStatus};

use crate::errors::BackendError;

pub mod admin;
mod handlers;
mod rejection;
mod response;

pub use internal::*;

/// The maximum form data size to accept. This should be enforced by
/// the HTTP gateway, so on the Rust side it’s set to an unreasonably
/// large number.
const MAX_CONTENT_LENGTH: u64 = 2 * 1024 * 1024 * 1024;

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        MissingField(..) | MalformedFormSubmission | MalformedDate(..) | InvalidRange(..) => {
            StatusCode::BAD_REQUEST
        }
        RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
        InvalidCredentials => StatusCode::UNAUTHORIZED,
        // a malformed ID cannot name anything, so it gets the same
        // treatment as an unknown one
        InvalidId(..) | StudentNotFound | WorkshopNotFound | NoVideo => StatusCode::NOT_FOUND,
        EmailAlreadyExists | MobileAlreadyExists | AlreadyRegistered => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use warp::filters::header;
    use warp::filters::multipart::form;
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{body, delete as d, get as g, path as p, path::param as par, post, put};

    use super::{handlers, MAX_CONTENT_LENGTH};
    use crate::environment::Environment;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident, $prefix:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let prefix = environment.urls.$prefix.clone();

            let $route_variable = warp::any()
                .map(move || environment.clone())
                .and(p(prefix));

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_signup_route => signup, rt, auth_path; p("register"), end(), post(), body::json());
    route!(make_login_route => login, rt, auth_path; p("login"), end(), post(), body::json());
    route!(make_workshops_list_route => workshops_list, rt, workshops_path; end(), g());
    route!(make_workshop_create_route => workshop_create, rt, workshops_path; end(), post(), body::json());
    route!(make_registered_workshops_route => registered_workshops, rt, workshops_path; p("registered-workshops"), par::<String>(), end(), g());
    route!(make_workshop_retrieve_route => workshop_retrieve, rt, workshops_path; par::<String>(), end(), g());
    route!(make_workshop_update_route => workshop_update, rt, workshops_path; par::<String>(), end(), put(), form().max_length(MAX_CONTENT_LENGTH));
    route!(make_workshop_delete_route => workshop_delete, rt, workshops_path; par::<String>(), end(), d());
    route!(make_workshop_video_route => workshop_video, rt, workshops_path; par::<String>(), p("video"), end(), g(), header::optional::<String>("range"));
    route!(make_workshop_register_route => workshop_register, rt, workshops_path; par::<String>(), p("register"), end(), post(), body::json());
    route!(make_workshop_registrations_route => workshop_registrations, rt, workshops_path; par::<String>(), p("registrations"), end(), g());
}
