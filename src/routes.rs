use std::sync::Arc;

use log::{error, info, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, Reply, WithStatus};
use warp::Filter;

use crate::environment::Environment;
use crate::errors::BackendError;

pub mod admin;
mod handlers;
mod rejection;
mod response;

pub use internal::*;

/// The maximum request body size to accept. Submissions are a handful
/// of fields, so anything larger is rejected outright.
const MAX_CONTENT_LENGTH: u64 = 64 * 1024;

/// Combines every public route and renders handler failures as JSON.
pub fn make_api(
    environment: Environment,
) -> impl Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone {
    let logger = environment.logger.clone();

    make_home_route(environment.clone())
        .or(make_campers_list_route(environment.clone()))
        .or(make_camper_creation_route(environment.clone()))
        .or(make_camper_route(environment.clone()))
        .or(make_camper_update_route(environment.clone()))
        .or(make_activities_list_route(environment.clone()))
        .or(make_activity_creation_route(environment.clone()))
        .or(make_activity_route(environment.clone()))
        .or(make_activity_deletion_route(environment.clone()))
        .or(make_signups_list_route(environment.clone()))
        .or(make_signup_creation_route(environment.clone()))
        .or(make_signup_route(environment))
        .recover(move |r| format_rejection(logger.clone(), r))
}

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let status = status_code_for(&r.error);

        if status.is_server_error() {
            error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status, "message" => %r.error);
        } else {
            info!(logger, "Request rejected"; "context" => ?r.context, "status" => %status, "message" => %r.error);
        }

        return Ok(with_status(json(&r.flatten(status)), status));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        Validation(_) | MalformedBody(_) | MissingField(_) => StatusCode::BAD_REQUEST,
        CamperNotFound(_) | ActivityNotFound(_) | SignupNotFound(_) => StatusCode::NOT_FOUND,
        UnknownCamper(_) | UnknownActivity(_) | ForeignKeyViolation => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Sqlx { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use warp::body::{bytes, content_length_limit};
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{delete, get as g, patch, path as p, path::param as par, post};

    use super::{handlers, MAX_CONTENT_LENGTH};
    use crate::entity::Id;
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
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let $route_variable = warp::any()
                .map(move || environment.clone());

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_home_route => home, rt; end(), g());
    route!(make_campers_list_route => campers_list, rt; p("campers"), end(), g());
    route!(make_camper_creation_route => create_camper, rt; p("campers"), end(), post(), content_length_limit(MAX_CONTENT_LENGTH), bytes());
    route!(make_camper_route => camper, rt; p("campers"), par::<Id>(), end(), g());
    route!(make_camper_update_route => update_camper, rt; p("campers"), par::<Id>(), end(), patch(), content_length_limit(MAX_CONTENT_LENGTH), bytes());
    route!(make_activities_list_route => activities_list, rt; p("activities"), end(), g());
    route!(make_activity_creation_route => create_activity, rt; p("activities"), end(), post(), content_length_limit(MAX_CONTENT_LENGTH), bytes());
    route!(make_activity_route => activity, rt; p("activities"), par::<Id>(), end(), g());
    route!(make_activity_deletion_route => delete_activity, rt; p("activities"), par::<Id>(), end(), delete());
    route!(make_signups_list_route => signups_list, rt; p("signups"), end(), g());
    route!(make_signup_creation_route => create_signup, rt; p("signups"), end(), post(), content_length_limit(MAX_CONTENT_LENGTH), bytes());
    route!(make_signup_route => signup, rt; p("signups"), par::<Id>(), end(), g());
}
