use std::time::{Duration, Instant};

use bytes::Bytes;
use log::debug;
use warp::{
    http::StatusCode,
    reply::{json, with_header, with_status, Reply},
};

use crate::activity::NewActivity;
use crate::camper::CamperSubmission;
use crate::entity::{Id, Relations};
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::io::parse_json;
use crate::routes::rejection::{reject_with, Context};
use crate::signup::SignupSubmission;

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, warp::Rejection>;

macro_rules! timed {
    ($($body:tt)+) => {{
        let start = Instant::now();

        let result = { $($body)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    }};
}

pub async fn home(_environment: Environment) -> RouteResult {
    timed! {
        with_status(String::new(), StatusCode::OK)
    }
}

pub async fn campers_list(environment: Environment) -> RouteResult {
    timed! {
        let campers = environment
            .db
            .campers()
            .await
            .map_err(|e: BackendError| reject_with(Context::campers(), e))?;

        let shapes: Vec<_> = campers
            .iter()
            .map(|c| c.shape(Relations::Exclude))
            .collect();

        json(&shapes)
    }
}

pub async fn create_camper(environment: Environment, body: Bytes) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| reject_with(Context::create_camper(), e);

        let submission: CamperSubmission = parse_json(&body).map_err(error_handler)?;
        let new_camper = submission
            .into_new_camper()
            .map_err(|e| error_handler(e.into()))?;

        debug!(environment.logger, "Creating camper..."; "name" => new_camper.name());
        let camper = environment
            .db
            .insert_camper(new_camper)
            .await
            .map_err(error_handler)?;

        with_header(
            with_status(json(&camper.shape(Relations::Exclude)), StatusCode::CREATED),
            "location",
            format!("/campers/{}", camper.id()),
        )
    }
}

pub async fn camper(environment: Environment, id: Id) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| reject_with(Context::camper(id), e);

        debug!(environment.logger, "Retrieving camper..."; "id" => id);
        let camper = environment
            .db
            .camper(id)
            .await
            .map_err(error_handler)?
            .ok_or_else(|| error_handler(BackendError::CamperNotFound(id)))?;

        let activities = environment
            .db
            .camper_activities(id)
            .await
            .map_err(error_handler)?;

        json(&camper.shape(Relations::Include(activities.as_slice())))
    }
}

pub async fn update_camper(environment: Environment, id: Id, body: Bytes) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| reject_with(Context::update_camper(id), e);

        let submission: CamperSubmission = parse_json(&body).map_err(error_handler)?;

        let mut camper = environment
            .db
            .camper(id)
            .await
            .map_err(error_handler)?
            .ok_or_else(|| error_handler(BackendError::CamperNotFound(id)))?;

        // on failure the modified copy is dropped without being written
        submission
            .apply_to(&mut camper)
            .map_err(|e| error_handler(e.into()))?;

        debug!(environment.logger, "Updating camper..."; "id" => id);
        let camper = environment
            .db
            .update_camper(camper)
            .await
            .map_err(error_handler)?;

        json(&camper.shape(Relations::Exclude))
    }
}

pub async fn activities_list(environment: Environment) -> RouteResult {
    timed! {
        let activities = environment
            .db
            .activities()
            .await
            .map_err(|e: BackendError| reject_with(Context::activities(), e))?;

        let shapes: Vec<_> = activities
            .iter()
            .map(|a| a.shape(Relations::Exclude))
            .collect();

        json(&shapes)
    }
}

pub async fn create_activity(environment: Environment, body: Bytes) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| reject_with(Context::create_activity(), e);

        let new_activity: NewActivity = parse_json(&body).map_err(error_handler)?;

        debug!(environment.logger, "Creating activity...");
        let activity = environment
            .db
            .insert_activity(new_activity)
            .await
            .map_err(error_handler)?;

        with_header(
            with_status(json(&activity.shape(Relations::Exclude)), StatusCode::CREATED),
            "location",
            format!("/activities/{}", activity.id()),
        )
    }
}

pub async fn activity(environment: Environment, id: Id) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| reject_with(Context::activity(id), e);

        debug!(environment.logger, "Retrieving activity..."; "id" => id);
        let activity = environment
            .db
            .activity(id)
            .await
            .map_err(error_handler)?
            .ok_or_else(|| error_handler(BackendError::ActivityNotFound(id)))?;

        let campers = environment
            .db
            .activity_campers(id)
            .await
            .map_err(error_handler)?;

        json(&activity.shape(Relations::Include(campers.as_slice())))
    }
}

pub async fn delete_activity(environment: Environment, id: Id) -> RouteResult {
    timed! {
        debug!(environment.logger, "Deleting activity..."; "id" => id);

        environment
            .db
            .delete_activity(id)
            .await
            .map_err(|e: BackendError| reject_with(Context::delete_activity(id), e))?;

        StatusCode::NO_CONTENT
    }
}

pub async fn signups_list(environment: Environment) -> RouteResult {
    timed! {
        let signups = environment
            .db
            .signups()
            .await
            .map_err(|e: BackendError| reject_with(Context::signups(), e))?;

        let shapes: Vec<_> = signups
            .iter()
            .map(|s| s.shape(Relations::Exclude))
            .collect();

        json(&shapes)
    }
}

pub async fn create_signup(environment: Environment, body: Bytes) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| reject_with(Context::create_signup(), e);

        let submission: SignupSubmission = parse_json(&body).map_err(error_handler)?;
        let new_signup = submission.into_new_signup().map_err(error_handler)?;

        debug!(
            environment.logger,
            "Creating signup...";
            "camper_id" => new_signup.camper_id(),
            "activity_id" => new_signup.activity_id()
        );
        let signup = environment
            .db
            .insert_signup(new_signup)
            .await
            .map_err(error_handler)?;

        let activity = environment
            .db
            .activity(signup.activity_id())
            .await
            .map_err(error_handler)?
            .ok_or_else(|| error_handler(BackendError::UnknownActivity(signup.activity_id())))?;

        with_status(json(&activity.shape(Relations::Exclude)), StatusCode::OK)
    }
}

pub async fn signup(environment: Environment, id: Id) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| reject_with(Context::signup(id), e);

        debug!(environment.logger, "Retrieving signup..."; "id" => id);
        let signup = environment
            .db
            .signup(id)
            .await
            .map_err(error_handler)?
            .ok_or_else(|| error_handler(BackendError::SignupNotFound(id)))?;

        let camper = environment
            .db
            .camper(signup.camper_id())
            .await
            .map_err(error_handler)?
            .ok_or_else(|| error_handler(BackendError::UnknownCamper(signup.camper_id())))?;

        let activity = environment
            .db
            .activity(signup.activity_id())
            .await
            .map_err(error_handler)?
            .ok_or_else(|| error_handler(BackendError::UnknownActivity(signup.activity_id())))?;

        json(&signup.shape(Relations::Include((&camper, &activity))))
    }
}

fn format_server_timing(duration: Duration) -> String {
    format!("handler;dur={}", duration.as_secs_f64() * 1000.0)
}
