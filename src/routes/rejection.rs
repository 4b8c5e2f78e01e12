use serde::Serialize;
use warp::http::StatusCode;
use warp::reject;

use crate::entity::Id;
use crate::errors::BackendError;

/// A handler failure, remembering which request it came from.
#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    /// Renders the error for the client. The context is only logged.
    pub fn flatten(&self, status: StatusCode) -> FlattenedRejection {
        match &self.error {
            BackendError::Validation(e) => FlattenedRejection {
                error: format!("{}: Validation error", status.as_u16()),
                message: Some(e.to_string()),
            },
            e => FlattenedRejection {
                error: format!("{}: {}", status.as_u16(), e),
                message: None,
            },
        }
    }
}

impl reject::Reject for Rejection {}

/// Wraps an error into a warp rejection for the given context.
pub fn reject_with(context: Context, error: BackendError) -> reject::Rejection {
    reject::custom(Rejection::new(context, error))
}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    pub(crate) error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
}

#[derive(Clone, Debug)]
pub enum Context {
    Activities,
    Activity { id: Id },
    Campers,
    Camper { id: Id },
    CreateActivity,
    CreateCamper,
    CreateSignup,
    DeleteActivity { id: Id },
    Signup { id: Id },
    Signups,
    UpdateCamper { id: Id },
}

impl Context {
    pub fn activities() -> Context {
        Context::Activities
    }

    pub fn activity(id: Id) -> Context {
        Context::Activity { id }
    }

    pub fn campers() -> Context {
        Context::Campers
    }

    pub fn camper(id: Id) -> Context {
        Context::Camper { id }
    }

    pub fn create_activity() -> Context {
        Context::CreateActivity
    }

    pub fn create_camper() -> Context {
        Context::CreateCamper
    }

    pub fn create_signup() -> Context {
        Context::CreateSignup
    }

    pub fn delete_activity(id: Id) -> Context {
        Context::DeleteActivity { id }
    }

    pub fn signup(id: Id) -> Context {
        Context::Signup { id }
    }

    pub fn signups() -> Context {
        Context::Signups
    }

    pub fn update_camper(id: Id) -> Context {
        Context::UpdateCamper { id }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::errors::ValidationError;

    #[test]
    fn not_found_errors_carry_only_the_status_line() {
        let rejection = Rejection::new(
            Context::delete_activity(4),
            BackendError::ActivityNotFound(4),
        );

        assert_eq!(
            serde_json::to_value(rejection.flatten(StatusCode::NOT_FOUND)).unwrap(),
            json!({"error": "404: Activity not found"})
        );
    }

    #[test]
    fn validation_errors_carry_the_validator_message() {
        let rejection = Rejection::new(
            Context::create_camper(),
            BackendError::Validation(ValidationError::CamperName),
        );

        assert_eq!(
            serde_json::to_value(rejection.flatten(StatusCode::BAD_REQUEST)).unwrap(),
            json!({"error": "400: Validation error", "message": "Camper must have a name"})
        );
    }
}
