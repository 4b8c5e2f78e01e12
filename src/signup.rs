use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::activity::{Activity, ActivityShape};
use crate::camper::{Camper, CamperShape};
use crate::entity::{Id, Relations};
use crate::errors::{BackendError, ValidationError};

/// The hour of the day a signup takes place, between 0 and 23.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignupTime(i64);

impl SignupTime {
    pub const MIN: i64 = 0;
    pub const MAX: i64 = 23;

    pub fn new(time: i64) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&time) {
            Ok(SignupTime(time))
        } else {
            Err(ValidationError::SignupTime)
        }
    }

    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        value
            .as_i64()
            .ok_or(ValidationError::SignupTime)
            .and_then(Self::new)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

/// A single signup in the database, linking a camper to an activity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signup {
    id: Id,
    time: SignupTime,
    camper_id: Id,
    activity_id: Id,
}

impl Signup {
    pub fn new(id: Id, time: SignupTime, camper_id: Id, activity_id: Id) -> Self {
        Signup {
            id,
            time,
            camper_id,
            activity_id,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn time(&self) -> i64 {
        self.time.get()
    }

    pub fn set_time(&mut self, time: i64) -> Result<(), ValidationError> {
        self.time = SignupTime::new(time)?;
        Ok(())
    }

    pub fn camper_id(&self) -> Id {
        self.camper_id
    }

    pub fn activity_id(&self) -> Id {
        self.activity_id
    }

    /// Shapes the signup, optionally inlining its camper and activity.
    /// Neither of them lists its own signups or relations.
    pub fn shape(&self, relations: Relations<(&Camper, &Activity)>) -> SignupShape {
        let (camper, activity) = match relations.into_option() {
            Some((camper, activity)) => (
                Some(camper.shape(Relations::Exclude)),
                Some(activity.shape(Relations::Exclude)),
            ),
            None => (None, None),
        };

        SignupShape {
            id: self.id,
            time: self.time(),
            camper_id: self.camper_id,
            activity_id: self.activity_id,
            camper,
            activity,
        }
    }
}

/// A signup that has not been saved yet. The referenced camper and
/// activity are checked when it is inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSignup {
    time: SignupTime,
    camper_id: Id,
    activity_id: Id,
}

impl NewSignup {
    pub fn new(time: i64, camper_id: Id, activity_id: Id) -> Result<Self, ValidationError> {
        Ok(NewSignup {
            time: SignupTime::new(time)?,
            camper_id,
            activity_id,
        })
    }

    pub fn time(&self) -> i64 {
        self.time.get()
    }

    pub fn set_time(&mut self, time: i64) -> Result<(), ValidationError> {
        self.time = SignupTime::new(time)?;
        Ok(())
    }

    pub fn camper_id(&self) -> Id {
        self.camper_id
    }

    pub fn activity_id(&self) -> Id {
        self.activity_id
    }
}

/// The JSON representation of a signup.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SignupShape {
    pub id: Id,
    pub time: i64,
    pub camper_id: Id,
    pub activity_id: Id,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub camper: Option<CamperShape>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityShape>,
}

/// The fields a client submits to create a signup.
#[derive(Debug, Default, Deserialize)]
pub struct SignupSubmission {
    #[serde(default)]
    pub time: Option<Value>,

    #[serde(default)]
    pub camper_id: Option<Id>,

    #[serde(default)]
    pub activity_id: Option<Id>,
}

impl SignupSubmission {
    /// Validates the time before looking at the references.
    pub fn into_new_signup(self) -> Result<NewSignup, BackendError> {
        let time = SignupTime::from_json(self.time.as_ref().unwrap_or(&Value::Null))?;
        let camper_id = self.camper_id.ok_or(BackendError::MissingField("camper_id"))?;
        let activity_id = self
            .activity_id
            .ok_or(BackendError::MissingField("activity_id"))?;

        Ok(NewSignup {
            time,
            camper_id,
            activity_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;
    use time::macros::datetime;

    use super::*;
    use crate::camper::{CamperAge, CamperName};
    use crate::entity::Times;

    fn times() -> Times {
        Times {
            created_at: datetime!(2023-06-01 09:00:00),
            updated_at: None,
        }
    }

    #[test]
    fn out_of_range_times_are_rejected() {
        assert_eq!(SignupTime::new(24), Err(ValidationError::SignupTime));
        assert_eq!(SignupTime::new(-1), Err(ValidationError::SignupTime));
        assert_eq!(
            ValidationError::SignupTime.to_string(),
            "time must be between 0 and 23"
        );
    }

    #[test]
    fn set_time_validates() {
        let mut signup = Signup::new(1, SignupTime::new(9).unwrap(), 1, 1);

        assert_eq!(signup.set_time(30), Err(ValidationError::SignupTime));
        assert_eq!(signup.time(), 9);

        signup.set_time(0).unwrap();
        assert_eq!(signup.time(), 0);
    }

    #[test]
    fn unsaved_signup_keeps_previous_time_on_failed_assignment() {
        let mut signup = NewSignup::new(9, 1, 2).unwrap();

        assert_eq!(signup.set_time(24), Err(ValidationError::SignupTime));
        assert_eq!(signup.time(), 9);

        signup.set_time(23).unwrap();
        assert_eq!(signup, NewSignup::new(23, 1, 2).unwrap());
        assert_eq!(NewSignup::new(-1, 1, 2), Err(ValidationError::SignupTime));
    }

    #[test]
    fn whole_number_floats_are_not_times() {
        assert_eq!(
            SignupTime::from_json(&json!(10.0)),
            Err(ValidationError::SignupTime)
        );
    }

    #[test]
    fn submission_checks_time_first() {
        let submission: SignupSubmission = serde_json::from_str(r#"{"time": 99}"#).unwrap();

        assert!(matches!(
            submission.into_new_signup(),
            Err(BackendError::Validation(ValidationError::SignupTime))
        ));

        let submission: SignupSubmission =
            serde_json::from_str(r#"{"time": 9, "activity_id": 2}"#).unwrap();

        assert!(matches!(
            submission.into_new_signup(),
            Err(BackendError::MissingField("camper_id"))
        ));
    }

    #[test]
    fn expanded_shape_inlines_both_sides_one_level_deep() {
        let signup = Signup::new(5, SignupTime::new(10).unwrap(), 2, 3);
        let camper = Camper::new(
            2,
            times(),
            CamperName::new("Alex").unwrap(),
            CamperAge::new(12).unwrap(),
        );
        let activity = Activity::new(3, Some("Archery".into()), Some(2));

        let shape = serde_json::to_value(signup.shape(Relations::Include((&camper, &activity))))
            .unwrap();

        assert_eq!(
            shape,
            json!({
                "id": 5,
                "time": 10,
                "camper_id": 2,
                "activity_id": 3,
                "camper": {"id": 2, "name": "Alex", "age": 12},
                "activity": {"id": 3, "name": "Archery", "difficulty": 2},
            })
        );
    }

    proptest! {
        #[test]
        fn times_are_accepted_only_in_range(time in -100i64..100) {
            prop_assert_eq!(SignupTime::new(time).is_ok(), (0..=23).contains(&time));
        }
    }
}
