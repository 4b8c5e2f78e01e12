use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::activity::{Activity, ActivityShape};
use crate::entity::{Id, Relations, Times};
use crate::errors::ValidationError;

/// A camper’s name. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CamperName(String);

impl CamperName {
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        if name.is_empty() {
            Err(ValidationError::CamperName)
        } else {
            Ok(CamperName(name))
        }
    }

    /// Validates an arbitrary JSON value. Anything other than a
    /// non-empty string, including `null`, is rejected.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        match value {
            Value::String(s) => Self::new(s.as_str()),
            _ => Err(ValidationError::CamperName),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A camper’s age in years, between `MIN` and `MAX` inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CamperAge(i64);

impl CamperAge {
    pub const MIN: i64 = 8;
    pub const MAX: i64 = 18;

    pub fn new(age: i64) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&age) {
            Ok(CamperAge(age))
        } else {
            Err(ValidationError::CamperAge)
        }
    }

    /// Validates an arbitrary JSON value. Only integers are accepted.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        value
            .as_i64()
            .ok_or(ValidationError::CamperAge)
            .and_then(Self::new)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

/// A single camper in the database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Camper {
    id: Id,
    times: Times,
    name: CamperName,
    age: CamperAge,
}

impl Camper {
    pub fn new(id: Id, times: Times, name: CamperName, age: CamperAge) -> Self {
        Camper {
            id,
            times,
            name,
            age,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn times(&self) -> &Times {
        &self.times
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn age(&self) -> i64 {
        self.age.get()
    }

    /// Replaces the name, leaving the camper untouched if the new name
    /// is invalid. Nothing is written until the camper is committed.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ValidationError> {
        self.name = CamperName::new(name)?;
        Ok(())
    }

    /// Replaces the age, leaving the camper untouched if the new age
    /// is out of range. Nothing is written until the camper is committed.
    pub fn set_age(&mut self, age: i64) -> Result<(), ValidationError> {
        self.age = CamperAge::new(age)?;
        Ok(())
    }

    pub fn shape(&self, relations: Relations<&[Activity]>) -> CamperShape {
        CamperShape {
            id: self.id,
            name: self.name().to_owned(),
            age: self.age(),
            activities: relations.into_option().map(|activities| {
                activities
                    .iter()
                    .map(|a| a.shape(Relations::Exclude))
                    .collect()
            }),
        }
    }
}

/// A camper that has not been saved yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCamper {
    name: CamperName,
    age: CamperAge,
}

impl NewCamper {
    pub fn new(name: impl Into<String>, age: i64) -> Result<Self, ValidationError> {
        Ok(NewCamper {
            name: CamperName::new(name)?,
            age: CamperAge::new(age)?,
        })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn age(&self) -> i64 {
        self.age.get()
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ValidationError> {
        self.name = CamperName::new(name)?;
        Ok(())
    }

    pub fn set_age(&mut self, age: i64) -> Result<(), ValidationError> {
        self.age = CamperAge::new(age)?;
        Ok(())
    }
}

/// The JSON representation of a camper.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CamperShape {
    pub id: Id,
    pub name: String,
    pub age: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub activities: Option<Vec<ActivityShape>>,
}

/// The fields a client submits to create or update a camper. The
/// values are kept as raw JSON so that a wrongly typed value reaches
/// the validator instead of failing deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct CamperSubmission {
    #[serde(default)]
    pub name: Option<Value>,

    #[serde(default)]
    pub age: Option<Value>,
}

impl CamperSubmission {
    /// Validates every field for a new camper. Missing fields are
    /// rejected by their validators.
    pub fn into_new_camper(self) -> Result<NewCamper, ValidationError> {
        let name = CamperName::from_json(self.name.as_ref().unwrap_or(&Value::Null))?;
        let age = CamperAge::from_json(self.age.as_ref().unwrap_or(&Value::Null))?;

        Ok(NewCamper { name, age })
    }

    /// Assigns the submitted fields to an existing camper, stopping at
    /// the first invalid one. The caller discards the camper on error.
    pub fn apply_to(&self, camper: &mut Camper) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            camper.set_name(name.as_str().ok_or(ValidationError::CamperName)?)?;
        }

        if let Some(age) = &self.age {
            camper.set_age(age.as_i64().ok_or(ValidationError::CamperAge)?)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    fn camper() -> Camper {
        let times = Times {
            created_at: datetime!(2023-06-01 09:00:00),
            updated_at: None,
        };

        Camper::new(
            1,
            times,
            CamperName::new("Alex").unwrap(),
            CamperAge::new(12).unwrap(),
        )
    }

    #[test]
    fn empty_names_are_rejected() {
        assert_eq!(CamperName::new(""), Err(ValidationError::CamperName));
        assert_eq!(
            ValidationError::CamperName.to_string(),
            "Camper must have a name"
        );
    }

    #[test]
    fn non_string_names_are_rejected() {
        for value in &[json!(null), json!(5), json!(["Alex"])] {
            assert_eq!(
                CamperName::from_json(value),
                Err(ValidationError::CamperName)
            );
        }
    }

    #[test]
    fn non_integer_ages_are_rejected() {
        for value in &[json!(null), json!("12"), json!(12.5), json!(12.0)] {
            assert_eq!(CamperAge::from_json(value), Err(ValidationError::CamperAge));
        }
    }

    #[test]
    fn failed_assignment_keeps_previous_value() {
        let mut camper = camper();

        assert_eq!(camper.set_age(19), Err(ValidationError::CamperAge));
        assert_eq!(camper.set_name(""), Err(ValidationError::CamperName));
        assert_eq!(camper.age(), 12);
        assert_eq!(camper.name(), "Alex");

        camper.set_age(18).unwrap();
        assert_eq!(camper.age(), 18);
    }

    #[test]
    fn unsaved_camper_keeps_previous_value_on_failed_assignment() {
        let mut camper = NewCamper::new("Alex", 12).unwrap();

        assert_eq!(camper.set_age(7), Err(ValidationError::CamperAge));
        assert_eq!(camper.set_name(""), Err(ValidationError::CamperName));
        assert_eq!(camper.age(), 12);
        assert_eq!(camper.name(), "Alex");

        camper.set_name("Sam").unwrap();
        camper.set_age(8).unwrap();
        assert_eq!(camper, NewCamper::new("Sam", 8).unwrap());
    }

    #[test]
    fn submission_stops_at_first_invalid_field() {
        let mut camper = camper();
        let submission = CamperSubmission {
            name: Some(json!("Sam")),
            age: Some(json!(30)),
        };

        assert_eq!(
            submission.apply_to(&mut camper),
            Err(ValidationError::CamperAge)
        );
    }

    #[test]
    fn missing_fields_fail_validation() {
        let submission: CamperSubmission = serde_json::from_str(r#"{"age": 10}"#).unwrap();
        assert_eq!(
            submission.into_new_camper(),
            Err(ValidationError::CamperName)
        );

        let submission: CamperSubmission = serde_json::from_str(r#"{"name": "Jo"}"#).unwrap();
        assert_eq!(submission.into_new_camper(), Err(ValidationError::CamperAge));
    }

    #[test]
    fn flat_shape_omits_activities() {
        let shape = serde_json::to_value(camper().shape(Relations::Exclude)).unwrap();

        assert_eq!(shape, json!({"id": 1, "name": "Alex", "age": 12}));
    }

    #[test]
    fn expanded_shape_lists_activities_without_campers() {
        use crate::activity::Activity;

        let activities = vec![Activity::new(3, Some("Archery".into()), Some(2))];
        let shape =
            serde_json::to_value(camper().shape(Relations::Include(activities.as_slice())))
                .unwrap();

        assert_eq!(
            shape,
            json!({
                "id": 1,
                "name": "Alex",
                "age": 12,
                "activities": [{"id": 3, "name": "Archery", "difficulty": 2}],
            })
        );
    }

    proptest! {
        #[test]
        fn ages_are_accepted_only_in_range(age in -1000i64..1000) {
            let accepted = CamperAge::new(age).is_ok();

            prop_assert_eq!(accepted, (8..=18).contains(&age));
        }

        #[test]
        fn non_empty_names_are_kept_verbatim(name in ".+") {
            let validated = CamperName::new(name.clone()).unwrap();

            prop_assert_eq!(validated.as_str(), name.as_str());
        }
    }
}
