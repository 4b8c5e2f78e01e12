use serde::{Deserialize, Serialize};

use crate::camper::{Camper, CamperShape};
use crate::entity::{Id, Relations};

/// A single activity in the database. Neither field is validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Activity {
    id: Id,
    name: Option<String>,
    difficulty: Option<i64>,
}

impl Activity {
    pub fn new(id: Id, name: Option<String>, difficulty: Option<i64>) -> Self {
        Activity {
            id,
            name,
            difficulty,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn shape(&self, relations: Relations<&[Camper]>) -> ActivityShape {
        ActivityShape {
            id: self.id,
            name: self.name.clone(),
            difficulty: self.difficulty,
            campers: relations
                .into_option()
                .map(|campers| campers.iter().map(|c| c.shape(Relations::Exclude)).collect()),
        }
    }
}

/// An activity that has not been saved yet.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct NewActivity {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub difficulty: Option<i64>,
}

/// The JSON representation of an activity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActivityShape {
    pub id: Id,
    pub name: Option<String>,
    pub difficulty: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub campers: Option<Vec<CamperShape>>,
}

#[cfg(test)]
mod tests {
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
    fn flat_shape_keeps_missing_fields_as_null() {
        let activity = Activity::new(7, None, None);
        let shape = serde_json::to_value(activity.shape(Relations::Exclude)).unwrap();

        assert_eq!(shape, json!({"id": 7, "name": null, "difficulty": null}));
    }

    #[test]
    fn expanded_shape_lists_campers_without_activities() {
        let activity = Activity::new(7, Some("Canoeing".into()), Some(4));
        let campers = vec![Camper::new(
            2,
            times(),
            CamperName::new("Robin").unwrap(),
            CamperAge::new(9).unwrap(),
        )];

        let shape = activity.shape(Relations::Include(campers.as_slice()));
        let campers = shape.campers.as_ref().unwrap();

        assert_eq!(campers.len(), 1);
        assert_eq!(campers[0].activities, None);
        assert_eq!(
            serde_json::to_value(&shape).unwrap(),
            json!({
                "id": 7,
                "name": "Canoeing",
                "difficulty": 4,
                "campers": [{"id": 2, "name": "Robin", "age": 9}],
            })
        );
    }

    #[test]
    fn new_activity_accepts_any_values() {
        let activity: NewActivity =
            serde_json::from_str(r#"{"name": "", "difficulty": -3}"#).unwrap();

        assert_eq!(activity.name.as_deref(), Some(""));
        assert_eq!(activity.difficulty, Some(-3));
    }
}
