use serde::de::DeserializeOwned;

use crate::errors::BackendError;

/// Parses a request body as JSON into the given submission type.
pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, BackendError> {
    serde_json::from_slice(body).map_err(BackendError::MalformedBody)
}

#[cfg(test)]
mod tests {
    use super::parse_json;
    use crate::camper::CamperSubmission;
    use crate::errors::BackendError;

    #[test]
    fn malformed_bodies_are_rejected() {
        for body in &["", "{", "42", "\"Alex\""] {
            let result = parse_json::<CamperSubmission>(body.as_bytes());

            assert!(
                matches!(result, Err(BackendError::MalformedBody(_))),
                "{:?} must be rejected",
                body
            );
        }
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let submission: CamperSubmission =
            parse_json(br#"{"name": "Alex", "age": 12, "cabin": "B"}"#).unwrap();

        assert!(submission.name.is_some());
        assert!(submission.age.is_some());
    }
}
