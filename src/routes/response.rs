use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Healthz<'a> {
    pub revision: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub version: &'a str,
}
