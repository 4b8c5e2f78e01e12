use time::PrimitiveDateTime;

/// An ID in the database.
pub type Id = i64;

/// The times a row was created and last updated. Both are assigned by
/// the database; `updated_at` stays empty until the first update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Times {
    pub created_at: PrimitiveDateTime,
    pub updated_at: Option<PrimitiveDateTime>,
}

/// Whether a shaping function inlines related entities, carrying the
/// related entities when it does.
///
/// Related entities are always shaped with `Relations::Exclude`, so a
/// shape never nests more than one level deep and back-references are
/// never followed.
#[derive(Clone, Copy, Debug)]
pub enum Relations<T> {
    Exclude,
    Include(T),
}

impl<T> Relations<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Relations::Exclude => None,
            Relations::Include(related) => Some(related),
        }
    }
}
