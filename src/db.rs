use futures::future::BoxFuture;

use crate::activity::{Activity, NewActivity};
use crate::camper::{Camper, NewCamper};
use crate::entity::Id;
use crate::errors::BackendError;
use crate::signup::{NewSignup, Signup};

pub trait Db {
    fn activities(&self) -> BoxFuture<Result<Vec<Activity>, BackendError>>;

    fn activity(&self, id: Id) -> BoxFuture<Result<Option<Activity>, BackendError>>;

    /// Lists the campers signed up for an activity, once per signup.
    fn activity_campers(&self, id: Id) -> BoxFuture<Result<Vec<Camper>, BackendError>>;

    fn insert_activity(&self, activity: NewActivity) -> BoxFuture<Result<Activity, BackendError>>;

    /// Deletes an activity together with its signups.
    fn delete_activity(&self, id: Id) -> BoxFuture<Result<(), BackendError>>;

    fn campers(&self) -> BoxFuture<Result<Vec<Camper>, BackendError>>;

    fn camper(&self, id: Id) -> BoxFuture<Result<Option<Camper>, BackendError>>;

    /// Lists the activities a camper is signed up for, once per signup.
    fn camper_activities(&self, id: Id) -> BoxFuture<Result<Vec<Activity>, BackendError>>;

    fn insert_camper(&self, camper: NewCamper) -> BoxFuture<Result<Camper, BackendError>>;

    /// Writes the camper’s current fields and returns the stored row.
    fn update_camper(&self, camper: Camper) -> BoxFuture<Result<Camper, BackendError>>;

    fn signups(&self) -> BoxFuture<Result<Vec<Signup>, BackendError>>;

    fn signup(&self, id: Id) -> BoxFuture<Result<Option<Signup>, BackendError>>;

    /// Inserts a signup after checking that its camper and activity
    /// exist.
    fn insert_signup(&self, signup: NewSignup) -> BoxFuture<Result<Signup, BackendError>>;
}

pub use self::sqlite::*;

mod sqlite {
    use std::str::FromStr;

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::{
        self,
        sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
        Executor, Sqlite,
    };

    use crate::activity::{Activity, NewActivity};
    use crate::camper::{Camper, CamperAge, CamperName, NewCamper};
    use crate::entity::{Id, Times};
    use crate::errors::BackendError;
    use crate::signup::{NewSignup, Signup, SignupTime};

    pub struct SqliteDb {
        pool: SqlitePool,
    }

    impl SqliteDb {
        pub fn new(pool: SqlitePool) -> Self {
            SqliteDb { pool }
        }
    }

    /// Opens a pool for the given database URL, creating the file if
    /// needed. In-memory databases get a single long-lived connection,
    /// since every connection would otherwise see its own database.
    pub async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if url.contains(":memory:") || url.contains("mode=memory") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        pool_options.connect_with(options).await
    }

    /// Brings the schema up to date.
    pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(pool).await
    }

    // these can be simplified once async functions in traits are usable
    // behind `dyn`
    impl super::Db for SqliteDb {
        fn activities(&self) -> BoxFuture<Result<Vec<Activity>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_activities.sql"));

                let activities = query
                    .try_map(|row: SqliteRow| activity_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(activities)
            }
            .boxed()
        }

        fn activity(&self, id: Id) -> BoxFuture<Result<Option<Activity>, BackendError>> {
            async move {
                retrieve_activity(&self.pool, id)
                    .await
                    .map_err(map_sqlx_error)
            }
            .boxed()
        }

        fn activity_campers(&self, id: Id) -> BoxFuture<Result<Vec<Camper>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_activity_campers.sql"));

                let campers = query
                    .bind(id)
                    .try_map(|row: SqliteRow| camper_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(campers)
            }
            .boxed()
        }

        fn insert_activity(
            &self,
            activity: NewActivity,
        ) -> BoxFuture<Result<Activity, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/create_activity.sql"));

                let activity = query
                    .bind(activity.name)
                    .bind(activity.difficulty)
                    .try_map(|row: SqliteRow| activity_from_row(&row))
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(activity)
            }
            .boxed()
        }

        fn delete_activity(&self, id: Id) -> BoxFuture<Result<(), BackendError>> {
            async move {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

                sqlx::query(include_str!("queries/delete_activity_signups.sql"))
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;

                let count = sqlx::query(include_str!("queries/delete_activity.sql"))
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    // dropping the transaction rolls it back
                    return Err(BackendError::ActivityNotFound(id));
                }

                tx.commit().await.map_err(map_sqlx_error)
            }
            .boxed()
        }

        fn campers(&self) -> BoxFuture<Result<Vec<Camper>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_campers.sql"));

                let campers = query
                    .try_map(|row: SqliteRow| camper_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(campers)
            }
            .boxed()
        }

        fn camper(&self, id: Id) -> BoxFuture<Result<Option<Camper>, BackendError>> {
            async move {
                retrieve_camper(&self.pool, id)
                    .await
                    .map_err(map_sqlx_error)
            }
            .boxed()
        }

        fn camper_activities(&self, id: Id) -> BoxFuture<Result<Vec<Activity>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_camper_activities.sql"));

                let activities = query
                    .bind(id)
                    .try_map(|row: SqliteRow| activity_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(activities)
            }
            .boxed()
        }

        fn insert_camper(&self, camper: NewCamper) -> BoxFuture<Result<Camper, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/create_camper.sql"));

                let camper = query
                    .bind(camper.name())
                    .bind(camper.age())
                    .try_map(|row: SqliteRow| camper_from_row(&row))
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(camper)
            }
            .boxed()
        }

        fn update_camper(&self, camper: Camper) -> BoxFuture<Result<Camper, BackendError>> {
            async move {
                let id = camper.id();
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

                let count = sqlx::query(include_str!("queries/update_camper.sql"))
                    .bind(camper.name())
                    .bind(camper.age())
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    return Err(BackendError::CamperNotFound(id));
                }

                let updated = retrieve_camper(&mut *tx, id)
                    .await
                    .map_err(map_sqlx_error)?
                    .ok_or(BackendError::CamperNotFound(id))?;

                tx.commit().await.map_err(map_sqlx_error)?;

                Ok(updated)
            }
            .boxed()
        }

        fn signups(&self) -> BoxFuture<Result<Vec<Signup>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_signups.sql"));

                let signups = query
                    .try_map(|row: SqliteRow| signup_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(signups)
            }
            .boxed()
        }

        fn signup(&self, id: Id) -> BoxFuture<Result<Option<Signup>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_signup.sql"));

                let signup = query
                    .bind(id)
                    .try_map(|row: SqliteRow| signup_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(signup)
            }
            .boxed()
        }

        fn insert_signup(&self, signup: NewSignup) -> BoxFuture<Result<Signup, BackendError>> {
            async move {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

                if retrieve_camper(&mut *tx, signup.camper_id())
                    .await
                    .map_err(map_sqlx_error)?
                    .is_none()
                {
                    return Err(BackendError::UnknownCamper(signup.camper_id()));
                }

                if retrieve_activity(&mut *tx, signup.activity_id())
                    .await
                    .map_err(map_sqlx_error)?
                    .is_none()
                {
                    return Err(BackendError::UnknownActivity(signup.activity_id()));
                }

                let inserted = sqlx::query(include_str!("queries/create_signup.sql"))
                    .bind(signup.time())
                    .bind(signup.camper_id())
                    .bind(signup.activity_id())
                    .try_map(|row: SqliteRow| signup_from_row(&row))
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;

                tx.commit().await.map_err(map_sqlx_error)?;

                Ok(inserted)
            }
            .boxed()
        }
    }

    async fn retrieve_activity<'e, E>(executor: E, id: Id) -> Result<Option<Activity>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(include_str!("queries/retrieve_activity.sql"))
            .bind(id)
            .try_map(|row: SqliteRow| activity_from_row(&row))
            .fetch_optional(executor)
            .await
    }

    async fn retrieve_camper<'e, E>(executor: E, id: Id) -> Result<Option<Camper>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(include_str!("queries/retrieve_camper.sql"))
            .bind(id)
            .try_map(|row: SqliteRow| camper_from_row(&row))
            .fetch_optional(executor)
            .await
    }

    fn activity_from_row(row: &SqliteRow) -> Result<Activity, sqlx::Error> {
        Ok(Activity::new(
            try_get(row, "id")?,
            try_get(row, "name")?,
            try_get(row, "difficulty")?,
        ))
    }

    fn camper_from_row(row: &SqliteRow) -> Result<Camper, sqlx::Error> {
        // the validators already ran before these values were written,
        // so a failure here means the table was edited by hand
        let name: String = try_get(row, "name")?;
        let name = CamperName::new(name)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let age = CamperAge::new(try_get(row, "age")?)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Camper::new(
            try_get(row, "id")?,
            times_from_row(row)?,
            name,
            age,
        ))
    }

    fn signup_from_row(row: &SqliteRow) -> Result<Signup, sqlx::Error> {
        let time = SignupTime::new(try_get(row, "time")?)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Signup::new(
            try_get(row, "id")?,
            time,
            try_get(row, "camper_id")?,
            try_get(row, "activity_id")?,
        ))
    }

    fn times_from_row(row: &SqliteRow) -> Result<Times, sqlx::Error> {
        Ok(Times {
            created_at: try_get(row, "created_at")?,
            updated_at: try_get(row, "updated_at")?,
        })
    }

    fn try_get<'a, T: sqlx::Type<Sqlite> + sqlx::Decode<'a, Sqlite>>(
        row: &'a SqliteRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::Row;

        row.try_get(column)
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        use sqlx::Error;

        match error {
            Error::Database(ref e) if e.is_foreign_key_violation() => {
                BackendError::ForeignKeyViolation
            }
            _ => BackendError::Sqlx { source: error },
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        async fn migrated_pool() -> SqlitePool {
            let pool = connect("sqlite::memory:").await.unwrap();
            migrate(&pool).await.unwrap();

            pool
        }

        #[tokio::test]
        async fn foreign_key_failures_are_reported_as_such() {
            let pool = migrated_pool().await;

            let error = sqlx::query(
                "INSERT INTO signups (time, camper_id, activity_id) VALUES (?, ?, ?)",
            )
            .bind(9_i64)
            .bind(1_i64)
            .bind(1_i64)
            .execute(&pool)
            .await
            .unwrap_err();

            assert!(matches!(
                map_sqlx_error(error),
                BackendError::ForeignKeyViolation
            ));

            let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM signups")
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(count.0, 0);
        }

        #[tokio::test]
        async fn other_failures_stay_storage_errors() {
            let pool = migrated_pool().await;

            let error = sqlx::query("SELECT * FROM bunks")
                .execute(&pool)
                .await
                .unwrap_err();

            assert!(matches!(map_sqlx_error(error), BackendError::Sqlx { .. }));
        }
    }
}
