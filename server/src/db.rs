use futures::future::BoxFuture;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::registration::{Registration, RegistrationEntry};
use crate::student::{NewStudentRecord, Student, StudentRecord};
use crate::workshop::{NewWorkshop, Workshop, WorkshopUpdate, WorkshopVideo};

pub trait Db {
    fn insert_student(
        &self,
        student: NewStudentRecord,
    ) -> BoxFuture<Result<Student, BackendError>>;

    /// Looks up a student by email or, failing that, mobile number.
    fn student_by_email(
        &self,
        email: &str,
    ) -> BoxFuture<Result<Option<StudentRecord>, BackendError>>;

    fn insert_workshop(&self, workshop: NewWorkshop)
        -> BoxFuture<Result<Workshop, BackendError>>;

    fn list_workshops(&self) -> BoxFuture<Result<Vec<Workshop>, BackendError>>;

    fn retrieve_workshop(&self, id: &Uuid) -> BoxFuture<Result<Option<Workshop>, BackendError>>;

    fn update_workshop(
        &self,
        id: &Uuid,
        update: WorkshopUpdate,
    ) -> BoxFuture<Result<Workshop, BackendError>>;

    /// Deletes the workshop and every registration referencing it as one
    /// all-or-nothing unit.
    fn delete_workshop(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>>;

    fn insert_registration(
        &self,
        student_id: &Uuid,
        workshop_id: &Uuid,
        phone_number: &str,
    ) -> BoxFuture<Result<Registration, BackendError>>;

    fn workshops_for_student(
        &self,
        student_id: &Uuid,
    ) -> BoxFuture<Result<Vec<Workshop>, BackendError>>;

    fn registrations_for_workshop(
        &self,
        workshop_id: &Uuid,
    ) -> BoxFuture<Result<Vec<RegistrationEntry>, BackendError>>;

    fn retrieve_video(
        &self,
        workshop_id: &Uuid,
    ) -> BoxFuture<Result<Option<WorkshopVideo>, BackendError>>;
}

pub use self::postgres::*;

pub mod mock;

mod postgres {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::{
        self,
        postgres::{PgPool, PgRow},
    };
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::errors::BackendError;
    use crate::registration::{Registration, RegistrationEntry};
    use crate::student::{NewStudentRecord, Student, StudentRecord};
    use crate::times::Times;
    use crate::workshop::{NewWorkshop, Workshop, WorkshopUpdate, WorkshopVideo};

    const STUDENTS_EMAIL_CONSTRAINT: &str = "students_email";
    const STUDENTS_MOBILE_CONSTRAINT: &str = "students_mobile";
    const REGISTRATIONS_PAIR_CONSTRAINT: &str = "registrations_student_workshop";
    const REGISTRATIONS_STUDENT_FK: &str = "registrations_student_id_fkey";
    const REGISTRATIONS_WORKSHOP_FK: &str = "registrations_workshop_id_fkey";

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Db for PgDb {
        fn insert_student(
            &self,
            student: NewStudentRecord,
        ) -> BoxFuture<Result<Student, BackendError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/create_student.sql"));

                let (id, created_at, updated_at): (Uuid, OffsetDateTime, OffsetDateTime) = query
                    .bind(&student.name)
                    .bind(&student.email)
                    .bind(&student.mobile)
                    .bind(&student.password_hash)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(Student {
                    id,
                    name: student.name,
                    email: student.email,
                    mobile: student.mobile,
                    times: Times {
                        created_at,
                        updated_at,
                    },
                })
            }
            .boxed()
        }

        fn student_by_email(
            &self,
            email: &str,
        ) -> BoxFuture<Result<Option<StudentRecord>, BackendError>> {
            let email = email.to_owned();

            async move {
                let query = sqlx::query(include_str!("queries/retrieve_student.sql"));

                let record: Option<StudentRecord> = query
                    .bind(email)
                    .try_map(|row: PgRow| {
                        Ok(StudentRecord {
                            student: Student {
                                id: try_get(&row, "id")?,
                                name: try_get(&row, "name")?,
                                email: try_get(&row, "email")?,
                                mobile: try_get(&row, "mobile")?,
                                times: Times {
                                    created_at: try_get(&row, "created_at")?,
                                    updated_at: try_get(&row, "updated_at")?,
                                },
                            },
                            password_hash: try_get(&row, "password_hash")?,
                        })
                    })
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(record)
            }
            .boxed()
        }

        fn insert_workshop(
            &self,
            workshop: NewWorkshop,
        ) -> BoxFuture<Result<Workshop, BackendError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/create_workshop.sql"));

                let (id, created_at, updated_at): (Uuid, OffsetDateTime, OffsetDateTime) = query
                    .bind(&workshop.title)
                    .bind(&workshop.description)
                    .bind(&workshop.image)
                    .bind(workshop.date)
                    .bind(&workshop.live_url)
                    .bind(&workshop.video_url)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(Workshop {
                    id,
                    title: workshop.title,
                    description: workshop.description,
                    image: workshop.image,
                    date: workshop.date,
                    live_url: workshop.live_url,
                    video_url: workshop.video_url,
                    has_video: false,
                    registrations: vec![],
                    times: Times {
                        created_at,
                        updated_at,
                    },
                })
            }
            .boxed()
        }

        fn list_workshops(&self) -> BoxFuture<Result<Vec<Workshop>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/list_workshops.sql"));

                let workshops = query
                    .try_map(|row: PgRow| workshop_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(workshops)
            }
            .boxed()
        }

        fn retrieve_workshop(
            &self,
            id: &Uuid,
        ) -> BoxFuture<Result<Option<Workshop>, BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/retrieve_workshop.sql"));

                let workshop = query
                    .bind(id)
                    .try_map(|row: PgRow| workshop_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(workshop)
            }
            .boxed()
        }

        fn update_workshop(
            &self,
            id: &Uuid,
            update: WorkshopUpdate,
        ) -> BoxFuture<Result<Workshop, BackendError>> {
            let id = *id;

            async move {
                let (video_data, video_content_type) = match update.video {
                    Some(video) => (Some(video.data), Some(video.content_type)),
                    None => (None, None),
                };

                let count = sqlx::query(include_str!("queries/update_workshop.sql"))
                    .bind(id)
                    .bind(&update.title)
                    .bind(&update.description)
                    .bind(&update.image)
                    .bind(update.date)
                    .bind(&update.live_url)
                    .bind(&update.video_url)
                    .bind(&video_data)
                    .bind(&video_content_type)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    return Err(BackendError::WorkshopNotFound);
                }

                let query = sqlx::query(include_str!("queries/retrieve_workshop.sql"));

                query
                    .bind(id)
                    .try_map(|row: PgRow| workshop_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .ok_or(BackendError::WorkshopNotFound)
            }
            .boxed()
        }

        fn delete_workshop(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
            let id = *id;

            async move {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

                sqlx::query(include_str!("queries/delete_workshop_registrations.sql"))
                    .bind(id)
                    .execute(&mut tx)
                    .await
                    .map_err(map_sqlx_error)?;

                let count = sqlx::query(include_str!("queries/delete_workshop.sql"))
                    .bind(id)
                    .execute(&mut tx)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    tx.rollback().await.map_err(map_sqlx_error)?;
                    return Err(BackendError::WorkshopNotFound);
                }

                tx.commit().await.map_err(map_sqlx_error)?;

                Ok(())
            }
            .boxed()
        }

        fn insert_registration(
            &self,
            student_id: &Uuid,
            workshop_id: &Uuid,
            phone_number: &str,
        ) -> BoxFuture<Result<Registration, BackendError>> {
            let student_id = *student_id;
            let workshop_id = *workshop_id;
            let phone_number = phone_number.to_owned();

            async move {
                let query = sqlx::query_as(include_str!("queries/create_registration.sql"));

                let (id, registered_at): (Uuid, OffsetDateTime) = query
                    .bind(student_id)
                    .bind(workshop_id)
                    .bind(&phone_number)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(Registration {
                    id,
                    student_id,
                    workshop_id,
                    phone_number,
                    registered_at,
                })
            }
            .boxed()
        }

        fn workshops_for_student(
            &self,
            student_id: &Uuid,
        ) -> BoxFuture<Result<Vec<Workshop>, BackendError>> {
            let student_id = *student_id;

            async move {
                let query = sqlx::query(include_str!("queries/workshops_for_student.sql"));

                let workshops = query
                    .bind(student_id)
                    .try_map(|row: PgRow| workshop_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(workshops)
            }
            .boxed()
        }

        fn registrations_for_workshop(
            &self,
            workshop_id: &Uuid,
        ) -> BoxFuture<Result<Vec<RegistrationEntry>, BackendError>> {
            let workshop_id = *workshop_id;

            async move {
                let query = sqlx::query(include_str!("queries/registrations_for_workshop.sql"));

                let entries = query
                    .bind(workshop_id)
                    .try_map(|row: PgRow| {
                        Ok(RegistrationEntry {
                            id: try_get(&row, "id")?,
                            student_name: try_get(&row, "student_name")?,
                            student_email: try_get(&row, "student_email")?,
                            phone_number: try_get(&row, "phone_number")?,
                            registered_at: try_get(&row, "registered_at")?,
                            workshop_title: try_get(&row, "workshop_title")?,
                        })
                    })
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(entries)
            }
            .boxed()
        }

        fn retrieve_video(
            &self,
            workshop_id: &Uuid,
        ) -> BoxFuture<Result<Option<WorkshopVideo>, BackendError>> {
            let workshop_id = *workshop_id;

            async move {
                let query = sqlx::query(include_str!("queries/retrieve_video.sql"));

                let video: Option<Option<WorkshopVideo>> = query
                    .bind(workshop_id)
                    .try_map(|row: PgRow| {
                        let data: Option<Vec<u8>> = try_get(&row, "video")?;
                        let content_type: Option<String> = try_get(&row, "video_content_type")?;

                        Ok(match (data, content_type) {
                            (Some(data), Some(content_type)) => Some(WorkshopVideo {
                                content_type,
                                data,
                            }),
                            _ => None,
                        })
                    })
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(video.flatten())
            }
            .boxed()
        }
    }

    fn workshop_from_row(row: &PgRow) -> Result<Workshop, sqlx::Error> {
        Ok(Workshop {
            id: try_get(row, "id")?,
            title: try_get(row, "title")?,
            description: try_get(row, "description")?,
            image: try_get(row, "image_url")?,
            date: try_get(row, "event_date")?,
            live_url: try_get(row, "live_url")?,
            video_url: try_get(row, "video_url")?,
            has_video: try_get(row, "has_video")?,
            registrations: try_get(row, "registrations")?,
            times: Times {
                created_at: try_get(row, "created_at")?,
                updated_at: try_get(row, "updated_at")?,
            },
        })
    }

    fn try_get<'a, T: sqlx::Type<sqlx::Postgres> + sqlx::decode::Decode<'a, sqlx::Postgres>>(
        row: &'a PgRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::prelude::*;

        row.try_get(column)
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        use sqlx::Error;

        match error {
            Error::Database(ref e) if e.constraint() == Some(STUDENTS_EMAIL_CONSTRAINT) => {
                BackendError::EmailAlreadyExists
            }
            Error::Database(ref e) if e.constraint() == Some(STUDENTS_MOBILE_CONSTRAINT) => {
                BackendError::MobileAlreadyExists
            }
            Error::Database(ref e) if e.constraint() == Some(REGISTRATIONS_PAIR_CONSTRAINT) => {
                BackendError::AlreadyRegistered
            }
            Error::Database(ref e) if e.constraint() == Some(REGISTRATIONS_STUDENT_FK) => {
                BackendError::StudentNotFound
            }
            Error::Database(ref e) if e.constraint() == Some(REGISTRATIONS_WORKSHOP_FK) => {
                BackendError::WorkshopNotFound
            }
            _ => BackendError::Sqlx { source: error },
        }
    }
}
