//! An in-memory [`Db`](super::Db) with the same uniqueness and cascade
//! semantics as the Postgres implementation, for exercising routes
//! without a database.

use std::sync::RwLock;

use futures::future::{self, BoxFuture, FutureExt};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::registration::{Registration, RegistrationEntry, MISSING};
use crate::student::{NewStudentRecord, Student, StudentRecord};
use crate::times::Times;
use crate::workshop::{NewWorkshop, Workshop, WorkshopUpdate, WorkshopVideo};

use super::Db;

#[derive(Default)]
pub struct MockDb {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    students: Vec<StudentRecord>,
    workshops: Vec<StoredWorkshop>,
    registrations: Vec<Registration>,
}

struct StoredWorkshop {
    workshop: Workshop,
    video: Option<WorkshopVideo>,
}

impl State {
    /// Clones a stored workshop with its computed read-time fields: the
    /// registrant emails in registration order and the video flag.
    fn enrich(&self, stored: &StoredWorkshop) -> Workshop {
        let mut registrants: Vec<(OffsetDateTime, String)> = self
            .registrations
            .iter()
            .filter(|r| r.workshop_id == stored.workshop.id)
            .filter_map(|r| {
                self.students
                    .iter()
                    .find(|s| s.student.id == r.student_id)
                    .map(|s| (r.registered_at, s.student.email.clone()))
            })
            .collect();
        registrants.sort_by_key(|(registered_at, _)| *registered_at);

        Workshop {
            registrations: registrants.into_iter().map(|(_, email)| email).collect(),
            has_video: stored.video.is_some(),
            ..stored.workshop.clone()
        }
    }
}

fn now_times() -> Times {
    let now = OffsetDateTime::now_utc();

    Times {
        created_at: now,
        updated_at: now,
    }
}

impl Db for MockDb {
    fn insert_student(
        &self,
        student: NewStudentRecord,
    ) -> BoxFuture<Result<Student, BackendError>> {
        let mut state = self.state.write().unwrap();

        let result = if state.students.iter().any(|s| s.student.email == student.email) {
            Err(BackendError::EmailAlreadyExists)
        } else if student.mobile.is_some()
            && state
                .students
                .iter()
                .any(|s| s.student.mobile == student.mobile)
        {
            Err(BackendError::MobileAlreadyExists)
        } else {
            let created = Student {
                id: Uuid::new_v4(),
                name: student.name,
                email: student.email,
                mobile: student.mobile,
                times: now_times(),
            };

            state.students.push(StudentRecord {
                student: created.clone(),
                password_hash: student.password_hash,
            });

            Ok(created)
        };

        future::ready(result).boxed()
    }

    fn student_by_email(
        &self,
        email: &str,
    ) -> BoxFuture<Result<Option<StudentRecord>, BackendError>> {
        let state = self.state.read().unwrap();

        let record = state
            .students
            .iter()
            .find(|s| {
                s.student.email == email || s.student.mobile.as_deref() == Some(email)
            })
            .cloned();

        future::ready(Ok(record)).boxed()
    }

    fn insert_workshop(
        &self,
        workshop: NewWorkshop,
    ) -> BoxFuture<Result<Workshop, BackendError>> {
        let mut state = self.state.write().unwrap();

        let created = Workshop {
            id: Uuid::new_v4(),
            title: workshop.title,
            description: workshop.description,
            image: workshop.image,
            date: workshop.date,
            live_url: workshop.live_url,
            video_url: workshop.video_url,
            has_video: false,
            registrations: vec![],
            times: now_times(),
        };

        state.workshops.push(StoredWorkshop {
            workshop: created.clone(),
            video: None,
        });

        future::ready(Ok(created)).boxed()
    }

    fn list_workshops(&self) -> BoxFuture<Result<Vec<Workshop>, BackendError>> {
        let state = self.state.read().unwrap();

        let workshops = state
            .workshops
            .iter()
            .map(|stored| state.enrich(stored))
            .collect();

        future::ready(Ok(workshops)).boxed()
    }

    fn retrieve_workshop(&self, id: &Uuid) -> BoxFuture<Result<Option<Workshop>, BackendError>> {
        let state = self.state.read().unwrap();

        let workshop = state
            .workshops
            .iter()
            .find(|stored| stored.workshop.id == *id)
            .map(|stored| state.enrich(stored));

        future::ready(Ok(workshop)).boxed()
    }

    fn update_workshop(
        &self,
        id: &Uuid,
        update: WorkshopUpdate,
    ) -> BoxFuture<Result<Workshop, BackendError>> {
        let mut state = self.state.write().unwrap();

        let result = match state
            .workshops
            .iter_mut()
            .find(|stored| stored.workshop.id == *id)
        {
            None => Err(BackendError::WorkshopNotFound),
            Some(stored) => {
                if let Some(title) = update.title {
                    stored.workshop.title = title;
                }
                if let Some(description) = update.description {
                    stored.workshop.description = description;
                }
                if let Some(image) = update.image {
                    stored.workshop.image = image;
                }
                if let Some(date) = update.date {
                    stored.workshop.date = date;
                }
                if let Some(live_url) = update.live_url {
                    stored.workshop.live_url = Some(live_url);
                }

                // a stored payload and an external video URL are mutually
                // exclusive, matching the SQL update
                match (update.video, update.video_url) {
                    (Some(video), _) => {
                        stored.video = Some(video);
                        stored.workshop.video_url = None;
                    }
                    (None, Some(video_url)) => {
                        stored.workshop.video_url = Some(video_url);
                        stored.video = None;
                    }
                    (None, None) => {}
                }

                stored.workshop.times.updated_at = OffsetDateTime::now_utc();

                Ok(())
            }
        };

        let result = result.map(|()| {
            let stored = state
                .workshops
                .iter()
                .find(|stored| stored.workshop.id == *id)
                .expect("updated workshop must exist");

            state.enrich(stored)
        });

        future::ready(result).boxed()
    }

    fn delete_workshop(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
        let mut state = self.state.write().unwrap();

        let result = match state
            .workshops
            .iter()
            .position(|stored| stored.workshop.id == *id)
        {
            None => Err(BackendError::WorkshopNotFound),
            Some(index) => {
                state.workshops.remove(index);
                state.registrations.retain(|r| r.workshop_id != *id);

                Ok(())
            }
        };

        future::ready(result).boxed()
    }

    fn insert_registration(
        &self,
        student_id: &Uuid,
        workshop_id: &Uuid,
        phone_number: &str,
    ) -> BoxFuture<Result<Registration, BackendError>> {
        let mut state = self.state.write().unwrap();

        let result = if !state.students.iter().any(|s| s.student.id == *student_id) {
            Err(BackendError::StudentNotFound)
        } else if !state
            .workshops
            .iter()
            .any(|stored| stored.workshop.id == *workshop_id)
        {
            Err(BackendError::WorkshopNotFound)
        } else if state
            .registrations
            .iter()
            .any(|r| r.student_id == *student_id && r.workshop_id == *workshop_id)
        {
            Err(BackendError::AlreadyRegistered)
        } else {
            let registration = Registration {
                id: Uuid::new_v4(),
                student_id: *student_id,
                workshop_id: *workshop_id,
                phone_number: phone_number.to_owned(),
                registered_at: OffsetDateTime::now_utc(),
            };

            state.registrations.push(registration.clone());

            Ok(registration)
        };

        future::ready(result).boxed()
    }

    fn workshops_for_student(
        &self,
        student_id: &Uuid,
    ) -> BoxFuture<Result<Vec<Workshop>, BackendError>> {
        let state = self.state.read().unwrap();

        let mut enrollments: Vec<(OffsetDateTime, Workshop)> = state
            .registrations
            .iter()
            .filter(|r| r.student_id == *student_id)
            .filter_map(|r| {
                // silently drop references to workshops that no longer exist
                state
                    .workshops
                    .iter()
                    .find(|stored| stored.workshop.id == r.workshop_id)
                    .map(|stored| (r.registered_at, state.enrich(stored)))
            })
            .collect();
        enrollments.sort_by_key(|(registered_at, _)| *registered_at);

        let workshops = enrollments
            .into_iter()
            .map(|(_, workshop)| workshop)
            .collect();

        future::ready(Ok(workshops)).boxed()
    }

    fn registrations_for_workshop(
        &self,
        workshop_id: &Uuid,
    ) -> BoxFuture<Result<Vec<RegistrationEntry>, BackendError>> {
        let state = self.state.read().unwrap();

        let mut registrations: Vec<&Registration> = state
            .registrations
            .iter()
            .filter(|r| r.workshop_id == *workshop_id)
            .collect();
        registrations.sort_by_key(|r| r.registered_at);

        let entries = registrations
            .into_iter()
            .map(|r| {
                let student = state
                    .students
                    .iter()
                    .find(|s| s.student.id == r.student_id)
                    .map(|s| &s.student);
                let workshop = state
                    .workshops
                    .iter()
                    .find(|stored| stored.workshop.id == r.workshop_id)
                    .map(|stored| &stored.workshop);

                RegistrationEntry {
                    id: r.id,
                    student_name: student
                        .map(|s| s.name.clone())
                        .unwrap_or_else(|| MISSING.to_owned()),
                    student_email: student
                        .map(|s| s.email.clone())
                        .unwrap_or_else(|| MISSING.to_owned()),
                    phone_number: r.phone_number.clone(),
                    registered_at: r.registered_at,
                    workshop_title: workshop
                        .map(|w| w.title.clone())
                        .unwrap_or_else(|| MISSING.to_owned()),
                }
            })
            .collect();

        future::ready(Ok(entries)).boxed()
    }

    fn retrieve_video(
        &self,
        workshop_id: &Uuid,
    ) -> BoxFuture<Result<Option<WorkshopVideo>, BackendError>> {
        let state = self.state.read().unwrap();

        let video = state
            .workshops
            .iter()
            .find(|stored| stored.workshop.id == *workshop_id)
            .and_then(|stored| stored.video.clone());

        future::ready(Ok(video)).boxed()
    }
}
