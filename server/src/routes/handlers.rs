use std::time::{Duration, Instant};

use log::debug;
use time::Date;
use uuid::Uuid;
use warp::{
    filters::multipart::FormData,
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::auth;
use crate::db::Db;
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::io::{parse_update, UpdateSubmission};
use crate::normalization::normalize_email;
use crate::range;
use crate::registration::RegistrationRequest;
use crate::routes::{
    rejection::{Context, Rejection},
    response::SuccessResponse,
};
use crate::student::{AuthenticatedUser, LoginRequest, NewStudent, NewStudentRecord, Role};
use crate::workshop::{NewWorkshop, WorkshopUpdate, WorkshopVideo};

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        // TODO when `try` blocks are stabilized, we can wrap the body
        // and return the headers even on errors
        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

pub async fn signup(environment: Environment, student: NewStudent) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::signup(student.email.clone()), e);

        require_field(&student.name, "name").map_err(&error_handler)?;
        require_field(&student.email, "email").map_err(&error_handler)?;
        require_field(&student.password, "password").map_err(&error_handler)?;

        debug!(environment.logger, "Registering student..."; "email" => &student.email);

        let password_hash = auth::hash_password(&student.password).map_err(&error_handler)?;

        let record = NewStudentRecord {
            name: student.name.trim().to_owned(),
            email: student.email.clone(),
            mobile: student
                .mobile
                .as_deref()
                .map(str::trim)
                .filter(|mobile| !mobile.is_empty())
                .map(str::to_owned),
            password_hash,
        };

        let created = environment
            .db
            .insert_student(record)
            .await
            .map_err(&error_handler)?;

        with_status(
            json(&SuccessResponse::Signup {
                message: "Student registered successfully",
                student: created,
            }),
            StatusCode::CREATED,
        )
    }
}

pub async fn login(environment: Environment, request: LoginRequest) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::login(request.email.clone()), e);

        require_field(&request.email, "email").map_err(&error_handler)?;
        require_field(&request.password, "password").map_err(&error_handler)?;

        debug!(environment.logger, "Logging in..."; "email" => &request.email, "role" => ?request.role);

        let user = match request.role {
            Role::Admin => {
                auth::check_admin(&environment.config, &request.email, &request.password)
                    .map_err(&error_handler)?;

                AuthenticatedUser::admin(environment.config.admin_email.clone())
            }
            Role::Student => {
                let record = environment
                    .db
                    .student_by_email(&request.email)
                    .await
                    .map_err(&error_handler)?
                    .ok_or(BackendError::InvalidCredentials)
                    .map_err(&error_handler)?;

                auth::verify_password(&request.password, &record.password_hash)
                    .map_err(&error_handler)?;

                AuthenticatedUser::student(record.student)
            }
        };

        json(&SuccessResponse::Login {
            message: "Login successful",
            user,
        })
    }
}

pub async fn workshops_list(environment: Environment) -> RouteResult {
    timed! {
        let workshops = environment
            .db
            .list_workshops()
            .await
            .map_err(|e: BackendError| Rejection::new(Context::list(), e))?;

        json(&workshops)
    }
}

pub async fn workshop_create(environment: Environment, workshop: NewWorkshop) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::create(workshop.title.clone()), e);

        require_field(&workshop.title, "title").map_err(&error_handler)?;
        require_field(&workshop.description, "description").map_err(&error_handler)?;
        require_field(&workshop.image, "image").map_err(&error_handler)?;

        debug!(environment.logger, "Creating workshop..."; "title" => &workshop.title);

        let created = environment
            .db
            .insert_workshop(workshop.clone())
            .await
            .map_err(&error_handler)?;

        let location = environment.urls.workshop(&created.id);

        with_header(
            with_status(
                json(&SuccessResponse::Created {
                    message: "Workshop created successfully",
                    workshop: created,
                }),
                StatusCode::CREATED,
            ),
            "location",
            location.as_str(),
        )
    }
}

pub async fn workshop_retrieve(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::retrieve(id.clone()), e);

        let id = parse_id(&id).map_err(&error_handler)?;
        debug!(environment.logger, "Retrieving workshop..."; "id" => %id);

        let workshop = environment
            .db
            .retrieve_workshop(&id)
            .await
            .map_err(&error_handler)?
            .ok_or(BackendError::WorkshopNotFound)
            .map_err(&error_handler)?;

        json(&workshop)
    }
}

pub async fn workshop_update(
    environment: Environment,
    id: String,
    content: FormData,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::update(id.clone()), e);

        let id = parse_id(&id).map_err(&error_handler)?;

        debug!(environment.logger, "Parsing update submission..."; "id" => %id);
        let submission = parse_update(content).await.map_err(&error_handler)?;
        let update = workshop_update_from(submission).map_err(&error_handler)?;

        debug!(environment.logger, "Updating workshop..."; "id" => %id);
        let updated = environment
            .db
            .update_workshop(&id, update)
            .await
            .map_err(&error_handler)?;

        json(&SuccessResponse::Updated {
            message: "Workshop updated successfully",
            workshop: updated,
        })
    }
}

pub async fn workshop_delete(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::delete(id.clone()), e);

        let id = parse_id(&id).map_err(&error_handler)?;
        debug!(environment.logger, "Deleting workshop and its registrations..."; "id" => %id);

        environment
            .db
            .delete_workshop(&id)
            .await
            .map_err(&error_handler)?;

        json(&SuccessResponse::Deleted {
            message: "Workshop deleted successfully",
        })
    }
}

pub async fn workshop_video(
    environment: Environment,
    id: String,
    range_header: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::video(id.clone()), e);

        let id = parse_id(&id).map_err(&error_handler)?;
        debug!(environment.logger, "Serving video..."; "id" => %id, "range" => ?range_header);

        let video = environment
            .db
            .retrieve_video(&id)
            .await
            .map_err(&error_handler)?
            .ok_or(BackendError::NoVideo)
            .map_err(&error_handler)?;

        video_reply(video, range_header).map_err(&error_handler)?
    }
}

pub async fn workshop_register(
    environment: Environment,
    id: String,
    request: RegistrationRequest,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| {
            Rejection::new(Context::enroll(id.clone(), request.student_email.clone()), e)
        };

        require_field(&request.student_email, "studentEmail").map_err(&error_handler)?;
        require_field(&request.phone_number, "phoneNumber").map_err(&error_handler)?;

        let workshop_id = parse_id(&id).map_err(&error_handler)?;
        debug!(environment.logger, "Registering student for workshop..."; "id" => %workshop_id, "email" => &request.student_email);

        let student = environment
            .db
            .student_by_email(&request.student_email)
            .await
            .map_err(&error_handler)?
            .ok_or(BackendError::StudentNotFound)
            .map_err(&error_handler)?;

        let _ = environment
            .db
            .retrieve_workshop(&workshop_id)
            .await
            .map_err(&error_handler)?
            .ok_or(BackendError::WorkshopNotFound)
            .map_err(&error_handler)?;

        // the unique constraint on the (student, workshop) pair rejects a
        // concurrent duplicate, so the insert itself is the serialization
        // point
        let _ = environment
            .db
            .insert_registration(&student.student.id, &workshop_id, request.phone_number.trim())
            .await
            .map_err(&error_handler)?;

        json(&SuccessResponse::Enrolled {
            message: "Successfully registered!",
        })
    }
}

pub async fn registered_workshops(environment: Environment, email: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::registered_workshops(email.clone()), e);

        let email = normalize_email(&email);
        debug!(environment.logger, "Listing workshops for student..."; "email" => &email);

        let student = environment
            .db
            .student_by_email(&email)
            .await
            .map_err(&error_handler)?
            .ok_or(BackendError::StudentNotFound)
            .map_err(&error_handler)?;

        let workshops = environment
            .db
            .workshops_for_student(&student.student.id)
            .await
            .map_err(&error_handler)?;

        json(&workshops)
    }
}

pub async fn workshop_registrations(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::registrations(id.clone()), e);

        let id = parse_id(&id).map_err(&error_handler)?;
        debug!(environment.logger, "Listing registrations..."; "id" => %id);

        let registrations = environment
            .db
            .registrations_for_workshop(&id)
            .await
            .map_err(&error_handler)?;

        json(&SuccessResponse::Registrations { registrations })
    }
}

fn require_field(value: &str, name: &'static str) -> Result<(), BackendError> {
    if value.trim().is_empty() {
        Err(BackendError::MissingField(name))
    } else {
        Ok(())
    }
}

fn parse_id(id: &str) -> Result<Uuid, BackendError> {
    Uuid::parse_str(id).map_err(|_| BackendError::InvalidId(id.to_owned()))
}

fn workshop_update_from(submission: UpdateSubmission) -> Result<WorkshopUpdate, BackendError> {
    let mut fields = submission.fields;
    let mut take = |name: &str| fields.remove(name).filter(|value| !value.trim().is_empty());

    let title = take("title");
    let description = take("description");
    let image = take("image");
    let live_url = take("liveUrl");
    let video_url = take("videoUrl");

    let date = match take("date") {
        Some(raw) => Some(
            Date::parse(&raw, crate::times::date::FORMAT)
                .map_err(|_| BackendError::MalformedDate(raw))?,
        ),
        None => None,
    };

    Ok(WorkshopUpdate {
        title,
        description,
        image,
        date,
        live_url,
        video_url,
        video: submission
            .video
            .map(|(content_type, data)| WorkshopVideo { content_type, data }),
    })
}

fn video_reply(
    video: WorkshopVideo,
    range_header: Option<String>,
) -> Result<warp::http::Response<Vec<u8>>, BackendError> {
    use warp::http::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};
    use warp::http::Response;

    let total = video.data.len() as u64;

    let response = match range_header {
        None => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, video.content_type.as_str())
            .header(ACCEPT_RANGES, "bytes")
            .header(CONTENT_LENGTH, total)
            .body(video.data),
        Some(header) => {
            let range = range::parse(&header, total)?;
            let slice = video.data[range.start as usize..=range.end as usize].to_vec();

            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(CONTENT_TYPE, video.content_type.as_str())
                .header(ACCEPT_RANGES, "bytes")
                .header(
                    CONTENT_RANGE,
                    format!("bytes {}-{}/{}", range.start, range.end, total),
                )
                .header(CONTENT_LENGTH, range.length())
                .body(slice)
        }
    };

    response.map_err(|source| BackendError::VideoResponse { source })
}

fn format_server_timing(elapsed: Duration) -> String {
    format!("handler;dur={}", elapsed.as_secs_f64() * 1000.0)
}
