use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            message: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) message: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Context {
    Signup { email: String },
    Login { email: String },
    Create { title: String },
    List {},
    Retrieve { id: String },
    Update { id: String },
    Delete { id: String },
    Video { id: String },
    Enroll { id: String, email: String },
    RegisteredWorkshops { email: String },
    Registrations { id: String },
}

impl Context {
    pub fn signup(email: String) -> Context {
        Context::Signup { email }
    }

    pub fn login(email: String) -> Context {
        Context::Login { email }
    }

    pub fn create(title: String) -> Context {
        Context::Create { title }
    }

    pub fn list() -> Context {
        Context::List {}
    }

    pub fn retrieve(id: String) -> Context {
        Context::Retrieve { id }
    }

    pub fn update(id: String) -> Context {
        Context::Update { id }
    }

    pub fn delete(id: String) -> Context {
        Context::Delete { id }
    }

    pub fn video(id: String) -> Context {
        Context::Video { id }
    }

    pub fn enroll(id: String, email: String) -> Context {
        Context::Enroll { id, email }
    }

    pub fn registered_workshops(email: String) -> Context {
        Context::RegisteredWorkshops { email }
    }

    pub fn registrations(id: String) -> Context {
        Context::Registrations { id }
    }
}
