use serde::Serialize;

use crate::registration::RegistrationEntry;
use crate::student::{AuthenticatedUser, Student};
use crate::workshop::Workshop;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Signup {
        message: &'a str,
        student: Student,
    },
    Login {
        message: &'a str,
        user: AuthenticatedUser,
    },
    Created {
        message: &'a str,
        workshop: Workshop,
    },
    Updated {
        message: &'a str,
        workshop: Workshop,
    },
    Deleted {
        message: &'a str,
    },
    Enrolled {
        message: &'a str,
    },
    Registrations {
        registrations: Vec<RegistrationEntry>,
    },
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
}
