use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// The sentinel shown in a roster when a referenced record is missing.
pub(crate) const MISSING: &str = "N/A";

/// The record of one student's enrollment in one workshop. Created only
/// through the register operation and never updated afterwards.
#[derive(Clone, Debug)]
pub struct Registration {
    pub(crate) id: Uuid,
    pub(crate) student_id: Uuid,
    pub(crate) workshop_id: Uuid,
    pub(crate) phone_number: String,
    pub(crate) registered_at: OffsetDateTime,
}

/// One row of a workshop roster, enriched with the registrant's identity.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationEntry {
    pub(crate) id: Uuid,
    pub(crate) student_name: String,
    pub(crate) student_email: String,
    pub(crate) phone_number: String,
    #[serde(with = "crate::times::timestamp")]
    pub(crate) registered_at: OffsetDateTime,
    pub(crate) workshop_title: String,
}

/// The enrollment request body.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    #[serde(deserialize_with = "crate::normalization::deserialize")]
    pub(crate) student_email: String,
    pub(crate) phone_number: String,
}
