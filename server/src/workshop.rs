use std::fmt;

use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::times::Times;

/// A single workshop in the catalog.
///
/// The `registrations` list is computed from the registration records at
/// read time, so its length always equals the true registration count.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workshop {
    /// The ID of the workshop.
    pub(crate) id: Uuid,

    /// The title shown in the catalog.
    pub(crate) title: String,

    /// The description shown in the catalog.
    pub(crate) description: String,

    /// The URL of the cover image.
    pub(crate) image: String,

    /// The calendar date of the live event.
    #[serde(with = "crate::times::date")]
    pub(crate) date: Date,

    /// An externally hosted live-session URL, if any.
    pub(crate) live_url: Option<String>,

    /// An externally hosted pre-recorded video URL, if any. Mutually
    /// exclusive with a stored video payload.
    pub(crate) video_url: Option<String>,

    /// Whether a video payload is stored for this workshop.
    pub(crate) has_video: bool,

    /// The emails of the registered students.
    pub(crate) registrations: Vec<String>,

    /// The times it was created and updated.
    #[serde(flatten)]
    pub(crate) times: Times,
}

/// The request body for creating a workshop.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkshop {
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) image: String,
    #[serde(deserialize_with = "crate::times::date::deserialize")]
    pub(crate) date: Date,
    #[serde(default)]
    pub(crate) live_url: Option<String>,
    #[serde(default)]
    pub(crate) video_url: Option<String>,
}

/// A partial update; only supplied fields are written. Supplying a video
/// payload clears any external video URL and vice versa.
#[derive(Clone, Debug, Default)]
pub struct WorkshopUpdate {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) image: Option<String>,
    pub(crate) date: Option<Date>,
    pub(crate) live_url: Option<String>,
    pub(crate) video_url: Option<String>,
    pub(crate) video: Option<WorkshopVideo>,
}

/// A stored video payload with its declared content type.
#[derive(Clone)]
pub struct WorkshopVideo {
    pub(crate) content_type: String,
    pub(crate) data: Vec<u8>,
}

impl fmt::Debug for WorkshopVideo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WorkshopVideo")
            .field("content_type", &self.content_type)
            .field("length", &self.data.len())
            .finish()
    }
}
