use std::collections::HashMap;
use std::io;

use bytes::{Buf, Bytes};
use futures::stream::{Stream, StreamExt};
use warp::filters::multipart::{FormData, Part};

use crate::errors::BackendError;

/// The pieces of a multipart update submission: named text fields plus an
/// optional binary video payload with its declared content type.
#[derive(Debug, Default)]
pub struct UpdateSubmission {
    pub(crate) fields: HashMap<String, String>,
    pub(crate) video: Option<(String, Vec<u8>)>,
}

/// Splits a multipart form into text fields and the optional video part.
pub async fn parse_update(form: FormData) -> Result<UpdateSubmission, BackendError> {
    let parts: Vec<Result<Part, _>> = form.collect::<Vec<_>>().await;

    let mut submission = UpdateSubmission::default();

    for part in parts {
        let part = part.map_err(|_| BackendError::MalformedFormSubmission)?;
        let name = part.name().to_owned();

        if name == "video" {
            let content_type = part
                .content_type()
                .map(str::to_owned)
                .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

            // reject declared types that could not round-trip into a
            // response header
            content_type
                .parse::<mime::Mime>()
                .map_err(|_| BackendError::MalformedFormSubmission)?;

            let data = part_as_vec(part)
                .await
                .map_err(|_| BackendError::MalformedFormSubmission)?;

            // an empty file input counts as no upload
            if !data.is_empty() {
                submission.video = Some((content_type, data));
            }
        } else {
            let data = part_as_vec(part)
                .await
                .map_err(|_| BackendError::MalformedFormSubmission)?;
            let value =
                String::from_utf8(data).map_err(|_| BackendError::MalformedFormSubmission)?;

            submission.fields.insert(name, value);
        }
    }

    Ok(submission)
}

/// Collects chunks of [`Part`].
pub async fn part_as_vec(raw: Part) -> Result<Vec<u8>, ()> {
    let chunks = part_as_stream(raw).collect::<Vec<_>>().await;

    let mut data = vec![];

    for chunk in chunks {
        data.extend_from_slice(&chunk.map_err(|_| ())?);
    }

    Ok(data)
}

/// Collects raw data from [`Part`].
pub fn part_as_stream(raw: Part) -> impl Stream<Item = Result<Bytes, io::Error>> {
    raw.stream().map(|r| {
        r.map(|mut buf| buf.copy_to_bytes(buf.remaining()))
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "could not retrieve chunk"))
    })
}
