//! Share links: a snapshot serialized to JSON in the `data` query parameter.

use thiserror::Error;
use url::form_urlencoded;

use crate::model::PlanSnapshot;

/// Query parameter that carries the snapshot.
pub const SHARE_PARAM: &str = "data";

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("Share link has no 'data' parameter")]
    MissingData,
    #[error("Share payload is not a valid snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Encodes a snapshot as `data=<percent-encoded JSON>`.
pub fn encode_share_query(snapshot: &PlanSnapshot) -> Result<String, ShareError> {
    let payload = serde_json::to_string(snapshot)?;
    Ok(form_urlencoded::Serializer::new(String::new())
        .append_pair(SHARE_PARAM, &payload)
        .finish())
}

/// Builds the full share path below `base`, e.g. `/?data=...`.
pub fn share_path(base: &str, snapshot: &PlanSnapshot) -> Result<String, ShareError> {
    let query = encode_share_query(snapshot)?;
    let base = base.trim_end_matches('?');
    let separator = if base.contains('?') { '&' } else { '?' };
    Ok(format!("{base}{separator}{query}"))
}

/// Parses the already-decoded value of the `data` parameter.
pub fn decode_share_data(raw: &str) -> Result<PlanSnapshot, ShareError> {
    if raw.trim().is_empty() {
        return Err(ShareError::MissingData);
    }
    Ok(serde_json::from_str(raw)?)
}

/// Parses a raw query string (leading `?` optional) into a snapshot.
///
/// Accepts both `+` and `%20` for spaces, so links produced by older
/// clients still decode.
pub fn decode_share_query(query: &str) -> Result<PlanSnapshot, ShareError> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let payload = form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == SHARE_PARAM)
        .map(|(_, value)| value.into_owned())
        .ok_or(ShareError::MissingData)?;
    decode_share_data(&payload)
}
