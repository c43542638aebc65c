//! Typed views over AniList GraphQL responses.
//!
//! Decoders are pure: raw JSON in, domain types out. A `null` aliased payload
//! means that user slot had no data at fetch time (private or deleted) even
//! though the request as a whole succeeded; decoders skip the slot and log
//! the gap, which is distinct from the executor-level classification that
//! fires when the whole request comes back as an HTTP error.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::Value;
use shared::{AnimeEntry, PlanningMap};
use tracing::warn;

use crate::error::ApiError;
use crate::query::{page_alias, user_alias};

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Value,
}

/// Pull the `data` object out of a GraphQL response body.
pub fn data_object(response: Value) -> Result<Value, ApiError> {
    let envelope: Envelope = serde_json::from_value(response)?;
    Ok(envelope.data)
}

#[derive(Debug, Deserialize)]
struct MediaListCollection {
    lists: Vec<MediaListGroup>,
}

#[derive(Debug, Deserialize)]
struct MediaListGroup {
    entries: Vec<MediaListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaListEntry {
    media_id: i64,
    media: Media,
    // Planning entries carry no score
    #[serde(default)]
    score: u8,
}

#[derive(Debug, Deserialize)]
struct Media {
    title: Title,
}

#[derive(Debug, Deserialize)]
struct Title {
    romaji: String,
}

impl MediaListCollection {
    fn into_entries(self) -> Vec<AnimeEntry> {
        self.lists
            .into_iter()
            .flat_map(|group| group.entries)
            .map(|entry| AnimeEntry {
                media_id: entry.media_id,
                title: entry.media.title.romaji,
                score: entry.score,
            })
            .collect()
    }
}

/// Decode a batched completed-list response for users identified by id.
///
/// Users whose aliased payload is `null` are absent from the result.
pub fn completed_by_ids(
    data: Value,
    user_ids: &[i64],
) -> Result<BTreeMap<i64, Vec<AnimeEntry>>, ApiError> {
    let mut collections: HashMap<String, Option<MediaListCollection>> =
        serde_json::from_value(data)?;

    let mut result = BTreeMap::new();
    for (index, user_id) in user_ids.iter().enumerate() {
        match collections.remove(&user_alias(index + 1)).flatten() {
            Some(collection) => {
                result.insert(*user_id, collection.into_entries());
            }
            None => warn!(
                user_id,
                "No list data for user in batch response; private or missing"
            ),
        }
    }
    Ok(result)
}

/// Decode a batched completed-list response for users identified by name.
pub fn completed_by_names(
    data: Value,
    names: &[String],
) -> Result<BTreeMap<String, Vec<AnimeEntry>>, ApiError> {
    let mut collections: HashMap<String, Option<MediaListCollection>> =
        serde_json::from_value(data)?;

    let mut result = BTreeMap::new();
    for (index, name) in names.iter().enumerate() {
        match collections.remove(&user_alias(index + 1)).flatten() {
            Some(collection) => {
                result.insert(name.clone(), collection.into_entries());
            }
            None => warn!(
                user = %name,
                "No list data for user in batch response; private or missing"
            ),
        }
    }
    Ok(result)
}

#[derive(Debug, Deserialize)]
struct PlanningData {
    #[serde(rename = "MediaListCollection")]
    collection: Option<MediaListCollection>,
}

/// Decode a planning-list response into a media-id to title map.
///
/// A `null` collection decodes to an empty map.
pub fn planning(data: Value) -> Result<PlanningMap, ApiError> {
    let payload: PlanningData = serde_json::from_value(data)?;

    let mut map = PlanningMap::new();
    if let Some(collection) = payload.collection {
        for group in collection.lists {
            for entry in group.entries {
                map.insert(entry.media_id, entry.media.title.romaji);
            }
        }
    }
    Ok(map)
}

/// One page of a pagination window over a media's completers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleterPage {
    pub page_info: PageInfo,
    pub media_list: Vec<CompleterEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: i64,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleterEntry {
    pub user_id: i64,
    pub score: u8,
}

/// Decode one aliased page out of a pagination-window response.
///
/// `Ok(None)` means the server returned `null` for the page: the window ran
/// past the end of the data.
pub fn completer_page(data: &Value, page: i64) -> Result<Option<CompleterPage>, ApiError> {
    match data.get(page_alias(page).as_str()) {
        None | Some(Value::Null) => Ok(None),
        Some(payload) => Ok(Some(serde_json::from_value(payload.clone())?)),
    }
}
