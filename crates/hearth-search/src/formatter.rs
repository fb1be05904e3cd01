//! Turns merged candidates into the response body.

use std::collections::{BTreeMap, HashMap};

use hearth_core::{Candidate, EntityMatch, EntityRecord, ResultSet, SearchMode};
use serde_json::Value;

/// State reported for a candidate whose live record could not be fetched.
pub const UNKNOWN_STATE: &str = "unknown";

/// Build the [`ResultSet`] for `candidates`, joining each against its live
/// record in `records`.
///
/// Candidates outside `domain_filter` are skipped. `domains` and `count`
/// are computed over the returned results only.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use hearth_core::{Attributes, Candidate, EntityRecord, MatchSource, SearchMode};
/// use hearth_search::format_results;
///
/// let lamp = EntityRecord::new("light.desk", "on")
///     .with_attribute("friendly_name", "Desk Lamp")
///     .with_attribute("brightness", 128);
/// let candidate = Candidate {
///     entity_id: "light.desk".into(),
///     similarity_score: 1.0,
///     explanation: "Keyword match: 'desk'".into(),
///     metadata: Attributes::new(),
///     source: MatchSource::Keyword,
/// };
/// let records = HashMap::from([(lamp.entity_id.clone(), lamp)]);
///
/// let set = format_results(vec![candidate], &records, "desk", SearchMode::Keyword, None);
/// assert_eq!(set.count, 1);
/// assert_eq!(set.results[0].brightness, Some(128.into()));
/// assert_eq!(set.domains["light"], 1);
/// ```
pub fn format_results(
    candidates: Vec<Candidate>,
    records: &HashMap<String, EntityRecord>,
    query: &str,
    mode: SearchMode,
    domain_filter: Option<&str>,
) -> ResultSet {
    let results: Vec<EntityMatch> = candidates
        .into_iter()
        .filter(|candidate| domain_filter.map_or(true, |d| candidate.domain() == d))
        .map(|candidate| {
            let record = records.get(&candidate.entity_id);
            to_match(candidate, record)
        })
        .collect();

    let mut domains = BTreeMap::new();
    for result in &results {
        *domains.entry(result.domain.clone()).or_insert(0) += 1;
    }

    ResultSet {
        query: query.to_string(),
        count: results.len(),
        results,
        search_mode: mode.as_str().to_string(),
        domains,
        error: None,
    }
}

fn to_match(candidate: Candidate, record: Option<&EntityRecord>) -> EntityMatch {
    let domain = candidate.domain().to_string();
    let (state, friendly_name) = match record {
        Some(record) => (record.state.clone(), record.friendly_name().to_string()),
        None => (
            UNKNOWN_STATE.to_string(),
            candidate
                .metadata
                .get("friendly_name")
                .and_then(Value::as_str)
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(candidate.entity_id.as_str())
                .to_string(),
        ),
    };

    let mut entity = EntityMatch {
        entity_id: candidate.entity_id,
        state,
        domain,
        friendly_name,
        similarity: candidate.similarity_score,
        match_reason: candidate.explanation,
        metadata: (!candidate.metadata.is_empty()).then_some(candidate.metadata),
        brightness: None,
        unit: None,
        temperature: None,
        media_title: None,
    };

    if let Some(record) = record {
        add_domain_extras(&mut entity, record);
    }
    entity
}

fn add_domain_extras(entity: &mut EntityMatch, record: &EntityRecord) {
    let attr = |key: &str| record.attributes.get(key).filter(|v| !v.is_null()).cloned();

    match entity.domain.as_str() {
        "light" => entity.brightness = attr("brightness"),
        "sensor" => entity.unit = attr("unit_of_measurement"),
        "climate" => {
            entity.temperature = attr("temperature").or_else(|| attr("current_temperature"));
        }
        "media_player" => entity.media_title = attr("media_title"),
        _ => {}
    }
}
