//! Textual entity descriptions fed to the embedder.
//!
//! The description covers what an entity *is* (name, kind, area, device
//! class) and never its state, so an entity is re-embedded only when its
//! identity changes.

use hearth_core::EntityRecord;
use sha2::{Digest, Sha256};

const DESCRIBED_ATTRIBUTES: &[(&str, &str)] = &[
    ("device_class", "device class"),
    ("unit_of_measurement", "unit"),
    ("icon", "icon"),
];

/// Render the text embedded for `record`.
///
/// # Examples
///
/// ```
/// use hearth_core::EntityRecord;
/// use hearth_index::describe::describe_entity;
///
/// let light = EntityRecord::new("light.living_room", "on")
///     .with_attribute("friendly_name", "Living Room Lights")
///     .with_attribute("area_id", "living_room");
/// let text = describe_entity(&light);
/// assert!(text.starts_with("Living Room Lights"));
/// assert!(text.contains("area: living room"));
/// ```
pub fn describe_entity(record: &EntityRecord) -> String {
    let domain = record.domain();
    let mut lines = vec![
        format!("{} ({})", record.friendly_name(), humanize(domain)),
        format!("{domain} {}", humanize(record.object_id())),
    ];

    if let Some(area) = record.area_id() {
        lines.push(format!("area: {}", humanize(area)));
    }

    for (key, label) in DESCRIBED_ATTRIBUTES {
        if let Some(value) = record.attribute_str(key) {
            let value = value.strip_prefix("mdi:").unwrap_or(value);
            lines.push(format!("{label}: {}", humanize(value)));
        }
    }

    lines.join("\n")
}

/// Hex SHA-256 of a description, used to skip unchanged entities.
///
/// # Examples
///
/// ```
/// use hearth_index::describe::description_hash;
///
/// assert_eq!(description_hash("a"), description_hash("a"));
/// assert_ne!(description_hash("a"), description_hash("b"));
/// assert_eq!(description_hash("").len(), 64);
/// ```
pub fn description_hash(description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(description.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn humanize(s: &str) -> String {
    s.replace(['_', '-'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_lists_identity_attributes() {
        let sensor = EntityRecord::new("sensor.kitchen_temperature", "21.4")
            .with_attribute("friendly_name", "Kitchen Temperature")
            .with_attribute("device_class", "temperature")
            .with_attribute("unit_of_measurement", "°C")
            .with_attribute("icon", "mdi:thermometer");

        assert_eq!(
            describe_entity(&sensor),
            "Kitchen Temperature (sensor)\n\
             sensor kitchen temperature\n\
             device class: temperature\n\
             unit: °C\n\
             icon: thermometer"
        );
    }

    #[test]
    fn state_changes_keep_the_same_hash() {
        let off = EntityRecord::new("media_player.den_tv", "off")
            .with_attribute("friendly_name", "Den TV");
        let playing = EntityRecord::new("media_player.den_tv", "playing")
            .with_attribute("friendly_name", "Den TV")
            .with_attribute("media_title", "The Expanse");

        assert_eq!(
            description_hash(&describe_entity(&off)),
            description_hash(&describe_entity(&playing))
        );
    }

    #[test]
    fn renamed_entity_changes_hash() {
        let before = EntityRecord::new("light.a", "on").with_attribute("friendly_name", "Lamp");
        let after = EntityRecord::new("light.a", "on").with_attribute("friendly_name", "Desk Lamp");
        assert_ne!(
            description_hash(&describe_entity(&before)),
            description_hash(&describe_entity(&after))
        );
    }

    #[test]
    fn unnamed_entity_uses_id() {
        let text = describe_entity(&EntityRecord::new("binary_sensor.hall_motion", "off"));
        assert!(text.starts_with("binary_sensor.hall_motion (binary sensor)"));
        assert!(text.contains("hall motion"));
    }
}
