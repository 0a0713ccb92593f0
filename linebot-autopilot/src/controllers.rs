use linebot_core::control::{ControlParams, Controller, DampedController, WeightedController};
use linebot_core::trace::crc32;
use serde::Serialize;

struct RosterEntry {
    id: &'static str,
    tag: u8,
    description: &'static str,
    build: fn(ControlParams) -> Box<dyn Controller>,
}

const ROSTER: &[RosterEntry] = &[
    RosterEntry {
        id: "weighted",
        tag: 0,
        description: "weighted sensor sum, fixed corrections when the center sensor is off",
        build: |params| Box::new(WeightedController::new(params)),
    },
    RosterEntry {
        id: "damped",
        tag: 1,
        description: "PD steering on the weighted error, slows down on large errors",
        build: |params| Box::new(DampedController::new(params)),
    },
];

pub const DEFAULT_CONTROLLER: &str = "weighted";

#[derive(Clone, Debug, Serialize)]
pub struct ControllerManifestEntry {
    pub id: String,
    pub tag: u8,
    pub description: String,
    pub fingerprint: String,
    pub params: serde_json::Value,
}

pub fn controller_ids() -> Vec<&'static str> {
    ROSTER.iter().map(|entry| entry.id).collect()
}

pub fn describe_controllers() -> Vec<(&'static str, &'static str)> {
    ROSTER
        .iter()
        .map(|entry| (entry.id, entry.description))
        .collect()
}

pub fn create_controller(id: &str, params: ControlParams) -> Option<Box<dyn Controller>> {
    ROSTER
        .iter()
        .find(|entry| entry.id == id)
        .map(|entry| (entry.build)(params))
}

pub fn controller_tag(id: &str) -> Option<u8> {
    ROSTER.iter().find(|entry| entry.id == id).map(|entry| entry.tag)
}

pub fn controller_id_for_tag(tag: u8) -> Option<&'static str> {
    ROSTER.iter().find(|entry| entry.tag == tag).map(|entry| entry.id)
}

/// Stable hex digest of the controller id and its tuning.
pub fn controller_fingerprint(id: &str, params: &ControlParams) -> Option<String> {
    controller_tag(id)?;
    let params_json = serde_json::to_vec(params).ok()?;
    let mut bytes = Vec::with_capacity(id.len() + 1 + params_json.len());
    bytes.extend_from_slice(id.as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(&params_json);
    Some(format!("{:08x}", crc32(&bytes)))
}

pub fn controller_manifest_entries(params: &ControlParams) -> Vec<ControllerManifestEntry> {
    ROSTER
        .iter()
        .map(|entry| ControllerManifestEntry {
            id: entry.id.to_string(),
            tag: entry.tag,
            description: entry.description.to_string(),
            fingerprint: controller_fingerprint(entry.id, params)
                .unwrap_or_else(|| "unknown".to_string()),
            params: serde_json::to_value(params).unwrap_or(serde_json::Value::Null),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn roster_ids_and_tags_are_unique() {
        let ids: BTreeSet<_> = ROSTER.iter().map(|entry| entry.id).collect();
        let tags: BTreeSet<_> = ROSTER.iter().map(|entry| entry.tag).collect();
        assert_eq!(ids.len(), ROSTER.len());
        assert_eq!(tags.len(), ROSTER.len());
    }

    #[test]
    fn created_controllers_report_their_roster_id() {
        for id in controller_ids() {
            let controller =
                create_controller(id, ControlParams::default()).expect("roster id must build");
            assert_eq!(controller.id(), id);
            assert_eq!(
                controller_id_for_tag(controller_tag(id).expect("tag")),
                Some(id)
            );
        }
        assert!(create_controller("nope", ControlParams::default()).is_none());
    }

    #[test]
    fn fingerprint_depends_on_params() {
        let base = ControlParams::default();
        let mut faster = base;
        faster.base_speed = 3.0;
        let a = controller_fingerprint(DEFAULT_CONTROLLER, &base).expect("known id");
        let b = controller_fingerprint(DEFAULT_CONTROLLER, &faster).expect("known id");
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
        assert!(controller_fingerprint("nope", &base).is_none());
    }
}
