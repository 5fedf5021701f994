//! `WorldDefinitionV1`: the JSON description of a simulated world.
//!
//! ```json
//! {
//!   "start_room": "R0",
//!   "rooms":    [{"id": "R0", "x": 0, "y": 0}, {"id": "R1", "x": 4, "y": 0}],
//!   "gates":    [{"id": "d1", "between": ["R0", "R1"], "open": false}],
//!   "triggers": [{"id": "b1", "room": "R0", "gates": ["d1"], "hazard": false}]
//! }
//! ```
//!
//! A gate joins exactly two distinct rooms and is visible from both. A
//! trigger sits in one room and toggles every gate it is wired to. Hazard
//! triggers kill the agent when toggled. Coordinates are integers so the
//! description canonicalizes and hashes like every other artifact.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use linkscout_kernel::model::ids::{GateId, TriggerId};
use linkscout_kernel::model::link::Link;
use linkscout_kernel::proof::canon::canonical_json_bytes;
use linkscout_kernel::proof::hash::{canonical_hash, ContentHash, DOMAIN_WORLD};

use crate::error::HarnessError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomDefV1 {
    pub id: String,
    pub x: i16,
    pub y: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateDefV1 {
    pub id: String,
    pub between: [String; 2],
    #[serde(default)]
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerDefV1 {
    pub id: String,
    pub room: String,
    #[serde(default)]
    pub gates: Vec<String>,
    #[serde(default)]
    pub hazard: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldDefinitionV1 {
    pub start_room: String,
    pub rooms: Vec<RoomDefV1>,
    #[serde(default)]
    pub gates: Vec<GateDefV1>,
    #[serde(default)]
    pub triggers: Vec<TriggerDefV1>,
}

impl WorldDefinitionV1 {
    /// Parse and validate a JSON world description.
    ///
    /// # Errors
    ///
    /// [`HarnessError::WorldParse`] for malformed JSON or unknown fields,
    /// [`HarnessError::InvalidWorld`] for dangling or duplicate references.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, HarnessError> {
        let def: Self = serde_json::from_slice(bytes).map_err(|e| HarnessError::WorldParse {
            detail: e.to_string(),
        })?;
        def.validate()?;
        Ok(def)
    }

    /// # Errors
    ///
    /// [`HarnessError::Io`] if the file cannot be read, otherwise as
    /// [`from_json_bytes`](Self::from_json_bytes).
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let bytes = std::fs::read(path)
            .map_err(|e| HarnessError::io(&format!("reading world {}", path.display()), &e))?;
        Self::from_json_bytes(&bytes)
    }

    /// Structural checks: unique identifiers, existing rooms, gates joining
    /// two distinct rooms, triggers wired to existing gates at most once.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidWorld`] naming the first violation.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.rooms.is_empty() {
            return Err(invalid("world has no rooms"));
        }
        let mut rooms = BTreeSet::new();
        for room in &self.rooms {
            check_id("room", &room.id)?;
            if !rooms.insert(room.id.as_str()) {
                return Err(invalid(format!("duplicate room {}", room.id)));
            }
        }
        if !rooms.contains(self.start_room.as_str()) {
            return Err(invalid(format!("start room {} does not exist", self.start_room)));
        }

        let mut gates = BTreeSet::new();
        for gate in &self.gates {
            check_id("gate", &gate.id)?;
            if !gates.insert(gate.id.as_str()) {
                return Err(invalid(format!("duplicate gate {}", gate.id)));
            }
            let [a, b] = &gate.between;
            for room in [a, b] {
                if !rooms.contains(room.as_str()) {
                    return Err(invalid(format!("gate {} joins unknown room {room}", gate.id)));
                }
            }
            if a == b {
                return Err(invalid(format!("gate {} joins room {a} to itself", gate.id)));
            }
        }

        let mut triggers = BTreeSet::new();
        for trigger in &self.triggers {
            check_id("trigger", &trigger.id)?;
            if !triggers.insert(trigger.id.as_str()) {
                return Err(invalid(format!("duplicate trigger {}", trigger.id)));
            }
            if !rooms.contains(trigger.room.as_str()) {
                return Err(invalid(format!(
                    "trigger {} placed in unknown room {}",
                    trigger.id, trigger.room
                )));
            }
            let mut wired = BTreeSet::new();
            for gate in &trigger.gates {
                if !gates.contains(gate.as_str()) {
                    return Err(invalid(format!("trigger {} wired to unknown gate {gate}", trigger.id)));
                }
                if !wired.insert(gate.as_str()) {
                    return Err(invalid(format!("trigger {} wired to gate {gate} twice", trigger.id)));
                }
            }
        }
        Ok(())
    }

    /// Every (trigger, gate) wire in the world.
    #[must_use]
    pub fn wiring(&self) -> BTreeSet<Link> {
        self.triggers
            .iter()
            .flat_map(|t| t.gates.iter().map(move |g| Link::new(t.id.as_str(), g.as_str())))
            .collect()
    }

    #[must_use]
    pub fn trigger_ids(&self) -> BTreeSet<TriggerId> {
        self.triggers.iter().map(|t| TriggerId::new(t.id.as_str())).collect()
    }

    #[must_use]
    pub fn gate_ids(&self) -> BTreeSet<GateId> {
        self.gates.iter().map(|g| GateId::new(g.id.as_str())).collect()
    }

    /// Content hash of the canonical JSON form.
    ///
    /// # Errors
    ///
    /// [`HarnessError::WorldParse`] if serialization fails, which the schema
    /// never causes.
    pub fn digest(&self) -> Result<ContentHash, HarnessError> {
        let value = serde_json::to_value(self).map_err(|e| HarnessError::WorldParse {
            detail: e.to_string(),
        })?;
        let bytes = canonical_json_bytes(&value)?;
        Ok(canonical_hash(DOMAIN_WORLD, &bytes))
    }
}

fn invalid(detail: impl Into<String>) -> HarnessError {
    HarnessError::InvalidWorld {
        detail: detail.into(),
    }
}

fn check_id(kind: &str, id: &str) -> Result<(), HarnessError> {
    if id.trim().is_empty() || id.contains(',') || id.contains('#') {
        return Err(invalid(format!("{kind} id {id:?} is empty or contains ',' or '#'")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Index over a validated definition, for the simulator's per-tick lookups.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    pub start_room: String,
    pub positions: BTreeMap<String, (i16, i16)>,
    /// Room -> gates incident to it, with the room on the other side.
    pub adjacency: BTreeMap<String, Vec<(GateId, String)>>,
    pub gate_rooms: BTreeMap<GateId, (String, String)>,
    pub initially_open: BTreeSet<GateId>,
    pub trigger_room: BTreeMap<TriggerId, String>,
    pub wiring: BTreeMap<TriggerId, Vec<GateId>>,
    pub hazards: BTreeSet<TriggerId>,
}

impl Layout {
    pub(crate) fn new(def: &WorldDefinitionV1) -> Self {
        let positions = def.rooms.iter().map(|r| (r.id.clone(), (r.x, r.y))).collect();
        let mut adjacency: BTreeMap<String, Vec<(GateId, String)>> =
            def.rooms.iter().map(|r| (r.id.clone(), Vec::new())).collect();
        let mut gate_rooms = BTreeMap::new();
        let mut initially_open = BTreeSet::new();
        for gate in &def.gates {
            let id = GateId::new(gate.id.as_str());
            let [a, b] = &gate.between;
            adjacency.entry(a.clone()).or_default().push((id.clone(), b.clone()));
            adjacency.entry(b.clone()).or_default().push((id.clone(), a.clone()));
            gate_rooms.insert(id.clone(), (a.clone(), b.clone()));
            if gate.open {
                initially_open.insert(id);
            }
        }
        for edges in adjacency.values_mut() {
            edges.sort();
        }

        let mut trigger_room = BTreeMap::new();
        let mut wiring = BTreeMap::new();
        let mut hazards = BTreeSet::new();
        for trigger in &def.triggers {
            let id = TriggerId::new(trigger.id.as_str());
            trigger_room.insert(id.clone(), trigger.room.clone());
            wiring.insert(
                id.clone(),
                trigger.gates.iter().map(|g| GateId::new(g.as_str())).collect(),
            );
            if trigger.hazard {
                hazards.insert(id);
            }
        }

        Self {
            start_room: def.start_room.clone(),
            positions,
            adjacency,
            gate_rooms,
            initially_open,
            trigger_room,
            wiring,
            hazards,
        }
    }

    /// Triggers placed in `room`, in identifier order.
    pub(crate) fn triggers_in(&self, room: &str) -> Vec<TriggerId> {
        self.trigger_room
            .iter()
            .filter(|(_, r)| r.as_str() == room)
            .map(|(t, _)| t.clone())
            .collect()
    }

    /// Gates incident to `room`, in identifier order.
    pub(crate) fn gates_of(&self, room: &str) -> Vec<GateId> {
        self.adjacency
            .get(room)
            .map(|edges| edges.iter().map(|(g, _)| g.clone()).collect())
            .unwrap_or_default()
    }
}
