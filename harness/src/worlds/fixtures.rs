//! Built-in worlds, addressable by name from a run configuration.

use crate::worlds::definition::{GateDefV1, RoomDefV1, TriggerDefV1, WorldDefinitionV1};

/// Names accepted by [`by_name`].
pub const FIXTURE_NAMES: [&str; 5] = ["scenario", "chain", "hazard", "trapped", "star"];

/// A fixture by name. Parameterized fixtures use a small default size.
#[must_use]
pub fn by_name(name: &str) -> Option<WorldDefinitionV1> {
    match name {
        "scenario" => Some(scenario()),
        "chain" => Some(chain(3)),
        "hazard" => Some(hazard()),
        "trapped" => Some(trapped()),
        "star" => Some(star(4)),
        _ => None,
    }
}

fn room(id: &str, x: i16, y: i16) -> RoomDefV1 {
    RoomDefV1 {
        id: id.to_string(),
        x,
        y,
    }
}

fn gate(id: &str, a: &str, b: &str) -> GateDefV1 {
    GateDefV1 {
        id: id.to_string(),
        between: [a.to_string(), b.to_string()],
        open: false,
    }
}

fn trigger(id: &str, room: &str, gates: &[&str]) -> TriggerDefV1 {
    TriggerDefV1 {
        id: id.to_string(),
        room: room.to_string(),
        gates: gates.iter().map(|g| (*g).to_string()).collect(),
        hazard: false,
    }
}

/// Three triggers in the start room; `b1 -> d1`, `b2 -> d2`, `b3` is a dud.
#[must_use]
pub fn scenario() -> WorldDefinitionV1 {
    WorldDefinitionV1 {
        start_room: "R0".into(),
        rooms: vec![room("R0", 0, 0), room("R1", -4, 0), room("R2", 4, 0)],
        gates: vec![gate("d1", "R0", "R1"), gate("d2", "R0", "R2")],
        triggers: vec![
            trigger("b1", "R0", &["d1"]),
            trigger("b2", "R0", &["d2"]),
            trigger("b3", "R0", &[]),
        ],
    }
}

/// `n` gates in a row. Trigger `bi` sits in room `R(i-1)` and opens `di`,
/// the gate to the next room.
#[must_use]
pub fn chain(n: usize) -> WorldDefinitionV1 {
    let mut def = WorldDefinitionV1 {
        start_room: "R0".into(),
        rooms: Vec::new(),
        gates: Vec::new(),
        triggers: Vec::new(),
    };
    for i in 0..=n {
        let x = i16::try_from(i * 4).unwrap_or(i16::MAX);
        def.rooms.push(room(&format!("R{i}"), x, 0));
    }
    for i in 1..=n {
        let (here, next) = (format!("R{}", i - 1), format!("R{i}"));
        let gate_id = format!("d{i}");
        def.gates.push(gate(&gate_id, &here, &next));
        def.triggers.push(trigger(&format!("b{i}"), &here, &[gate_id.as_str()]));
    }
    def
}

/// `b1 -> d1` next to a hazard `b2` that kills the agent.
#[must_use]
pub fn hazard() -> WorldDefinitionV1 {
    let mut killer = trigger("b2", "R0", &[]);
    killer.hazard = true;
    WorldDefinitionV1 {
        start_room: "R0".into(),
        rooms: vec![room("R0", 0, 0), room("R1", 4, 0)],
        gates: vec![gate("d1", "R0", "R1")],
        triggers: vec![trigger("b1", "R0", &["d1"]), killer],
    }
}

/// `R0 -d1- R1 -d2- R2` with `d1` initially open. `b1` in `R1` toggles `d1`,
/// so pressing it shuts the agent in; `b2` back in `R0` opens `d2`.
#[must_use]
pub fn trapped() -> WorldDefinitionV1 {
    let mut entry = gate("d1", "R0", "R1");
    entry.open = true;
    WorldDefinitionV1 {
        start_room: "R0".into(),
        rooms: vec![room("R0", 0, 0), room("R1", 4, 0), room("R2", 8, 0)],
        gates: vec![entry, gate("d2", "R1", "R2")],
        triggers: vec![trigger("b1", "R1", &["d1"]), trigger("b2", "R0", &["d2"])],
    }
}

/// A hub with `n` spokes. Trigger `bi` in the hub opens spoke `d((i mod n) + 1)`,
/// so no trigger opens the gate sharing its number.
#[must_use]
pub fn star(n: usize) -> WorldDefinitionV1 {
    let mut def = WorldDefinitionV1 {
        start_room: "HUB".into(),
        rooms: vec![room("HUB", 0, 0)],
        gates: Vec::new(),
        triggers: Vec::new(),
    };
    for i in 1..=n {
        let y = i16::try_from(i * 4).unwrap_or(i16::MAX);
        let spoke = format!("S{i}");
        def.rooms.push(room(&spoke, 4, y));
        def.gates.push(gate(&format!("d{i}"), "HUB", &spoke));
        let target = format!("d{}", i % n + 1);
        def.triggers.push(trigger(&format!("b{i}"), "HUB", &[target.as_str()]));
    }
    def
}
