//! Ground-truth wiring files and comparison against discovered links.
//!
//! # File format
//!
//! ```text
//! # trigger,gate,gate,...
//! b1,d1
//! b2,d2,d3
//! b3
//! ```
//!
//! One trigger per line followed by the gates it toggles. `#` starts a
//! comment; blank lines are ignored; whitespace around fields is trimmed. A
//! trigger may appear on several lines, in which case its gates accumulate.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

use linkscout_kernel::model::ids::TriggerId;
use linkscout_kernel::model::link::Link;

use crate::error::HarnessError;
use crate::worlds::definition::WorldDefinitionV1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundTruthV1 {
    triggers: BTreeSet<TriggerId>,
    links: BTreeSet<Link>,
}

impl GroundTruthV1 {
    /// # Errors
    ///
    /// Returns [`HarnessError::GroundTruthParse`] (1-based line number) for an
    /// empty trigger or gate field.
    pub fn parse(text: &str) -> Result<Self, HarnessError> {
        let mut truth = Self::default();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split(',').map(str::trim);
            let trigger = fields.next().unwrap_or("");
            if trigger.is_empty() {
                return Err(HarnessError::GroundTruthParse {
                    line: index + 1,
                    detail: "missing trigger name".into(),
                });
            }
            truth.triggers.insert(TriggerId::from(trigger));
            for gate in fields {
                if gate.is_empty() {
                    return Err(HarnessError::GroundTruthParse {
                        line: index + 1,
                        detail: format!("empty gate name for trigger {trigger}"),
                    });
                }
                truth.links.insert(Link::new(trigger, gate));
            }
        }
        Ok(truth)
    }

    /// # Errors
    ///
    /// [`HarnessError::Io`] if the file cannot be read, otherwise as
    /// [`parse`](Self::parse).
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::io(&format!("reading ground truth {}", path.display()), &e))?;
        Self::parse(&text)
    }

    /// The wiring of a simulated world.
    #[must_use]
    pub fn from_world(def: &WorldDefinitionV1) -> Self {
        Self {
            triggers: def.trigger_ids(),
            links: def.wiring(),
        }
    }

    #[must_use]
    pub fn links(&self) -> &BTreeSet<Link> {
        &self.links
    }

    #[must_use]
    pub fn triggers(&self) -> &BTreeSet<TriggerId> {
        &self.triggers
    }

    /// Render in the file format, one line per trigger, sorted.
    #[must_use]
    pub fn to_wiring_text(&self) -> String {
        let mut out = String::new();
        for trigger in &self.triggers {
            out.push_str(trigger.as_str());
            for link in self.links.iter().filter(|l| l.trigger == *trigger) {
                let _ = write!(out, ",{}", link.gate);
            }
            out.push('\n');
        }
        out
    }

    #[must_use]
    pub fn compare(&self, discovered: &BTreeSet<Link>) -> GroundTruthComparisonV1 {
        GroundTruthComparisonV1 {
            true_links: self.links.len(),
            inferred_correctly: discovered.intersection(&self.links).count(),
            missing: self.links.difference(discovered).cloned().collect(),
            false_positives: discovered.difference(&self.links).cloned().collect(),
        }
    }
}

/// How a run's links line up with the real wiring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundTruthComparisonV1 {
    pub true_links: usize,
    pub inferred_correctly: usize,
    pub missing: Vec<Link>,
    pub false_positives: Vec<Link>,
}

impl GroundTruthComparisonV1 {
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.missing.is_empty() && self.false_positives.is_empty()
    }

    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        let pairs = |links: &[Link]| -> Vec<serde_json::Value> {
            links
                .iter()
                .map(|l| serde_json::json!({"gate": l.gate.as_str(), "trigger": l.trigger.as_str()}))
                .collect()
        };
        serde_json::json!({
            "false_positive_count": self.false_positives.len(),
            "false_positives": pairs(self.false_positives.as_slice()),
            "inferred_correctly": self.inferred_correctly,
            "missing": pairs(self.missing.as_slice()),
            "true_links": self.true_links,
        })
    }
}
