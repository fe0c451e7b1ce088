//! Task-descriptor validation.
//!
//! A task descriptor is an XIDML file at the root of the mounted media.
//! Validation walks its declared instruments, counts each part-reference
//! identifier, and checks the counts against the required profile. It is
//! fully synchronous and has no side effects beyond reading the file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::debug;

use crate::error::{ConfigError, ValidationError};

// ============================================================================
// Instrument Profile
// ============================================================================

/// Required mapping of instrument identifier to exact occurrence count.
///
/// Supplied at startup and immutable for the daemon's lifetime. The check
/// is a required-subset check: identifiers in a descriptor that the
/// profile does not list are ignored.
#[derive(Debug, Clone)]
pub struct InstrumentProfile {
    required: HashMap<String, u32>,
}

impl InstrumentProfile {
    /// Build a profile, rejecting empty profiles and zero counts.
    pub fn new(required: HashMap<String, u32>) -> Result<Self, ConfigError> {
        if required.is_empty() {
            return Err(ConfigError::EmptyProfile);
        }
        if let Some((part, _)) = required.iter().find(|&(_, &count)| count == 0) {
            return Err(ConfigError::ZeroCount { part: part.clone() });
        }
        Ok(Self { required })
    }

    /// Iterate over (identifier, required count) pairs.
    pub fn required(&self) -> impl Iterator<Item = (&str, u32)> {
        self.required.iter().map(|(part, &count)| (part.as_str(), count))
    }

    pub fn len(&self) -> usize {
        self.required.len()
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }
}

// ============================================================================
// Task Descriptor
// ============================================================================

/// A validated descriptor file, alive for one mount cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    /// Path of the descriptor file on the mounted media.
    pub file_path: PathBuf,
    /// Observed part-reference identifier to occurrence count.
    pub discovered_instruments: HashMap<String, u32>,
}

/// Validate the descriptor at `path` against `profile`.
///
/// Steps, in order: the file must exist; it must parse as XML; its
/// declared instruments are counted by part reference; every profile
/// entry must be present with the exact count.
pub fn validate(
    path: &Path,
    profile: &InstrumentProfile,
) -> Result<TaskDescriptor, ValidationError> {
    if !path.exists() {
        return Err(ValidationError::MissingDescriptor {
            path: path.to_path_buf(),
        });
    }

    let text = std::fs::read_to_string(path).map_err(|e| ValidationError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let doc = Document::parse(&text).map_err(|e| ValidationError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let discovered = count_instruments(&doc);
    debug!(
        path = %path.display(),
        instruments = discovered.len(),
        "parsed task descriptor"
    );

    for (part, required) in profile.required() {
        match discovered.get(part) {
            None => {
                return Err(ValidationError::MissingInstrument {
                    part: part.to_string(),
                    path: path.to_path_buf(),
                });
            }
            Some(&observed) if observed != required => {
                return Err(ValidationError::InstrumentCountMismatch {
                    part: part.to_string(),
                    required,
                    observed,
                    path: path.to_path_buf(),
                });
            }
            Some(_) => {}
        }
    }

    Ok(TaskDescriptor {
        file_path: path.to_path_buf(),
        discovered_instruments: discovered,
    })
}

/// Count part references of the instruments declared under
/// `Instrumentation/InstrumentSet/Instrument`. Duplicate references
/// increment the count for that identifier.
fn count_instruments(doc: &Document) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for instrumentation in children_named(doc.root_element(), "Instrumentation") {
        for set in children_named(instrumentation, "InstrumentSet") {
            for instrument in children_named(set, "Instrument") {
                if let Some(part) = part_reference(instrument) {
                    *counts.entry(part.to_string()).or_insert(0) += 1;
                }
            }
        }
    }
    counts
}

/// Text of the instrument's `Manufacturer/PartReference` element.
fn part_reference<'a>(instrument: Node<'a, 'a>) -> Option<&'a str> {
    children_named(instrument, "Manufacturer")
        .flat_map(|m| children_named(m, "PartReference"))
        .find_map(|p| p.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn children_named<'a>(
    node: Node<'a, 'a>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'a>> {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}
