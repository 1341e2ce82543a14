//! Matching entity metadata against a bridge filter

use hamb_core::{BridgeFilter, EntityMetadata, FilterKind, FilterPattern};
use regex::Regex;
use tracing::warn;

/// A filter pattern ready for matching
#[derive(Debug, Clone)]
enum Matcher {
    Glob(Regex),
    Exact(FilterKind, String),
    /// A glob that failed to compile; matches nothing
    Never,
}

impl Matcher {
    fn compile(pattern: &FilterPattern) -> Self {
        if pattern.kind != FilterKind::Pattern {
            return Matcher::Exact(pattern.kind, pattern.value.clone());
        }
        match glob_to_regex(&pattern.value) {
            Ok(re) => Matcher::Glob(re),
            Err(e) => {
                warn!("Ignoring invalid entity pattern {}: {}", pattern.value, e);
                Matcher::Never
            }
        }
    }

    fn matches(&self, entity: &EntityMetadata) -> bool {
        match self {
            Matcher::Glob(re) => re.is_match(&entity.entity_id),
            Matcher::Never => false,
            Matcher::Exact(kind, value) => {
                let value = value.as_str();
                match kind {
                    FilterKind::Pattern => false,
                    FilterKind::Domain => entity.domain() == value,
                    FilterKind::EntityId => entity.entity_id == value,
                    FilterKind::Platform => entity.platform.as_deref() == Some(value),
                    FilterKind::EntityCategory => {
                        entity.entity_category.as_deref() == Some(value)
                    }
                    FilterKind::Area => entity.area_id.as_deref() == Some(value),
                    FilterKind::DeviceId => entity.device_id.as_deref() == Some(value),
                    FilterKind::Label => entity.labels.iter().any(|l| l == value),
                }
            }
        }
    }
}

/// `*` matches any run of characters; everything else is literal
fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let body = glob
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$"))
}

/// Compiled [`BridgeFilter`]
///
/// An entity is selected when it matches at least one include pattern and
/// no exclude pattern. Hidden and disabled entities are never selected, and
/// an empty include list selects nothing.
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    include: Vec<Matcher>,
    exclude: Vec<Matcher>,
}

impl EntityFilter {
    pub fn new(filter: &BridgeFilter) -> Self {
        Self {
            include: filter.include.iter().map(Matcher::compile).collect(),
            exclude: filter.exclude.iter().map(Matcher::compile).collect(),
        }
    }

    pub fn matches(&self, entity: &EntityMetadata) -> bool {
        if entity.hidden || entity.disabled {
            return false;
        }
        self.include.iter().any(|m| m.matches(entity))
            && !self.exclude.iter().any(|m| m.matches(entity))
    }
}

impl From<&BridgeFilter> for EntityFilter {
    fn from(filter: &BridgeFilter) -> Self {
        Self::new(filter)
    }
}
