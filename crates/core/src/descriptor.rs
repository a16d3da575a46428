//! Product descriptor used for lot matching and ledger item descriptions.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// What a unit is: console model, bundled software and color.
///
/// Two descriptors match when every field is equal after trimming and
/// case-folding; absent and blank optional fields are treated the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductDescriptor {
    pub console: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ProductDescriptor {
    pub fn new(console: impl Into<String>) -> DomainResult<Self> {
        let console = console.into();
        if console.trim().is_empty() {
            return Err(DomainError::validation("console cannot be empty"));
        }
        Ok(Self {
            console,
            software: None,
            color: None,
        })
    }

    pub fn with_software(mut self, software: impl Into<String>) -> Self {
        self.software = Some(software.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Lot-matching equality.
    pub fn matches(&self, other: &ProductDescriptor) -> bool {
        normalize(&self.console) == normalize(&other.console)
            && normalize_opt(self.software.as_deref()) == normalize_opt(other.software.as_deref())
            && normalize_opt(self.color.as_deref()) == normalize_opt(other.color.as_deref())
    }

    /// Human-readable item description ("console / software").
    pub fn description(&self) -> String {
        match self.software.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(software) => format!("{} / {}", self.console.trim(), software),
            None => self.console.trim().to_string(),
        }
    }

    /// Case-insensitive substring match over every descriptor field.
    pub fn contains_text(&self, needle: &str) -> bool {
        let needle = normalize(needle);
        if needle.is_empty() {
            return true;
        }
        [Some(self.console.as_str()), self.software.as_deref(), self.color.as_deref()]
            .into_iter()
            .flatten()
            .any(|field| normalize(field).contains(&needle))
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn normalize_opt(s: Option<&str>) -> String {
    s.map(normalize).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn switch() -> ProductDescriptor {
        ProductDescriptor::new("Switch OLED").unwrap().with_color("White")
    }

    #[test]
    fn matching_ignores_case_and_spacing() {
        let other = ProductDescriptor::new("  switch   oled ").unwrap().with_color("WHITE");
        assert!(switch().matches(&other));
    }

    #[test]
    fn blank_optional_fields_match_absent_ones() {
        let a = switch();
        let b = switch().with_software("   ");
        assert!(a.matches(&b));
    }

    #[test]
    fn different_color_does_not_match() {
        let other = ProductDescriptor::new("Switch OLED").unwrap().with_color("Neon");
        assert!(!switch().matches(&other));
    }

    #[test]
    fn empty_console_is_rejected() {
        assert!(ProductDescriptor::new("  ").is_err());
    }

    #[test]
    fn text_search_covers_all_fields() {
        let d = switch().with_software("Mario Kart 8");
        assert!(d.contains_text("mario"));
        assert!(d.contains_text("white"));
        assert!(!d.contains_text("zelda"));
        assert_eq!(d.description(), "Switch OLED / Mario Kart 8");
    }
}
