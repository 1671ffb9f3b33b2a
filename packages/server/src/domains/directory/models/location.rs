use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a page covers a single city or a whole state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    City,
    State,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::City => "city",
            LocationKind::State => "state",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A place a best-gyms page can be generated for.
///
/// Derived from the address table, never persisted. An empty `city` means
/// the page covers the whole state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub city: String,
}

impl Location {
    pub fn new(country: Option<String>, state: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            country: country.filter(|c| !c.trim().is_empty()),
            state: state.into().trim().to_string(),
            city: city.into().trim().to_string(),
        }
    }

    pub fn city(state: impl Into<String>, city: impl Into<String>) -> Self {
        Self::new(None, state, city)
    }

    pub fn state_wide(state: impl Into<String>) -> Self {
        Self::new(None, state, "")
    }

    pub fn with_country(mut self, country: Option<String>) -> Self {
        self.country = country.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn kind(&self) -> LocationKind {
        if self.city.is_empty() {
            LocationKind::State
        } else {
            LocationKind::City
        }
    }

    /// A location with neither city nor state cannot be filtered on.
    pub fn is_valid(&self) -> bool {
        !self.city.is_empty() || !self.state.is_empty()
    }

    /// Human-readable place name: the city for city pages, the state otherwise.
    pub fn name(&self) -> &str {
        if self.city.is_empty() {
            &self.state
        } else {
            &self.city
        }
    }

    /// Label sent to the ranking service and used to match its answers back.
    ///
    /// City labels carry the state so two same-named cities in one batch stay
    /// distinguishable.
    pub fn label(&self) -> String {
        match (self.city.is_empty(), self.state.is_empty()) {
            (false, false) => format!("{}, {}", self.city, self.state),
            (false, true) => self.city.clone(),
            (true, _) => self.state.clone(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_city() {
        assert_eq!(Location::city("Texas", "Austin").kind(), LocationKind::City);
        assert_eq!(Location::state_wide("Texas").kind(), LocationKind::State);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Location::city("Texas", "Austin").label(), "Austin, Texas");
        assert_eq!(Location::state_wide("Texas").label(), "Texas");
        assert_eq!(Location::city("", "Austin").label(), "Austin");
    }

    #[test]
    fn test_validity() {
        assert!(Location::state_wide("Texas").is_valid());
        assert!(!Location::new(None, "  ", "").is_valid());
    }

    #[test]
    fn test_blank_country_is_dropped() {
        let location = Location::new(Some(" ".to_string()), "Texas", "Austin");
        assert_eq!(location.country, None);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LocationKind::City).unwrap(), "\"city\"");
    }
}
