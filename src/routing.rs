//! Platform host to routing region mapping
//!
//! League and summoner endpoints live on platform hosts ("na1", "euw1"),
//! match endpoints on routing regions ("americas", "europe").

use std::collections::HashMap;

/// Built-in platform -> routing region pairs
const DEFAULT_ROUTES: &[(&str, &str)] = &[
    ("na1", "americas"),
    ("br1", "americas"),
    ("la1", "americas"),
    ("la2", "americas"),
    ("oc1", "americas"),
    ("euw1", "europe"),
    ("eun1", "europe"),
    ("tr1", "europe"),
    ("ru", "europe"),
    ("kr", "asia"),
    ("jp1", "asia"),
    ("ph2", "sea"),
    ("sg2", "sea"),
    ("th2", "sea"),
    ("tw2", "sea"),
    ("vn2", "sea"),
];

/// Lookup table from platform host to routing region
#[derive(Debug, Clone)]
pub struct RoutingTable {
    routes: HashMap<String, String>,
}

impl RoutingTable {
    /// Table holding the built-in mapping
    pub fn with_defaults() -> Self {
        let routes = DEFAULT_ROUTES
            .iter()
            .map(|(platform, region)| (platform.to_string(), region.to_string()))
            .collect();
        Self { routes }
    }

    /// Built-in mapping plus `[routing]` entries from the config
    ///
    /// Overrides win over built-in entries. Keys and values are lowercased.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut table = Self::with_defaults();
        for (platform, region) in overrides {
            table
                .routes
                .insert(platform.to_lowercase(), region.to_lowercase());
        }
        table
    }

    /// Routing region for a platform host, case-insensitive
    pub fn region_for(&self, platform: &str) -> Option<&str> {
        self.routes
            .get(&platform.to_lowercase())
            .map(String::as_str)
    }

    /// Distinct routing regions, sorted
    pub fn regions(&self) -> Vec<&str> {
        let mut regions: Vec<&str> = self.routes.values().map(String::as_str).collect();
        regions.sort_unstable();
        regions.dedup();
        regions
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}
