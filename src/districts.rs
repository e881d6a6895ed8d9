/// District pattern registry for synthetic groundwater data.
///
/// Each monitored district has a typical water level (metres relative to
/// ground level, negative = below), the spread observed around it, and the
/// number of monitoring stations the fallback generator should emit. This is
/// the single source of truth for those numbers; the fallback generator and
/// anything reporting supported districts read from here.

// ---------------------------------------------------------------------------
// Pattern metadata
// ---------------------------------------------------------------------------

/// Water level pattern for a district.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistrictPattern {
    /// District name as used by WRIS (`districtName`).
    pub name: &'static str,
    /// Typical water level, in metres.
    pub base_level: f64,
    /// Full width of the band around `base_level`; generated values fall in
    /// `base_level ± range / 2`.
    pub range: f64,
    /// Number of synthetic stations generated for the district.
    pub stations: usize,
}

impl DistrictPattern {
    /// Lowest value the fallback generator may produce.
    pub fn min_level(&self) -> f64 {
        self.base_level - self.range / 2.0
    }

    /// Highest value the fallback generator may produce.
    pub fn max_level(&self) -> f64 {
        self.base_level + self.range / 2.0
    }
}

/// Pattern applied to districts missing from the registry.
pub static DEFAULT_PATTERN: DistrictPattern = DistrictPattern {
    name: "default",
    base_level: -7.0,
    range: 3.0,
    stations: 5,
};

/// Coastal Odisha districts with known CGWB monitoring patterns.
pub static DISTRICT_REGISTRY: &[DistrictPattern] = &[
    DistrictPattern {
        name: "Baleshwar",
        base_level: -6.0,
        range: 3.0,
        stations: 8,
    },
    DistrictPattern {
        name: "Cuttack",
        base_level: -7.5,
        range: 4.0,
        stations: 12,
    },
    DistrictPattern {
        name: "Khordha",
        base_level: -5.0,
        range: 2.5,
        stations: 10,
    },
    DistrictPattern {
        name: "Puri",
        base_level: -6.8,
        range: 3.5,
        stations: 6,
    },
    DistrictPattern {
        name: "Ganjam",
        base_level: -8.2,
        range: 4.5,
        stations: 9,
    },
];

/// Looks up a district by exact name. Returns `None` if not registered.
pub fn find_district(name: &str) -> Option<&'static DistrictPattern> {
    DISTRICT_REGISTRY.iter().find(|d| d.name == name)
}

/// Pattern for `name`, or [`DEFAULT_PATTERN`] for unknown districts.
pub fn pattern_for(name: &str) -> &'static DistrictPattern {
    find_district(name).unwrap_or(&DEFAULT_PATTERN)
}

/// Names of every district with a dedicated pattern.
pub fn supported_districts() -> Vec<&'static str> {
    DISTRICT_REGISTRY.iter().map(|d| d.name).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
