/// Synthetic groundwater records for when WRIS has nothing to give.
///
/// Records have the same shape as real WRIS records. Their structure is
/// fixed by the district pattern (station count, codes, names) while values
/// are drawn at random inside the pattern's band. Every record carries the
/// `fallback_simulation` provenance tag.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::districts::{self, DistrictPattern};
use crate::model::{Provenance, Record};

const STATION_TYPES: &[&str] = &["Observation Well", "Production Well", "Test Well", "Monitoring Well"];
const WELL_TYPES: &[&str] = &["Dug Well", "Bore Well", "Tube Well", "Piezometer"];
const AQUIFER_TYPES: &[&str] = &["Alluvial", "Hard Rock", "Coastal", "Laterite"];

/// Generate a fallback record set using the thread-local RNG.
pub fn generate(state: &str, district: &str, start_date: &str, end_date: &str) -> Vec<Record> {
    generate_with(&mut rand::thread_rng(), state, district, start_date, end_date)
}

/// Generate a fallback record set from the given RNG.
///
/// `end_date` does not influence the output; every record is stamped with
/// `start_date`.
pub fn generate_with<R: Rng + ?Sized>(
    rng: &mut R,
    state: &str,
    district: &str,
    start_date: &str,
    _end_date: &str,
) -> Vec<Record> {
    let pattern = districts::pattern_for(district);
    let prefix = station_prefix(district);

    (1..=pattern.stations)
        .map(|i| synthetic_record(rng, pattern, &prefix, i, state, district, start_date))
        .collect()
}

fn synthetic_record<R: Rng + ?Sized>(
    rng: &mut R,
    pattern: &DistrictPattern,
    prefix: &str,
    index: usize,
    state: &str,
    district: &str,
    start_date: &str,
) -> Record {
    let half = pattern.range / 2.0;
    // Rounding can nudge a value at the edge of the band just past it
    let water_level = round_to(pattern.base_level + rng.gen_range(-half..=half), 2)
        .clamp(pattern.min_level(), pattern.max_level());
    let well_depth = rng.gen_range(40..=120);

    Record {
        station_code: Some(format!("GW{}{:03}", prefix, index)),
        station_name: Some(format!("{} Monitoring Station {}", district, index)),
        station_type: Some(pick(rng, STATION_TYPES)),
        latitude: Some(round_to(20.0 + rng.gen_range(0.1..=5.0), 6)),
        longitude: Some(round_to(85.0 + rng.gen_range(0.1..=2.0), 6)),
        agency_name: Some("CGWB".to_string()),
        state: Some(state.to_string()),
        district: Some(district.to_string()),
        data_value: Some(water_level),
        data_time: Some(start_date.to_string()),
        well_type: Some(pick(rng, WELL_TYPES)),
        well_depth: Some(f64::from(well_depth)),
        well_aquifer_type: Some(pick(rng, AQUIFER_TYPES)),
        description: Some(format!("Groundwater monitoring station in {} district", district)),
        unit: Some("m".to_string()),
        data_source: Some(Provenance::FallbackSimulation.to_string()),
        ..Default::default()
    }
}

/// First three characters of the district name, uppercased.
fn station_prefix(district: &str) -> String {
    district.chars().take(3).collect::<String>().to_uppercase()
}

fn pick<R: Rng + ?Sized>(rng: &mut R, options: &[&str]) -> String {
    options.choose(rng).copied().unwrap_or_default().to_string()
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
