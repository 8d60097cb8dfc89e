//! Constants Module - Single Source of Truth
//!
//! Scoring weights, window sizes, tier thresholds and the canonical district
//! table live here. Other modules read these values instead of carrying their
//! own literals.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "NetRisk";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for outbound HTTP requests
pub const USER_AGENT: &str = concat!("NetRisk/", env!("CARGO_PKG_VERSION"));

/// Scoring algorithm name reported in the methodology descriptor
pub const ALGORITHM_NAME: &str = "Multi-Factor Network Risk Assessment (MFNRA)";

/// Scoring algorithm version
pub const ALGORITHM_VERSION: &str = "2.1";

// ============================================
// TIME WINDOWS (days)
// ============================================

/// Recent activity window
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// Prior comparison window ends this many days before now
pub const PRIOR_WINDOW_END_DAYS: i64 = 60;

/// Window for counting newly established relationships
pub const NEW_RELATIONSHIP_WINDOW_DAYS: i64 = 90;

/// Months covered by the monthly case series
pub const MONTHLY_SERIES_MONTHS: u32 = 12;

/// Trailing moving-average width (months)
pub const MOVING_AVERAGE_MONTHS: usize = 3;

// ============================================
// ENTITY SCORING
// ============================================

pub const BASE_SCORE: u32 = 35;
pub const MAX_SCORE: u32 = 100;
pub const RAPID_EXPANSION_POINTS: u32 = 30;
pub const HIGH_INFLUENCE_POINTS: u32 = 25;
pub const NETWORK_SIZE_POINTS: u32 = 20;
pub const ACTIVITY_POINTS: u32 = 17;
pub const COORDINATION_BONUS: u32 = 2;

/// Degree at which an entity counts as a large network (and hub candidate)
pub const HUB_MIN_DEGREE: usize = 8;

/// Average incident strength required for a hub
pub const HUB_MIN_AVG_STRENGTH: f64 = 4.0;

/// Degree band for rapid network expansion
pub const RAPID_MIN_DEGREE: usize = 4;
pub const RAPID_MAX_DEGREE: usize = 7;

/// Degree band for the nocturnal (sporadic low-degree) pattern
pub const NOCTURNAL_MIN_DEGREE: usize = 1;
pub const NOCTURNAL_MAX_DEGREE: usize = 3;

/// Default recent-activity count that earns activity points
pub const DEFAULT_ACTIVITY_THRESHOLD: usize = 3;

/// Default count of 90-day relationships that marks rapid expansion
pub const DEFAULT_RAPID_EXPANSION_THRESHOLD: usize = 3;

/// Entity tier lower bounds
pub const TIER_CRITICAL: u32 = 85;
pub const TIER_HIGH: u32 = 70;
pub const TIER_MEDIUM: u32 = 50;
pub const TIER_LOW: u32 = 35;

/// Default score cut-off for "critical entity" queries
pub const DEFAULT_CRITICAL_MIN_SCORE: u32 = 85;

// ============================================
// DISTRICT SCORING
// ============================================

pub const WEIGHT_CASE_ACTIVITY: f64 = 8.0;
pub const WEIGHT_RECENT_ACTIVITY: f64 = 25.0;
pub const WEIGHT_SUPPLIER_PRESENCE: f64 = 12.0;
pub const WEIGHT_TRANSPORT_NETWORK: f64 = 10.0;
pub const WEIGHT_NETWORK_DENSITY: f64 = 3.0;

pub const DISTRICT_HIGH: u32 = 70;
pub const DISTRICT_MEDIUM: u32 = 40;

/// State accepted regardless of district spelling
pub const ACCEPTED_STATE: &str = "karnataka";

/// Fallback map position (geographic centre of Karnataka)
pub const DEFAULT_LATITUDE: f64 = 15.3173;
pub const DEFAULT_LONGITUDE: f64 = 75.7139;

// ============================================
// HOTSPOTS
// ============================================

pub const HOTSPOT_RECENT_CASE_WEIGHT: f64 = 2.0;
pub const HOTSPOT_ENTITY_WEIGHT: f64 = 0.5;
pub const DEFAULT_HOTSPOT_LIMIT: usize = 15;

pub const ALERT_CRITICAL: u32 = 85;
pub const ALERT_HIGH: u32 = 66;
pub const ALERT_MEDIUM: u32 = 33;

pub const RECOMMEND_CRITICAL: &str = "Immediate task force deployment and targeted surveillance.";
pub const RECOMMEND_HIGH: &str = "Increase patrols and initiate targeted investigations.";
pub const RECOMMEND_MEDIUM: &str = "Monitor trends and allocate resources as needed.";
pub const RECOMMEND_LOW: &str = "Maintain routine monitoring.";

// ============================================
// VULNERABILITY ANALYSIS
// ============================================

pub const CRITICAL_NODE_LIMIT: usize = 50;
pub const CRITICALITY_PER_EDGE: u32 = 10;
pub const HIGH_CRITICALITY: u32 = 70;
pub const STRONG_TIE: u8 = 4;
pub const MEDIUM_TIE: u8 = 2;

// ============================================
// IO / TIMEOUTS
// ============================================

pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_AUTHORITATIVE_TIMEOUT_MS: u64 = 8_000;

// ============================================
// CANONICAL DISTRICTS
// ============================================

/// One canonical district: display name, map position, accepted spellings.
/// The canonical key is the normalized display name.
#[derive(Debug, Clone, Copy)]
pub struct CanonicalDistrict {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub aliases: &'static [&'static str],
}

const fn district(
    name: &'static str,
    latitude: f64,
    longitude: f64,
    aliases: &'static [&'static str],
) -> CanonicalDistrict {
    CanonicalDistrict {
        name,
        latitude,
        longitude,
        aliases,
    }
}

/// Karnataka districts with known spelling variants
pub const KARNATAKA_DISTRICTS: &[CanonicalDistrict] = &[
    district("Bangalore Urban", 12.9716, 77.5946, &["bengaluru urban"]),
    district("Bangalore Rural", 13.2846, 77.3821, &["bengaluru rural"]),
    district("Mysore", 12.2958, 76.6394, &["mysuru"]),
    district("Davanagere", 14.4644, 75.9176, &[]),
    district("Hubli-Dharwad", 15.3647, 75.124, &["hubballi dharwad"]),
    district("Mangalore", 12.9141, 74.856, &["mangaluru"]),
    district("Belagavi", 15.8497, 74.4977, &["belgaum"]),
    district("Tumakuru", 13.3379, 77.1025, &["tumkur"]),
    district("Udupi", 13.3409, 74.7421, &[]),
    district("Shimoga", 13.9299, 75.5681, &["shivamogga"]),
    district("Chitradurga", 14.2251, 76.396, &[]),
    district("Hassan", 13.0033, 76.0969, &[]),
    district("Mandya", 12.5218, 76.8951, &[]),
    district("Kolar", 13.1378, 78.1294, &[]),
    district("Chikkaballapur", 13.4355, 77.7315, &["chikballapur"]),
    district("Ramanagara", 12.7172, 77.2824, &[]),
    district("Bidar", 17.9103, 77.5207, &[]),
    district("Gulbarga", 17.3297, 76.8343, &["kalaburagi"]),
    district("Raichur", 16.212, 77.3439, &[]),
    district("Koppal", 15.35, 76.1547, &[]),
    district("Gadag", 15.4167, 75.6333, &[]),
    district("Haveri", 14.7951, 75.4065, &[]),
    district("Dharwad", 15.4589, 75.0078, &[]),
    district("Uttara Kannada", 14.7937, 74.6857, &["karwar"]),
    district("Bagalkote", 16.1651, 75.6946, &["bagalkot"]),
    district("Vijayapur", 16.8302, 75.71, &["vijayapura"]),
    district("Ballari", 15.1394, 76.9214, &["bellary"]),
    district("Chikkamagaluru", 13.3161, 75.772, &["chikmagalur"]),
    district("Dakshina Kannada", 12.8438, 75.2479, &["south kanara"]),
    district("Kodagu", 12.4244, 75.7382, &["coorg"]),
    district("Chamarajanagar", 11.9258, 76.9437, &[]),
    district("Yadgir", 16.7524, 77.1427, &[]),
];
