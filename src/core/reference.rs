//! Read-only facade over the static reference tables backing the calculation:
//! design outdoor conditions, execution temperature differences, standard
//! solar gain, sash infiltration rates, heating orientation factors, sunlit
//! area tangents and region coordinates.
//!
//! Tables are loaded lazily on first use and cached for the process lifetime;
//! nothing is written after a table has loaded, so a repository is safe to
//! share between any number of concurrent readers. A table file that cannot
//! be read degrades to an empty table (with a warning) and every lookup
//! against a known table falls back to a documented default value rather than
//! failing. Only a request for a table name that does not exist at all is a
//! hard error.

use crate::errors::HeatLoadError;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::warn;

const EARTH_RADIUS_KM: f64 = 6371.0;
const SASH_WIND_SPEED_BUCKETS_MS: [f64; 5] = [2.0, 4.0, 6.0, 8.0, 10.0];

pub(crate) type HourValueMap = IndexMap<String, f64>;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OutdoorDesignRecord {
    pub city: String,
    pub cooling_drybulb_c: Option<f64>,
    pub cooling_rh_pct: Option<f64>,
    pub heating_drybulb_c: Option<f64>,
    pub temp_9_c: Option<f64>,
    pub temp_12_c: Option<f64>,
    pub temp_14_c: Option<f64>,
    pub temp_16_c: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct OutdoorDesignTable {
    pub(crate) records: Vec<OutdoorDesignRecord>,
}

/// One wall-type section of the ETD table: temperature differences by
/// orientation, plus the shadow (日陰) and horizontal (水平) series.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct EtdWallSection {
    #[serde(rename = "方位別")]
    pub(crate) directional: IndexMap<String, HourValueMap>,
    #[serde(rename = "日陰")]
    pub(crate) shadow: HourValueMap,
    #[serde(rename = "水平")]
    pub(crate) horizontal: HourValueMap,
}

// region -> indoor design temperature -> wall type -> section
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct EtdTable {
    pub(crate) regions: IndexMap<String, IndexMap<String, IndexMap<String, EtdWallSection>>>,
}

// region -> orientation (or 日影 for the shadow column) -> hour -> W/m²
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct SolarGainTable {
    pub(crate) regions: IndexMap<String, IndexMap<String, HourValueMap>>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct SashInfiltrationRecord {
    pub(crate) sash_type: String,
    pub(crate) airtightness: String,
    /// Infiltration rate by stringified wind speed bucket ("2" .. "10").
    #[serde(flatten)]
    pub(crate) rates: IndexMap<String, f64>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct SashInfiltrationTable {
    pub(crate) records: Vec<SashInfiltrationRecord>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct OrientationFactorRecord {
    pub(crate) direction: String,
    pub(crate) factor: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct OrientationFactorTable {
    pub(crate) records: Vec<OrientationFactorRecord>,
}

/// Precomputed tangents of apparent solar altitude/azimuth per region, hour
/// and wall orientation, used by the eave shading geometry.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct SunlitTangentHour {
    pub(crate) tan_solar_altitude: IndexMap<String, f64>,
    pub(crate) tan_solar_azimuth: IndexMap<String, f64>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct SunlitTangentTable {
    pub(crate) regions: IndexMap<String, IndexMap<String, SunlitTangentHour>>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegionCoordinateRecord {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct RegionCoordinateTable {
    pub(crate) records: Vec<RegionCoordinateRecord>,
}

/// A region coordinate record together with its great-circle distance from
/// the queried point.
#[derive(Clone, Debug, Serialize)]
pub struct NearestRegion {
    #[serde(flatten)]
    pub record: RegionCoordinateRecord,
    pub distance_km: f64,
}

#[derive(Debug, Default)]
pub struct ReferenceRepository {
    base_dir: Option<PathBuf>,
    design_outdoor: OnceLock<OutdoorDesignTable>,
    etd: OnceLock<EtdTable>,
    solar: OnceLock<SolarGainTable>,
    sash: OnceLock<SashInfiltrationTable>,
    heating_orientation: OnceLock<OrientationFactorTable>,
    others: OnceLock<IndexMap<String, Value>>,
    sunlit_tangents: OnceLock<SunlitTangentTable>,
    region_coordinates: OnceLock<RegionCoordinateTable>,
}

impl ReferenceRepository {
    /// A repository reading `<table name>.json` files from the given
    /// directory, each on first access.
    pub fn from_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
            ..Default::default()
        }
    }

    /// A repository populated directly from in-memory JSON table values,
    /// keyed by table name. Unknown table names are rejected.
    pub fn from_json_tables(
        tables: IndexMap<String, Value>,
    ) -> Result<Self, HeatLoadError> {
        let repository = Self::default();
        for (name, value) in tables {
            match name.as_str() {
                "design_outdoor_conditions" => set_table(&repository.design_outdoor, value)?,
                "execution_temperature_difference" => set_table(&repository.etd, value)?,
                "standard_solar_gain" => set_table(&repository.solar, value)?,
                "aluminum_sash_infiltration" => set_table(&repository.sash, value)?,
                "heating_orientation_factors" => {
                    set_table(&repository.heating_orientation, value)?
                }
                "others_tables" => set_table(&repository.others, value)?,
                "glass_sunlit_area_ratio_numbers" => {
                    set_table(&repository.sunlit_tangents, value)?
                }
                "region_coordinates" => set_table(&repository.region_coordinates, value)?,
                _ => return Err(HeatLoadError::UnknownTable(name)),
            }
        }
        Ok(repository)
    }

    /// The raw JSON value of a named table. Asking for a table this
    /// repository does not know about is a hard failure, in contrast to
    /// lookups within a known table, which degrade to defaults.
    pub fn table(&self, name: &str) -> Result<Value, HeatLoadError> {
        let value = match name {
            "design_outdoor_conditions" => serde_json::to_value(self.design_outdoor()),
            "execution_temperature_difference" => serde_json::to_value(self.etd()),
            "standard_solar_gain" => serde_json::to_value(self.solar()),
            "aluminum_sash_infiltration" => serde_json::to_value(self.sash()),
            "heating_orientation_factors" => serde_json::to_value(self.heating_orientation()),
            "others_tables" => serde_json::to_value(self.others()),
            "glass_sunlit_area_ratio_numbers" => serde_json::to_value(self.sunlit_tangents()),
            "region_coordinates" => serde_json::to_value(self.region_coordinates()),
            _ => return Err(HeatLoadError::UnknownTable(name.to_string())),
        };
        value.map_err(HeatLoadError::InvalidInput)
    }

    fn load_table<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let Some(base_dir) = &self.base_dir else {
            return T::default();
        };
        let path = base_dir.join(format!("{name}.json"));
        match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(table) => table,
                Err(error) => {
                    warn!("reference table {name} could not be parsed, treating as empty: {error}");
                    T::default()
                }
            },
            Err(error) => {
                warn!("reference table {name} could not be read, treating as empty: {error}");
                T::default()
            }
        }
    }

    fn design_outdoor(&self) -> &OutdoorDesignTable {
        self.design_outdoor
            .get_or_init(|| self.load_table("design_outdoor_conditions"))
    }

    fn etd(&self) -> &EtdTable {
        self.etd
            .get_or_init(|| self.load_table("execution_temperature_difference"))
    }

    fn solar(&self) -> &SolarGainTable {
        self.solar.get_or_init(|| self.load_table("standard_solar_gain"))
    }

    fn sash(&self) -> &SashInfiltrationTable {
        self.sash
            .get_or_init(|| self.load_table("aluminum_sash_infiltration"))
    }

    fn heating_orientation(&self) -> &OrientationFactorTable {
        self.heating_orientation
            .get_or_init(|| self.load_table("heating_orientation_factors"))
    }

    fn others(&self) -> &IndexMap<String, Value> {
        self.others.get_or_init(|| self.load_table("others_tables"))
    }

    fn sunlit_tangents(&self) -> &SunlitTangentTable {
        self.sunlit_tangents
            .get_or_init(|| self.load_table("glass_sunlit_area_ratio_numbers"))
    }

    fn region_coordinates(&self) -> &RegionCoordinateTable {
        self.region_coordinates
            .get_or_init(|| self.load_table("region_coordinates"))
    }

    /// The design outdoor condition record for a region, matched by city
    /// name, falling back to the first record. An empty default record means
    /// no table data was available at all.
    pub fn lookup_outdoor(&self, region: &str) -> OutdoorDesignRecord {
        let records = &self.design_outdoor().records;
        records
            .iter()
            .find(|record| record.city == region)
            .or_else(|| records.first())
            .cloned()
            .unwrap_or_default()
    }

    /// Execution temperature difference for a region/orientation/hour.
    /// Falls through directional → shadow → horizontal sub-tables and
    /// defaults to 0.0 when nothing matches.
    pub fn lookup_etd(
        &self,
        region: &str,
        orientation: &str,
        hour: &str,
        wall_type: &str,
        indoor_temp: &str,
    ) -> f64 {
        let Some(section) = self
            .etd()
            .regions
            .get(region)
            .and_then(|by_temp| by_temp.get(indoor_temp))
            .and_then(|by_wall| by_wall.get(wall_type))
        else {
            return 0.0;
        };
        if let Some(series) = section.directional.get(orientation) {
            return series.get(hour).copied().unwrap_or(0.0);
        }
        if orientation == "日陰" {
            return section.shadow.get(hour).copied().unwrap_or(0.0);
        }
        if orientation == "水平" {
            return section.horizontal.get(hour).copied().unwrap_or(0.0);
        }
        0.0
    }

    /// Standard solar gain in W/m² for a region/orientation/hour, falling
    /// back to the "N" orientation, then 0.0.
    pub fn lookup_solar_gain(&self, region: &str, orientation: &str, hour: &str) -> f64 {
        let Some(region_map) = self.solar().regions.get(region) else {
            return 0.0;
        };
        region_map
            .get(orientation)
            .or_else(|| region_map.get("N"))
            .and_then(|series| series.get(hour))
            .copied()
            .unwrap_or(0.0)
    }

    /// The direct (IG) and shadow/diffuse (IGS, 日影 column) standard solar
    /// gains for a region/orientation/hour, both defaulting to 0.0.
    pub fn lookup_solar_gain_components(
        &self,
        region: &str,
        orientation: &str,
        hour: &str,
    ) -> (f64, f64) {
        let Some(region_map) = self.solar().regions.get(region) else {
            return (0.0, 0.0);
        };
        let at_hour = |series: Option<&HourValueMap>| {
            series.and_then(|s| s.get(hour)).copied().unwrap_or(0.0)
        };
        (
            at_hour(region_map.get(orientation)),
            at_hour(region_map.get("日影")),
        )
    }

    /// Sash infiltration rate for a sash type and airtightness class at the
    /// nearest of the fixed wind speed buckets {2,4,6,8,10} m/s. Exact
    /// midpoint ties resolve to the lower bucket. No matching record → 0.0.
    pub fn lookup_sash_infiltration(
        &self,
        sash_type: &str,
        airtightness: &str,
        wind_speed_ms: f64,
    ) -> f64 {
        let Some(record) = self.sash().records.iter().find(|record| {
            record.sash_type == sash_type
                && record.airtightness.to_uppercase() == airtightness.to_uppercase()
        }) else {
            return 0.0;
        };
        let mut nearest = SASH_WIND_SPEED_BUCKETS_MS[0];
        for bucket in SASH_WIND_SPEED_BUCKETS_MS {
            if (bucket - wind_speed_ms).abs() < (nearest - wind_speed_ms).abs() {
                nearest = bucket;
            }
        }
        record
            .rates
            .get(&format!("{}", nearest as i64))
            .copied()
            .unwrap_or(0.0)
    }

    /// Heating orientation factor, from the dedicated record table first and
    /// the `heating_orientation_factors` map in `others_tables` second,
    /// defaulting to 1.0.
    pub fn lookup_orientation_factor_for_heating(&self, orientation: &str) -> f64 {
        if let Some(record) = self
            .heating_orientation()
            .records
            .iter()
            .find(|record| record.direction == orientation)
        {
            return record.factor.unwrap_or(1.0);
        }
        self.others()
            .get("heating_orientation_factors")
            .and_then(|table| table.get(orientation))
            .and_then(Value::as_f64)
            .unwrap_or(1.0)
    }

    /// Precomputed `(tan φ, tan γ)` of apparent solar altitude and
    /// wall-relative azimuth for the eave shading geometry, each defaulting
    /// to 0.0 (the both-zero pair is the "no direct sun" sentinel).
    pub fn lookup_sunlit_tangents(
        &self,
        region: &str,
        orientation: &str,
        hour: &str,
    ) -> (f64, f64) {
        let Some(hour_data) = self
            .sunlit_tangents()
            .regions
            .get(region)
            .and_then(|by_hour| by_hour.get(hour))
        else {
            return (0.0, 0.0);
        };
        (
            hour_data
                .tan_solar_altitude
                .get(orientation)
                .copied()
                .unwrap_or(0.0),
            hour_data
                .tan_solar_azimuth
                .get(orientation)
                .copied()
                .unwrap_or(0.0),
        )
    }

    /// Nearest region coordinate record by great-circle distance, optionally
    /// restricted to records carrying a tag. None when no candidate matches.
    pub fn lookup_nearest_region(
        &self,
        lat: f64,
        lon: f64,
        tag: Option<&str>,
    ) -> Option<NearestRegion> {
        self.region_coordinates()
            .records
            .iter()
            .filter(|record| match tag {
                Some(tag) => record.tags.iter().any(|t| t == tag),
                None => true,
            })
            .map(|record| NearestRegion {
                record: record.clone(),
                distance_km: haversine_km(lat, lon, record.lat, record.lon),
            })
            .min_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
    }
}

fn set_table<T: DeserializeOwned>(
    cell: &OnceLock<T>,
    value: Value,
) -> Result<(), HeatLoadError> {
    let table = serde_json::from_value(value)?;
    // a freshly built repository has empty cells, so this cannot already be set
    let _ = cell.set(table);
    Ok(())
}

fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;

    pub(crate) fn repository_from(tables: IndexMap<String, Value>) -> ReferenceRepository {
        ReferenceRepository::from_json_tables(tables).expect("valid test tables")
    }

    #[fixture]
    fn repository() -> ReferenceRepository {
        repository_from(IndexMap::from([
            (
                "design_outdoor_conditions".to_string(),
                json!({"records": [
                    {"city": "東京", "cooling_drybulb_c": 34.2, "cooling_rh_pct": 56.0,
                     "heating_drybulb_c": -1.0, "temp_9_c": 31.0, "temp_12_c": 33.5,
                     "temp_14_c": 34.2, "temp_16_c": 33.0},
                    {"city": "大阪", "cooling_drybulb_c": 34.8}
                ]}),
            ),
            (
                "execution_temperature_difference".to_string(),
                json!({"regions": {"東京": {"28": {"Ⅰ": {
                    "方位別": {"S": {"9": 3.0, "12": 5.5, "14": 7.0, "16": 6.0}},
                    "日陰": {"9": 1.0, "12": 2.0, "14": 2.5, "16": 2.0},
                    "水平": {"9": 5.0, "12": 9.0, "14": 11.0, "16": 9.5}
                }}}}}),
            ),
            (
                "standard_solar_gain".to_string(),
                json!({"regions": {"東京": {
                    "S": {"9": 100.0, "12": 300.0, "14": 250.0, "16": 120.0},
                    "N": {"9": 30.0, "12": 40.0, "14": 38.0, "16": 35.0},
                    "日影": {"9": 20.0, "12": 30.0, "14": 28.0, "16": 22.0}
                }}}),
            ),
            (
                "aluminum_sash_infiltration".to_string(),
                json!({"records": [
                    {"sash_type": "sliding", "airtightness": "a",
                     "2": 1.0, "4": 2.0, "6": 3.5, "8": 5.0, "10": 7.0}
                ]}),
            ),
            (
                "heating_orientation_factors".to_string(),
                json!({"records": [{"direction": "N", "factor": 1.1}]}),
            ),
            (
                "others_tables".to_string(),
                json!({"heating_orientation_factors": {"S": 0.9}}),
            ),
            (
                "glass_sunlit_area_ratio_numbers".to_string(),
                json!({"regions": {"東京": {"14": {
                    "tan_solar_altitude": {"S": 1.2},
                    "tan_solar_azimuth": {"S": 0.4}
                }}}}),
            ),
            (
                "region_coordinates".to_string(),
                json!({"records": [
                    {"city": "東京", "lat": 35.68, "lon": 139.77, "tags": ["design"]},
                    {"city": "横浜", "lat": 35.44, "lon": 139.64, "tags": []}
                ]}),
            ),
        ]))
    }

    #[rstest]
    fn should_reject_unknown_table_names() {
        let error = ReferenceRepository::from_json_tables(IndexMap::from([(
            "not_a_table".to_string(),
            json!({}),
        )]))
        .unwrap_err();
        assert!(matches!(error, HeatLoadError::UnknownTable(name) if name == "not_a_table"));

        let repository = ReferenceRepository::default();
        assert!(matches!(
            repository.table("made_up"),
            Err(HeatLoadError::UnknownTable(_))
        ));
        assert!(repository.table("standard_solar_gain").is_ok());
    }

    #[rstest]
    fn should_match_outdoor_record_by_city_with_first_record_fallback(
        repository: ReferenceRepository,
    ) {
        assert_eq!(repository.lookup_outdoor("大阪").cooling_drybulb_c, Some(34.8));
        // unknown region falls back to the first record
        assert_eq!(repository.lookup_outdoor("札幌").city, "東京");
    }

    #[rstest]
    fn should_fall_through_etd_sub_tables(repository: ReferenceRepository) {
        assert_eq!(repository.lookup_etd("東京", "S", "14", "Ⅰ", "28"), 7.0);
        assert_eq!(repository.lookup_etd("東京", "日陰", "12", "Ⅰ", "28"), 2.0);
        assert_eq!(repository.lookup_etd("東京", "水平", "16", "Ⅰ", "28"), 9.5);
        assert_eq!(repository.lookup_etd("東京", "NW", "14", "Ⅰ", "28"), 0.0);
        assert_eq!(repository.lookup_etd("那覇", "S", "14", "Ⅰ", "28"), 0.0);
    }

    #[rstest]
    fn should_fall_back_to_north_for_solar_gain(repository: ReferenceRepository) {
        assert_eq!(repository.lookup_solar_gain("東京", "S", "12"), 300.0);
        assert_eq!(repository.lookup_solar_gain("東京", "SW", "12"), 40.0);
        assert_eq!(repository.lookup_solar_gain("那覇", "S", "12"), 0.0);
    }

    #[rstest]
    fn should_read_direct_and_shadow_solar_components(repository: ReferenceRepository) {
        assert_eq!(
            repository.lookup_solar_gain_components("東京", "S", "14"),
            (250.0, 28.0)
        );
    }

    #[rstest]
    #[case(3.2, 2.0)] // nearest bucket is 4 m/s
    #[case(3.0, 1.0)] // exact midpoint resolves to the lower bucket, 2 m/s
    #[case(9.4, 7.0)] // nearest bucket is 10 m/s
    fn should_bucket_sash_wind_speeds(
        repository: ReferenceRepository,
        #[case] wind_speed: f64,
        #[case] expected_rate: f64,
    ) {
        assert_eq!(
            repository.lookup_sash_infiltration("sliding", "A", wind_speed),
            expected_rate
        );
    }

    #[rstest]
    fn should_return_zero_rate_for_unknown_sash(repository: ReferenceRepository) {
        assert_eq!(repository.lookup_sash_infiltration("fixed", "A", 4.0), 0.0);
    }

    #[rstest]
    fn should_fall_back_through_orientation_factor_tables(repository: ReferenceRepository) {
        assert_eq!(repository.lookup_orientation_factor_for_heating("N"), 1.1);
        assert_eq!(repository.lookup_orientation_factor_for_heating("S"), 0.9);
        assert_eq!(repository.lookup_orientation_factor_for_heating("E"), 1.0);
    }

    #[rstest]
    fn should_default_sunlit_tangents_to_zero(repository: ReferenceRepository) {
        assert_eq!(repository.lookup_sunlit_tangents("東京", "S", "14"), (1.2, 0.4));
        assert_eq!(repository.lookup_sunlit_tangents("東京", "N", "14"), (0.0, 0.0));
        assert_eq!(repository.lookup_sunlit_tangents("東京", "S", "9"), (0.0, 0.0));
    }

    #[rstest]
    fn should_find_nearest_region_by_great_circle_distance(repository: ReferenceRepository) {
        let nearest = repository
            .lookup_nearest_region(35.45, 139.63, None)
            .unwrap();
        assert_eq!(nearest.record.city, "横浜");
        assert!(nearest.distance_km < 2.0);

        // the tag filter excludes the geometrically nearer record
        let tagged = repository
            .lookup_nearest_region(35.45, 139.63, Some("design"))
            .unwrap();
        assert_eq!(tagged.record.city, "東京");
        assert_relative_eq!(tagged.distance_km, 28.0, max_relative = 0.1);
    }

    #[rstest]
    fn should_treat_missing_table_files_as_empty() {
        let repository = ReferenceRepository::from_dir("/nonexistent/reference_data");
        assert_eq!(repository.lookup_etd("東京", "S", "14", "Ⅰ", "28"), 0.0);
        assert_eq!(repository.lookup_orientation_factor_for_heating("N"), 1.0);
        assert!(repository.lookup_nearest_region(35.0, 139.0, None).is_none());
    }
}
