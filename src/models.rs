use serde::Serialize;

// Query string of /get_height, parsed by hand so bad input maps to our own 400
#[derive(Debug)]
pub struct HeightQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

impl HeightQuery {
    // Repeated keys keep their first value, extra keys are ignored
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = HeightQuery { lat: None, lon: None };
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "lat" => &mut query.lat,
                "lon" => &mut query.lon,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

// Geoid heights for one point, in meters
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ElevationData {
    #[serde(rename = "EGM2008")]
    pub egm2008: f64,
    #[serde(rename = "EGM96")]
    pub egm96: f64,
    #[serde(rename = "EGM84")]
    pub egm84: f64,
}

// Body of every non-200 response
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}
