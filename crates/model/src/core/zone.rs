use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ZoneError {
    #[error("Zone ring needs at least 3 distinct vertices, got {0}")]
    TooFewVertices(usize),

    #[error("Zone vertex {index} is not a finite lon/lat pair")]
    InvalidVertex { index: usize },

    #[error("Zone GeoJSON is not a Polygon: {0}")]
    NotAPolygon(String),
}

/// Static polygon every reduction and export is computed over.
///
/// The outer ring is stored closed (first vertex == last vertex).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneOfInterest {
    name: String,
    ring: Vec<[f64; 2]>,
}

impl ZoneOfInterest {
    pub fn new(name: impl Into<String>, mut ring: Vec<[f64; 2]>) -> Result<Self, ZoneError> {
        if let Some(index) = ring
            .iter()
            .position(|[lon, lat]| !lon.is_finite() || !lat.is_finite())
        {
            return Err(ZoneError::InvalidVertex { index });
        }

        if ring.first() != ring.last() {
            if let Some(first) = ring.first().copied() {
                ring.push(first);
            }
        }

        let distinct = ring.len().saturating_sub(1);
        if distinct < 3 {
            return Err(ZoneError::TooFewVertices(distinct));
        }

        Ok(Self {
            name: name.into(),
            ring,
        })
    }

    /// Parse a GeoJSON `Polygon` geometry (or a `Feature` wrapping one).
    /// Only the outer ring is used.
    pub fn from_geojson(name: impl Into<String>, geojson: &Value) -> Result<Self, ZoneError> {
        let geometry = match geojson.get("type").and_then(Value::as_str) {
            Some("Feature") => geojson.get("geometry").unwrap_or(&Value::Null),
            _ => geojson,
        };

        match geometry.get("type").and_then(Value::as_str) {
            Some("Polygon") => {}
            other => return Err(ZoneError::NotAPolygon(format!("{other:?}"))),
        }

        let outer = geometry
            .get("coordinates")
            .and_then(Value::as_array)
            .and_then(|rings| rings.first())
            .and_then(Value::as_array)
            .ok_or_else(|| ZoneError::NotAPolygon("missing outer ring".into()))?;

        let mut ring = Vec::with_capacity(outer.len());
        for (index, vertex) in outer.iter().enumerate() {
            let pair = vertex
                .as_array()
                .filter(|pair| pair.len() >= 2)
                .and_then(|pair| Some([pair[0].as_f64()?, pair[1].as_f64()?]))
                .ok_or(ZoneError::InvalidVertex { index })?;
            ring.push(pair);
        }

        Self::new(name, ring)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ring(&self) -> &[[f64; 2]] {
        &self.ring
    }

    pub fn to_geojson(&self) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [self.ring],
        })
    }

    /// Field parcel near the lower Moulouya the monitoring was set up for.
    pub fn moulouya() -> Self {
        let ring = vec![
            [-2.3481773965156094, 35.10994069768071],
            [-2.3456620930114127, 35.1057921166766],
            [-2.3395766814241767, 35.10280500753562],
            [-2.331259952255124, 35.10466366608924],
            [-2.327568135891795, 35.11004026111742],
            [-2.326026498289366, 35.1151510164202],
            [-2.3265944700380317, 35.120560103022925],
            [-2.337020808557469, 35.12357974361997],
            [-2.3424976789862626, 35.12304882591104],
            [-2.3440393165879527, 35.11992961448671],
            [-2.344485580152309, 35.11820404187584],
            [-2.343674191940522, 35.115781541852286],
            [-2.3447289966161122, 35.113292596948455],
            [-2.3481773965156094, 35.10994069768071],
        ];
        Self {
            name: "moulouya".to_string(),
            ring,
        }
    }
}
