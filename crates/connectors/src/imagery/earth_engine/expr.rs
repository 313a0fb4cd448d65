use model::core::zone::ZoneOfInterest;
use serde_json::{Map, Value, json};

fn constant(value: Value) -> Value {
    json!({ "constantValue": value })
}

fn invoke(function: &str, arguments: Vec<(&str, Value)>) -> Value {
    let arguments: Map<String, Value> = arguments
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    json!({
        "functionInvocationValue": {
            "functionName": function,
            "arguments": arguments,
        }
    })
}

/// Wrap a single value node into a serialized expression graph.
pub(crate) fn expression(root: Value) -> Value {
    json!({
        "result": "0",
        "values": { "0": root },
    })
}

pub(crate) fn band(image_id: &str, band: &str) -> Value {
    let image = invoke("Image.load", vec![("id", constant(json!(image_id)))]);
    invoke(
        "Image.select",
        vec![("input", image), ("bandSelectors", constant(json!([band])))],
    )
}

pub(crate) fn polygon(zone: &ZoneOfInterest) -> Value {
    invoke(
        "GeometryConstructors.Polygon",
        vec![("coordinates", constant(json!([zone.ring()])))],
    )
}

pub(crate) fn reduce_mean(image: Value, zone: &ZoneOfInterest, scale: f64, max_pixels: f64) -> Value {
    invoke(
        "Image.reduceRegion",
        vec![
            ("image", image),
            ("reducer", invoke("Reducer.mean", vec![])),
            ("geometry", polygon(zone)),
            ("scale", constant(json!(scale))),
            ("maxPixels", constant(json!(max_pixels))),
        ],
    )
}

/// `image.clip(zone)` resampled to `scale`, in `crs` or the image's own
/// projection.
pub(crate) fn clipped(image: Value, zone: &ZoneOfInterest, scale: f64, crs: Option<&str>) -> Value {
    let crs = match crs {
        Some(code) => constant(json!(code)),
        None => invoke("Image.projection", vec![("image", image.clone())]),
    };
    let clipped = invoke(
        "Image.clip",
        vec![("input", image), ("geometry", polygon(zone))],
    );
    invoke(
        "Image.reproject",
        vec![
            ("image", clipped),
            ("crs", crs),
            ("scale", constant(json!(scale))),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_region_graph_shape() {
        let zone = ZoneOfInterest::moulouya();
        let graph = expression(reduce_mean(band("A/B/1", "VV"), &zone, 10.0, 1e9));

        let root = &graph["values"]["0"]["functionInvocationValue"];
        assert_eq!(root["functionName"], "Image.reduceRegion");
        assert_eq!(root["arguments"]["scale"]["constantValue"], 10.0);

        let select = &root["arguments"]["image"]["functionInvocationValue"];
        assert_eq!(select["functionName"], "Image.select");
        assert_eq!(select["arguments"]["bandSelectors"]["constantValue"][0], "VV");

        let coords = &root["arguments"]["geometry"]["functionInvocationValue"]["arguments"]
            ["coordinates"]["constantValue"];
        assert_eq!(coords[0].as_array().unwrap().len(), zone.ring().len());
    }

    #[test]
    fn clip_uses_native_projection_without_crs() {
        let zone = ZoneOfInterest::moulouya();
        let node = clipped(band("A/B/1", "VV"), &zone, 10.0, None);
        let crs = &node["functionInvocationValue"]["arguments"]["crs"];
        assert_eq!(crs["functionInvocationValue"]["functionName"], "Image.projection");

        let node = clipped(band("A/B/1", "VV"), &zone, 10.0, Some("EPSG:4326"));
        assert_eq!(
            node["functionInvocationValue"]["arguments"]["crs"]["constantValue"],
            "EPSG:4326"
        );
    }
}
