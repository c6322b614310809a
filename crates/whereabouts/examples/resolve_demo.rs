use std::sync::Arc;

use anyhow::Result;
use tracing::{Level, info, info_span, warn};
use whereabouts::{
    BoundingBox, CrsCode, GeocoderConfigBuilder, LocationPayload, LocationResolver,
    MemoryGazetteer, transform_point,
};
use whereabouts_data::{LocalType, test_data::sample_records};

fn main() -> Result<()> {
    whereabouts::init_logging(Level::INFO)?;

    let gazetteer = MemoryGazetteer::new(sample_records(), CrsCode::WGS84)?;
    let config = GeocoderConfigBuilder::new()
        .buffer_distance(500.0)
        .build_validated()?;
    let resolver = LocationResolver::with_config(Arc::new(gazetteer), config)?;

    let _geocode_span = info_span!("geocode_payloads").entered();
    let payloads = [
        LocationPayload::from_coordinates("50.9097", "-1.4043"),
        LocationPayload::from_gridref("SU 387 148"),
        LocationPayload::from_postcode("so16 7qf"),
        LocationPayload::default(),
    ];
    for (payload, point) in payloads.iter().zip(resolver.geocode_batch(&payloads)?) {
        match point {
            Some(point) => info!(
                ?payload,
                x = point.x,
                y = point.y,
                gridref = %resolver.grid_reference(&point)?,
                "Located payload"
            ),
            None => warn!(?payload, "Nothing to locate"),
        }
    }

    if let Some(collection) = resolver.postcode_collection("SO16 7QF")? {
        info!(geojson = %serde_json::to_string(&collection)?, "Postcode with buffer");
    }

    let places = resolver.places_search("winchester", &[LocalType::City, LocalType::NamedRoad])?;
    for place in &places {
        info!(name = %place.name1, local_type = %place.local_type, rank = place.rank, "Place");
    }

    // An 8 km square around Chilworth, as a web map would send it.
    let (x, y) = transform_point(-1.4167, 50.9583, "EPSG:4326", "EPSG:3857")?;
    let view = BoundingBox::new(
        x - 4_000.0,
        y - 4_000.0,
        x + 4_000.0,
        y + 4_000.0,
        CrsCode::WEB_MERCATOR,
    );
    let text = "Meet at the Chilworth arms, or in Southampton if it rains";
    match resolver.freetext(text, &view) {
        Ok(response) => info!(
            matches = response.geojson.len(),
            area = response.bbox_area,
            bbox = %response.bbox,
            "Free-text search"
        ),
        Err(e) => warn!(payload = ?e.error_payload(), "Free-text search rejected"),
    }

    let nearest = resolver.reverse_geocode(-1.41, 50.93)?;
    info!(nearest = %nearest, "Reverse geocode");
    Ok(())
}
