//! Integration tests for Whereabouts location resolution
//!
//! These tests run against the public API only, over the sample Hampshire/London
//! gazetteer and an Open Names CSV written to a temporary file.

use std::sync::Arc;

use rand::{SeedableRng, rngs::StdRng};
use serde_json::json;
use whereabouts::{
    BoundingBox, CrsCode, CrsTransformer, FreetextOptions, Geometry, GeocoderConfigBuilder,
    LocatedItem, Location, LocationPayload, LocationResolver, MemoryGazetteer, Point,
    TransformPoint, decode_grid_ref, encode_grid_ref, error::WhereaboutsError,
    geojson_from_items, geojson_from_location, postcode_finder, transform_point,
};
use whereabouts_data::{
    LocalType,
    test_data::{sample_open_names_rows, sample_records, write_open_names_csv},
};

fn setup_test_env() {
    let _ = whereabouts::init_logging(tracing::Level::WARN);
}

fn sample_resolver() -> LocationResolver {
    let gazetteer = MemoryGazetteer::new(sample_records(), CrsCode::WGS84)
        .expect("Should build sample gazetteer");
    LocationResolver::new(Arc::new(gazetteer)).expect("Should build resolver")
}

/// Web Mercator box spanning Romsey to Southampton.
fn southampton_box() -> BoundingBox {
    let to_mercator = CrsTransformer::new(CrsCode::WGS84, CrsCode::WEB_MERCATOR).unwrap();
    let (x1, y1) = to_mercator.transform(-1.52, 50.90).unwrap();
    let (x2, y2) = to_mercator.transform(-1.38, 50.995).unwrap();
    BoundingBox::new(x1, y1, x2, y2, CrsCode::WEB_MERCATOR)
}

#[test]
fn test_full_workflow() {
    setup_test_env();
    let resolver = sample_resolver();

    // 1. A postcode payload
    let point = resolver
        .geocode(&LocationPayload::from_postcode("so167qf"))
        .expect("Postcode geocoding should work")
        .expect("Sample postcode should resolve");
    assert_eq!(point, Point::new(-1.4165, 50.9345, CrsCode::WGS84));

    // 2. Its grid reference
    let gridref = resolver.grid_reference(&point).unwrap();
    assert!(gridref.starts_with("SU"), "got {gridref}");
    assert_eq!(gridref.len(), 8);

    // 3. Back to the nearest postcode
    assert_eq!(resolver.reverse_geocode(point.x, point.y).unwrap(), "SO16 7QF");

    // 4. Place names
    let places = resolver
        .places_search("winchester", &[LocalType::City, LocalType::NamedRoad])
        .unwrap();
    let names: Vec<_> = places.iter().map(|p| p.name1.as_str()).collect();
    assert_eq!(names, ["Winchester", "Winchester Road"]);

    // 5. Free text inside a map view
    let response = resolver
        .freetext_with_options(
            "Cycled from Romsey through Chilworth to Southampton",
            &southampton_box(),
            &FreetextOptions::default().with_max_bbox_area(1.0e9),
        )
        .unwrap();
    assert_eq!(response.geojson.len(), 3);
    for feature in &response.geojson.features {
        let headline = feature.property("headline").unwrap().as_str().unwrap();
        assert!(headline.contains("<<<") && headline.contains(">>>"));
    }
}

#[test]
fn test_dispatch_runs_only_first_applicable_strategy() {
    setup_test_env();
    let resolver = sample_resolver();

    // Coordinates present: the bogus postcode is never looked at.
    let payload = LocationPayload::from_coordinates("51.5", "-0.12").with_postcode("ZZ99 9ZZ");
    assert_eq!(
        resolver.geocode(&payload).unwrap(),
        Some(Point::new(-0.12, 51.5, CrsCode::WGS84))
    );

    // A grid reference that does not decode shadows a valid postcode.
    let payload = LocationPayload::from_gridref("not a gridref").with_postcode("SO16 7QF");
    assert_eq!(resolver.geocode(&payload).unwrap(), None);

    // Blank fields count as absent.
    let payload = LocationPayload::from_coordinates("", "-0.12").with_postcode("SW1A 1AA");
    let point = resolver.geocode(&payload).unwrap().unwrap();
    assert!((point.x - -0.1419).abs() < 1e-9);
}

#[test]
fn test_batch_geocoding_preserves_order() {
    setup_test_env();
    let resolver = sample_resolver();
    let payloads = vec![
        LocationPayload::from_postcode("SW1A 1AA"),
        LocationPayload::from_gridref("SU387148"),
        LocationPayload::default(),
        LocationPayload::from_coordinates("50.0", "-2.0"),
    ];

    let points = resolver.geocode_batch(&payloads).unwrap();
    assert_eq!(points.len(), 4);
    assert!((points[0].unwrap().y - 51.5010).abs() < 1e-9);
    assert!((points[1].unwrap().x - -1.45).abs() < 0.02);
    assert!(points[2].is_none());
    assert_eq!(points[3], Some(Point::new(-2.0, 50.0, CrsCode::WGS84)));
}

#[test]
fn test_web_map_configuration() {
    setup_test_env();
    let gazetteer = MemoryGazetteer::new(sample_records(), CrsCode::WGS84).unwrap();
    let config = GeocoderConfigBuilder::web_map()
        .coordinate_crs(CrsCode::WEB_MERCATOR)
        .build();
    let resolver = LocationResolver::with_config(Arc::new(gazetteer), config).unwrap();

    let point = resolver.geocode_postcode("SW1A 1AA").unwrap().unwrap();
    assert_eq!(point.crs, CrsCode::WEB_MERCATOR);

    // Coordinates in the output CRS pass straight through.
    let payload = LocationPayload::from_coordinates(point.y.to_string(), point.x.to_string());
    let echoed = resolver.geocode(&payload).unwrap().unwrap();
    assert!((echoed.x - point.x).abs() < 1e-6);
    assert!((echoed.y - point.y).abs() < 1e-6);
}

#[test]
fn test_freetext_guard_and_payload() {
    setup_test_env();
    let resolver = sample_resolver();

    let err = resolver
        .freetext("Romsey", &southampton_box())
        .expect_err("Default ceiling is 10 km x 10 km");
    assert!(matches!(err, WhereaboutsError::SearchError(_)));
    let payload = err.error_payload().unwrap();
    assert_eq!(payload["error"], json!("bbox too large"));
    assert!(payload["area"].as_f64().unwrap() > 1.0e8);

    let wide = MemoryGazetteer::new(sample_records(), CrsCode::WGS84).unwrap();
    let resolver =
        LocationResolver::with_config(Arc::new(wide), GeocoderConfigBuilder::wide_area().build())
            .unwrap();
    let response = resolver.freetext("Romsey", &southampton_box()).unwrap();
    assert_eq!(response.geojson.len(), 1);
    assert!(response.bbox.starts_with("SRID=4326;POLYGON (("));
}

#[test]
fn test_postcode_buffer_collection() {
    setup_test_env();
    let resolver = sample_resolver();
    let collection = resolver
        .postcode_collection_with_buffer("sw1a1aa", Some(1_000.0))
        .unwrap()
        .unwrap();

    let value = serde_json::to_value(&collection).unwrap();
    assert_eq!(value["type"], json!("FeatureCollection"));
    assert_eq!(value["features"][0]["properties"]["postcode"], json!("SW1A 1AA"));
    assert_eq!(value["features"][1]["properties"]["type"], json!("buffer"));
    assert_eq!(value["features"][1]["geometry"]["type"], json!("Polygon"));

    assert!(resolver.postcode_collection("ZZ99 9ZZ").unwrap().is_none());
}

#[test]
fn test_open_names_csv_resolver() {
    setup_test_env();
    let file = write_open_names_csv(&sample_open_names_rows(), false).unwrap();
    let resolver =
        LocationResolver::from_open_names_csv(file.path(), false, Default::default()).unwrap();

    let point = resolver.geocode_postcode("SO16 7QF").unwrap().unwrap();
    assert!((point.x - -1.406).abs() < 0.01, "lon = {}", point.x);
    assert!((point.y - 50.938).abs() < 0.01, "lat = {}", point.y);

    let places = resolver.places_search("romsey", &[]).unwrap();
    assert_eq!(places[0].local_type, LocalType::Town);
    assert_eq!(places[0].postcode_district.as_deref(), Some("SO51"));
}

#[test]
fn test_random_place_is_reproducible() {
    setup_test_env();
    let resolver = sample_resolver();
    let first = resolver
        .random_place(1..=13, &mut StdRng::seed_from_u64(3), 10)
        .unwrap();
    let second = resolver
        .random_place(1..=13, &mut StdRng::seed_from_u64(3), 10)
        .unwrap();
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn test_codec_and_extractor_helpers() {
    assert_eq!(decode_grid_ref("SU387148").unwrap(), (438_700.0, 114_800.0));
    assert_eq!(encode_grid_ref(438_700.0, 114_800.0).unwrap(), "SU387148");

    assert_eq!(
        postcode_finder("contact me at SW1A 1AA please"),
        (true, "SW1A1AA".to_owned())
    );
    assert_eq!(
        postcode_finder("no postcode here"),
        (false, "no postcode here".to_owned())
    );

    let (x, y) = transform_point(-1.4, 50.9, "EPSG:4326", "epsg:27700").unwrap();
    let (lon, lat) = transform_point(x, y, "27700", "EPSG:4326").unwrap();
    assert!((lon - -1.4).abs() < 1e-6);
    assert!((lat - 50.9).abs() < 1e-6);
}

#[test]
fn test_geojson_assembly() {
    let collection = geojson_from_location(&Location::new(-1.4, 50.9), "pin");
    assert_eq!(
        collection.features[0].geometry,
        Some(Geometry::point(-1.4, 50.9))
    );
    assert_eq!(collection.features[0].property("icon"), Some(&json!("pin")));

    let partial = Location {
        lon: Some(-1.4),
        lat: None,
    };
    assert!(geojson_from_location(&partial, "pin").features[0].geometry.is_none());

    let items: Vec<LocatedItem> = serde_json::from_value(json!([
        { "location": { "lon": -1.4, "lat": 50.9 }, "name": "a" },
        { "location": null, "name": "b" },
        { "name": "c" },
    ]))
    .unwrap();
    assert_eq!(geojson_from_items(&items).len(), 1);
}
