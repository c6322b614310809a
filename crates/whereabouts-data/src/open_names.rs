//! Ordnance Survey Open Names ingestion.
//!
//! Open Names is distributed as CSV tiles without a header row (the header ships as a
//! separate file), so the reader applies the product schema positionally. Geometry in
//! the product is British National Grid easting/northing.

use std::path::Path;

use itertools::izip;
use polars::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::{DataError, GazetteerRecord, LocalType, Result};

/// EPSG code of the coordinates carried by the Open Names product.
pub const OPEN_NAMES_CRS: u32 = 27700;

/// Column names of the Open Names CSV, in file order.
pub const OPEN_NAMES_COLUMNS: [&str; 34] = [
    "ID",
    "NAMES_URI",
    "NAME1",
    "NAME1_LANG",
    "NAME2",
    "NAME2_LANG",
    "TYPE",
    "LOCAL_TYPE",
    "GEOMETRY_X",
    "GEOMETRY_Y",
    "MOST_DETAIL_VIEW_RES",
    "LEAST_DETAIL_VIEW_RES",
    "MBR_XMIN",
    "MBR_YMIN",
    "MBR_XMAX",
    "MBR_YMAX",
    "POSTCODE_DISTRICT",
    "POSTCODE_DISTRICT_URI",
    "POPULATED_PLACE",
    "POPULATED_PLACE_URI",
    "POPULATED_PLACE_TYPE",
    "DISTRICT_BOROUGH",
    "DISTRICT_BOROUGH_URI",
    "DISTRICT_BOROUGH_TYPE",
    "COUNTY_UNITARY",
    "COUNTY_UNITARY_URI",
    "COUNTY_UNITARY_TYPE",
    "REGION",
    "REGION_URI",
    "COUNTRY",
    "COUNTRY_URI",
    "RELATED_SPATIAL_OBJECT",
    "SAME_AS_DBPEDIA",
    "SAME_AS_GEONAMES",
];

fn open_names_schema() -> Schema {
    Schema::from_iter(
        OPEN_NAMES_COLUMNS
            .iter()
            .map(|name| Field::new((*name).into(), DataType::String)),
    )
}

/// Read an Open Names CSV tile into a frame of string columns.
///
/// Every column is read as text; numeric parsing happens in [`records_from_frame`]
/// so a malformed coordinate is reported with its row instead of failing the scan.
#[instrument(name = "Read Open Names CSV", skip(path), fields(path = %path.as_ref().display()), level = "info")]
pub fn read_open_names_csv(path: impl AsRef<Path>, has_header: bool) -> Result<DataFrame> {
    let df = LazyCsvReader::new(path)
        .with_has_header(has_header)
        .with_schema(Some(open_names_schema().into()))
        .finish()?
        .collect()?;
    info!(rows = df.height(), "Loaded Open Names rows");
    Ok(df)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn parse_coordinate(column: &'static str, row: usize, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| DataError::InvalidValue {
            column,
            row,
            value: value.to_owned(),
        })
}

/// Convert an Open Names frame into gazetteer records.
///
/// Record ids are assigned sequentially from 1 in row order. Rows without a source id,
/// a name or geometry are skipped; the returned coordinates are in [`OPEN_NAMES_CRS`].
#[instrument(name = "Open Names records", skip_all, fields(rows = df.height()), level = "debug")]
pub fn records_from_frame(df: &DataFrame) -> Result<Vec<GazetteerRecord>> {
    let ids = df.column("ID")?.str()?;
    let name1s = df.column("NAME1")?.str()?;
    let name2s = df.column("NAME2")?.str()?;
    let local_types = df.column("LOCAL_TYPE")?.str()?;
    let xs = df.column("GEOMETRY_X")?.str()?;
    let ys = df.column("GEOMETRY_Y")?.str()?;
    let districts = df.column("POSTCODE_DISTRICT")?.str()?;
    let populated_places = df.column("POPULATED_PLACE")?.str()?;
    let boroughs = df.column("DISTRICT_BOROUGH")?.str()?;
    let counties = df.column("COUNTY_UNITARY")?.str()?;
    let regions = df.column("REGION")?.str()?;
    let countries = df.column("COUNTRY")?.str()?;

    let mut records = Vec::with_capacity(df.height());
    let mut skipped = 0usize;

    for (
        row,
        (
            source_id,
            name1,
            name2,
            local_type,
            x,
            y,
            district,
            populated_place,
            borough,
            county,
            region,
            country,
        ),
    ) in izip!(
        ids,
        name1s,
        name2s,
        local_types,
        xs,
        ys,
        districts,
        populated_places,
        boroughs,
        counties,
        regions,
        countries
    )
    .enumerate()
    {
        let (Some(source_id), Some(name1), Some(x), Some(y)) = (
            non_empty(source_id),
            non_empty(name1),
            non_empty(x),
            non_empty(y),
        ) else {
            skipped += 1;
            continue;
        };

        let mut record = GazetteerRecord::new(
            row as u64 + 1,
            name1,
            LocalType::from(local_type.unwrap_or_default()),
            parse_coordinate("GEOMETRY_X", row, &x)?,
            parse_coordinate("GEOMETRY_Y", row, &y)?,
        );
        record.source_id = Some(source_id);
        record.name2 = non_empty(name2);
        record.postcode_district = non_empty(district);
        record.populated_place = non_empty(populated_place);
        record.district_borough = non_empty(borough);
        record.county_unitary = non_empty(county);
        record.region = non_empty(region);
        record.country = non_empty(country);
        records.push(record);
    }

    if skipped > 0 {
        warn!(skipped, "Skipped Open Names rows without an id, name or geometry");
    }
    debug!(records = records.len(), "Converted Open Names rows");
    Ok(records)
}
