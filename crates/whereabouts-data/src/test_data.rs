use std::io::Write;

use tempfile::NamedTempFile;
use tracing::info;

use super::{GazetteerRecord, LocalType, Result, open_names::OPEN_NAMES_COLUMNS};

/// A raw Open Names row as it appears on disk, used to build CSV fixtures.
#[derive(Debug, Clone)]
pub struct OpenNamesRow {
    pub id: String,
    pub name1: String,
    pub local_type: String,
    pub x: String,
    pub y: String,
    pub postcode_district: String,
    pub populated_place: String,
    pub county_unitary: String,
    pub region: String,
    pub country: String,
}

impl OpenNamesRow {
    fn new(id: &str, name1: &str, local_type: &str, x: f64, y: f64, district: &str) -> Self {
        Self {
            id: id.to_owned(),
            name1: name1.to_owned(),
            local_type: local_type.to_owned(),
            x: x.to_string(),
            y: y.to_string(),
            postcode_district: district.to_owned(),
            populated_place: String::new(),
            county_unitary: "Hampshire".to_owned(),
            region: "South East".to_owned(),
            country: "England".to_owned(),
        }
    }

    fn fields(&self) -> [&str; OPEN_NAMES_COLUMNS.len()] {
        let mut fields = [""; OPEN_NAMES_COLUMNS.len()];
        for (slot, column) in fields.iter_mut().zip(OPEN_NAMES_COLUMNS) {
            *slot = match column {
                "ID" => self.id.as_str(),
                "NAME1" => self.name1.as_str(),
                "LOCAL_TYPE" => self.local_type.as_str(),
                "GEOMETRY_X" => self.x.as_str(),
                "GEOMETRY_Y" => self.y.as_str(),
                "POSTCODE_DISTRICT" => self.postcode_district.as_str(),
                "POPULATED_PLACE" => self.populated_place.as_str(),
                "COUNTY_UNITARY" => self.county_unitary.as_str(),
                "REGION" => self.region.as_str(),
                "COUNTRY" => self.country.as_str(),
                _ => "",
            };
        }
        fields
    }
}

/// A handful of Hampshire entries with British National Grid geometry.
pub fn sample_open_names_rows() -> Vec<OpenNamesRow> {
    let mut southampton = OpenNamesRow::new(
        "osgb4000000074559125",
        "Southampton",
        "City",
        442_458.0,
        112_120.0,
        "SO14",
    );
    southampton.county_unitary = "Southampton".to_owned();

    let mut postcode = OpenNamesRow::new(
        "SO167QF",
        "SO16 7QF",
        "Postcode",
        441_820.0,
        115_540.0,
        "SO16",
    );
    postcode.populated_place = "Southampton".to_owned();

    vec![
        southampton,
        OpenNamesRow::new(
            "osgb4000000074572393",
            "Winchester",
            "City",
            448_128.0,
            129_353.0,
            "SO23",
        ),
        OpenNamesRow::new(
            "osgb4000000074570761",
            "Romsey",
            "Town",
            435_284.0,
            121_224.0,
            "SO51",
        ),
        postcode,
        OpenNamesRow::new(
            "osgb4000000074549980",
            "Chilworth",
            "Village",
            440_500.0,
            118_400.0,
            "SO16",
        ),
    ]
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Write rows to a temporary CSV laid out like an Open Names tile.
pub fn write_open_names_csv(rows: &[OpenNamesRow], with_header: bool) -> Result<NamedTempFile> {
    info!(rows = rows.len(), with_header, "Writing Open Names test CSV");
    let mut file = NamedTempFile::new()?;
    if with_header {
        writeln!(file, "{}", OPEN_NAMES_COLUMNS.join(","))?;
    }
    for row in rows {
        let line = row
            .fields()
            .iter()
            .map(|field| csv_field(field))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(file, "{line}")?;
    }
    file.flush()?;
    Ok(file)
}

/// Gazetteer records in EPSG:4326 (lon, lat) around Southampton and central London.
///
/// Ids are contiguous from 1, names and types are chosen so that name search,
/// postcode lookup, free text and reverse lookup all have something to find.
pub fn sample_records() -> Vec<GazetteerRecord> {
    vec![
        GazetteerRecord::new(1, "Southampton", LocalType::City, -1.4043, 50.9097)
            .with_postcode_district("SO14")
            .with_county("Southampton")
            .with_region("South East")
            .with_country("England"),
        GazetteerRecord::new(2, "Winchester", LocalType::City, -1.3128, 51.0632)
            .with_postcode_district("SO23")
            .with_county("Hampshire")
            .with_region("South East")
            .with_country("England"),
        GazetteerRecord::new(3, "Romsey", LocalType::Town, -1.4995, 50.9893)
            .with_postcode_district("SO51")
            .with_county("Hampshire")
            .with_region("South East")
            .with_country("England"),
        GazetteerRecord::new(4, "Eastleigh", LocalType::Town, -1.3500, 50.9690)
            .with_postcode_district("SO50")
            .with_county("Hampshire")
            .with_region("South East")
            .with_country("England"),
        GazetteerRecord::new(5, "Chilworth", LocalType::Village, -1.4167, 50.9583)
            .with_postcode_district("SO16")
            .with_county("Hampshire")
            .with_region("South East")
            .with_country("England"),
        GazetteerRecord::new(6, "Portswood", LocalType::SuburbanArea, -1.3936, 50.9230)
            .with_postcode_district("SO17")
            .with_populated_place("Southampton")
            .with_region("South East")
            .with_country("England"),
        GazetteerRecord::new(7, "Winchester Road", LocalType::NamedRoad, -1.4120, 50.9340)
            .with_postcode_district("SO16")
            .with_populated_place("Southampton")
            .with_region("South East")
            .with_country("England"),
        GazetteerRecord::new(8, "SO16 7QF", LocalType::Postcode, -1.4165, 50.9345)
            .with_postcode_district("SO16")
            .with_populated_place("Southampton")
            .with_region("South East")
            .with_country("England"),
        GazetteerRecord::new(9, "SW1A 1AA", LocalType::Postcode, -0.1419, 51.5010)
            .with_postcode_district("SW1A")
            .with_populated_place("London")
            .with_region("London")
            .with_country("England"),
        GazetteerRecord::new(10, "London", LocalType::City, -0.1276, 51.5072)
            .with_region("London")
            .with_country("England"),
        GazetteerRecord::new(11, "Southampton Street", LocalType::NamedRoad, -0.1221, 51.5111)
            .with_postcode_district("WC2E")
            .with_populated_place("London")
            .with_region("London")
            .with_country("England"),
        GazetteerRecord::new(12, "Bassett", LocalType::SuburbanArea, -1.4060, 50.9410)
            .with_postcode_district("SO16")
            .with_populated_place("Southampton")
            .with_region("South East")
            .with_country("England"),
        GazetteerRecord::new(13, "Hursley", LocalType::Village, -1.3960, 51.0260)
            .with_postcode_district("SO21")
            .with_county("Hampshire")
            .with_region("South East")
            .with_country("England"),
    ]
}
