//! ESRI shapefile reading and writing
//!
//! Geometry and attributes go through the `shapefile` crate; the CRS travels
//! in the `.prj` sidecar as WKT.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::meta::read_prj_sidecar;
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geo_types::{Geometry, LineString, Polygon};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, PolygonRing, Shape};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

/// Read a shapefile (`.shp` with its `.shx` and `.dbf`) into memory.
///
/// The CRS comes from the `.prj` sidecar when present. Null shapes become
/// features without geometry.
pub fn read_shapefile<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let mut reader = shapefile::Reader::from_path(path)?;
    let mut collection = FeatureCollection::with_crs(read_prj_sidecar(path)?);

    for item in reader.iter_shapes_and_records() {
        let (shape, record) = item?;
        let geometry = match shape {
            Shape::NullShape => None,
            shape => Some(
                Geometry::<f64>::try_from(shape).map_err(|e| Error::Shapefile(e.to_string()))?,
            ),
        };

        let fields: HashMap<String, FieldValue> = record.into();
        let properties = fields
            .into_iter()
            .map(|(name, value)| (name, attribute_from_field(value)))
            .collect();

        collection.push(Feature {
            geometry,
            properties,
        });
    }

    debug!(
        "Read {} features from {}",
        collection.len(),
        path.display()
    );
    Ok(collection)
}

fn attribute_from_field(value: FieldValue) -> AttributeValue {
    match value {
        // dBase cannot tell an empty string from a missing one
        FieldValue::Character(Some(s)) if s.trim().is_empty() => AttributeValue::Null,
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => AttributeValue::String(s),
        FieldValue::Numeric(Some(v)) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            AttributeValue::Int(v as i64)
        }
        FieldValue::Numeric(Some(v)) | FieldValue::Double(v) => AttributeValue::Float(v),
        FieldValue::Float(Some(v)) => AttributeValue::Float(v as f64),
        FieldValue::Integer(v) => AttributeValue::Int(v as i64),
        FieldValue::Logical(Some(b)) => AttributeValue::Bool(b),
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None) => AttributeValue::Null,
        other => AttributeValue::String(format!("{:?}", other)),
    }
}

/// dBase column type chosen for a field
#[derive(Debug, Clone, Copy, PartialEq)]
enum Column {
    Integer,
    Float,
    Text,
    Logical,
}

impl Column {
    fn of(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Null => None,
            AttributeValue::Bool(_) => Some(Column::Logical),
            AttributeValue::Int(_) => Some(Column::Integer),
            AttributeValue::Float(_) => Some(Column::Float),
            AttributeValue::String(_) => Some(Column::Text),
        }
    }

    fn field_value(self, value: Option<&AttributeValue>) -> FieldValue {
        match (self, value) {
            (Column::Logical, Some(AttributeValue::Bool(b))) => FieldValue::Logical(Some(*b)),
            (Column::Logical, _) => FieldValue::Logical(None),
            (Column::Integer | Column::Float, Some(v)) => FieldValue::Numeric(v.as_f64()),
            (Column::Integer | Column::Float, None) => FieldValue::Numeric(None),
            (Column::Text, Some(AttributeValue::String(s))) => FieldValue::Character(Some(s.clone())),
            (Column::Text, Some(AttributeValue::Null) | None) => FieldValue::Character(None),
            (Column::Text, Some(other)) => FieldValue::Character(Some(attribute_text(other))),
        }
    }
}

fn attribute_text(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Null => String::new(),
        AttributeValue::Bool(b) => b.to_string(),
        AttributeValue::Int(v) => v.to_string(),
        AttributeValue::Float(v) => v.to_string(),
        AttributeValue::String(s) => s.clone(),
    }
}

/// Column layout for a collection: the first non-null value of each field
/// decides its type, integers widen to floats, anything else mixed becomes
/// text.
fn columns(collection: &FeatureCollection) -> BTreeMap<String, Column> {
    let mut columns: BTreeMap<String, Column> = BTreeMap::new();
    for feature in collection.iter() {
        for (name, value) in &feature.properties {
            let Some(kind) = Column::of(value) else {
                continue;
            };
            columns
                .entry(name.clone())
                .and_modify(|current| {
                    *current = match (*current, kind) {
                        (a, b) if a == b => a,
                        (Column::Integer, Column::Float) | (Column::Float, Column::Integer) => {
                            Column::Float
                        }
                        _ => Column::Text,
                    }
                })
                .or_insert(kind);
        }
    }
    // Fields that are null everywhere are still written, as text
    for name in collection.field_names() {
        columns.entry(name.to_string()).or_insert(Column::Text);
    }
    columns
}

fn to_shape_polygon(polygon: &Polygon<f64>) -> Vec<PolygonRing<Point>> {
    let ring_points = |ring: &LineString<f64>| -> Vec<Point> {
        ring.coords().map(|c| Point::new(c.x, c.y)).collect()
    };
    let mut rings = vec![PolygonRing::Outer(ring_points(polygon.exterior()))];
    rings.extend(
        polygon
            .interiors()
            .iter()
            .map(|ring| PolygonRing::Inner(ring_points(ring))),
    );
    rings
}

/// Write a polygon collection as a shapefile.
///
/// Only `Polygon` and `MultiPolygon` geometries are accepted. A `.prj` is
/// written when the collection's CRS carries WKT.
pub fn write_shapefile<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    let path = path.as_ref().with_extension("shp");
    let columns = columns(collection);

    let mut table = TableWriterBuilder::new();
    for (name, column) in &columns {
        let field = FieldName::try_from(name.as_str())
            .map_err(|e| Error::Shapefile(format!("invalid field name {:?}: {:?}", name, e)))?;
        table = match column {
            Column::Integer => table.add_numeric_field(field, 18, 0),
            Column::Float => table.add_numeric_field(field, 24, 10),
            Column::Text => table.add_character_field(field, 254),
            Column::Logical => table.add_logical_field(field),
        };
    }

    {
        let mut writer = shapefile::Writer::from_path(&path, table)?;
        for (idx, feature) in collection.iter().enumerate() {
            let rings = match &feature.geometry {
                Some(Geometry::Polygon(p)) => to_shape_polygon(p),
                Some(Geometry::MultiPolygon(mp)) => mp.iter().flat_map(to_shape_polygon).collect(),
                other => {
                    return Err(Error::UnsupportedDataType(format!(
                        "feature {} has non-polygon geometry {:?}",
                        idx,
                        other.as_ref().map(geometry_kind)
                    )))
                }
            };

            let mut record = Record::default();
            for (name, column) in &columns {
                record.insert(name.clone(), column.field_value(feature.get_property(name)));
            }
            writer.write_shape_and_record(&shapefile::Polygon::with_rings(rings), &record)?;
        }
    }

    if let Some(wkt) = collection.crs().and_then(CRS::wkt) {
        std::fs::write(path.with_extension("prj"), wkt)?;
    }

    debug!("Wrote {} features to {}", collection.len(), path.display());
    Ok(())
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
