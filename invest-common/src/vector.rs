//! Lightweight vector file probing.
//!
//! The workbench only needs two facts about a vector: the names of its
//! attribute fields (to fill dropdowns) and whether its geometries may be
//! points. Both are read from file headers or property maps without
//! materializing geometries.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use serde::de::IgnoredAny;
use serde::Deserialize;
use shapefile::ShapeType;

/// Name dbase gives the per-record deletion marker in some field listings.
const DELETION_FLAG_FIELD: &str = "DeletionFlag";

/// Errors raised while probing a vector file.
#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    #[error("Unsupported vector format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid GeoJSON: {0}")]
    GeoJson(#[from] serde_json::Error),

    #[error("Invalid shapefile: {0}")]
    Shapefile(String),
}

/// Vector formats that can be probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    GeoJson,
    Shapefile,
}

impl VectorFormat {
    /// Guess the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "geojson" | "json" => Some(VectorFormat::GeoJson),
            "shp" => Some(VectorFormat::Shapefile),
            _ => None,
        }
    }
}

/// Attribute field names of the vector's first layer.
pub fn column_names(path: &Path) -> Result<Vec<String>, VectorError> {
    match detect(path)? {
        VectorFormat::GeoJson => {
            let doc = read_geojson(path)?;
            let mut names = IndexSet::new();
            for feature in doc.features() {
                if let Some(properties) = &feature.properties {
                    names.extend(properties.keys().cloned());
                }
            }
            Ok(names.into_iter().collect())
        }
        VectorFormat::Shapefile => {
            let dbf_path = path.with_extension("dbf");
            let reader = shapefile::dbase::Reader::from_path(&dbf_path)
                .map_err(|e| VectorError::Shapefile(e.to_string()))?;
            Ok(reader
                .fields()
                .iter()
                .map(|field| field.name().to_string())
                .filter(|name| name != DELETION_FLAG_FIELD)
                .collect())
        }
    }
}

/// Whether the vector's layer may hold point geometries.
///
/// Layers of unknown or mixed geometry type count as possibly holding points.
pub fn may_contain_points(path: &Path) -> Result<bool, VectorError> {
    match detect(path)? {
        VectorFormat::GeoJson => {
            let doc = read_geojson(path)?;
            let kinds: HashSet<&str> = doc
                .features()
                .iter()
                .filter_map(|feature| feature.geometry.as_ref())
                .map(|geometry| geometry.kind.as_str())
                .collect();
            if kinds.len() != 1 {
                return Ok(true);
            }
            // A collection may nest points of its own.
            Ok(kinds
                .iter()
                .all(|kind| matches!(*kind, "Point" | "MultiPoint" | "GeometryCollection")))
        }
        VectorFormat::Shapefile => {
            let reader = shapefile::ShapeReader::from_path(path)
                .map_err(|e| VectorError::Shapefile(e.to_string()))?;
            Ok(matches!(
                reader.header().shape_type,
                ShapeType::NullShape
                    | ShapeType::Point
                    | ShapeType::PointM
                    | ShapeType::PointZ
                    | ShapeType::Multipoint
                    | ShapeType::MultipointM
                    | ShapeType::MultipointZ
            ))
        }
    }
}

fn detect(path: &Path) -> Result<VectorFormat, VectorError> {
    VectorFormat::from_path(path)
        .ok_or_else(|| VectorError::UnsupportedFormat(path.display().to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonDocument {
    FeatureCollection { features: Vec<GeoJsonFeature> },
    Feature(GeoJsonFeature),
}

impl GeoJsonDocument {
    fn features(&self) -> &[GeoJsonFeature] {
        match self {
            GeoJsonDocument::FeatureCollection { features } => features,
            GeoJsonDocument::Feature(feature) => std::slice::from_ref(feature),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeoJsonFeature {
    #[serde(default)]
    geometry: Option<GeometryHeader>,
    #[serde(default)]
    properties: Option<IndexMap<String, IgnoredAny>>,
}

#[derive(Debug, Deserialize)]
struct GeometryHeader {
    #[serde(rename = "type")]
    kind: String,
}

fn read_geojson(path: &Path) -> Result<GeoJsonDocument, VectorError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
