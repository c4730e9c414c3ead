use std::fs;
use std::path::Path;

use anyhow::Result;
use geojson::{GeoJson, Geometry, Value};
use tracing::{info, warn};

use crate::geo::Coordinate;
use crate::map::{LineString, Lod, MapRenderer};

/// Load every Natural Earth GeoJSON file found in `data_dir`.
///
/// Returns the number of files loaded. When no coastline data turns up the
/// built-in peninsula outline is used instead.
pub fn load_base_map(renderer: &mut MapRenderer, data_dir: &Path) -> usize {
    let coastline_files = [
        ("ne_110m_coastline.json", Lod::Low),
        ("ne_50m_coastline.json", Lod::Medium),
        ("ne_10m_coastline.json", Lod::High),
    ];
    let border_files = [
        ("ne_50m_borders.json", Lod::Medium),
        ("ne_10m_borders.json", Lod::High),
    ];

    let mut loaded = 0;

    for (filename, lod) in coastline_files {
        let path = data_dir.join(filename);
        if !path.exists() {
            continue;
        }
        match read_lines(&path) {
            Ok(lines) => {
                lines.into_iter().for_each(|l| renderer.add_coastline(l, lod));
                loaded += 1;
            }
            Err(e) => warn!(file = filename, error = %e, "failed to load coastlines"),
        }
    }

    for (filename, lod) in border_files {
        let path = data_dir.join(filename);
        if !path.exists() {
            continue;
        }
        match read_lines(&path) {
            Ok(lines) => {
                lines.into_iter().for_each(|l| renderer.add_border(l, lod));
                loaded += 1;
            }
            Err(e) => warn!(file = filename, error = %e, "failed to load borders"),
        }
    }

    if !renderer.has_data() {
        info!(dir = %data_dir.display(), "no coastline data, using built-in outline");
        generate_peninsula(renderer);
    }

    loaded
}

fn read_lines(path: &Path) -> Result<Vec<LineString>> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content.parse()?;
    Ok(geojson_lines(&geojson))
}

/// Extract every line and polygon exterior ring
pub fn geojson_lines(geojson: &GeoJson) -> Vec<LineString> {
    let mut out = Vec::new();
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    geometry_lines(geometry, &mut out);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                geometry_lines(geometry, &mut out);
            }
        }
        GeoJson::Geometry(geometry) => geometry_lines(geometry, &mut out),
    }
    out
}

/// GeoJSON positions are [lng, lat]
fn to_line(positions: &[Vec<f64>]) -> LineString {
    positions
        .iter()
        .filter_map(|p| match p.as_slice() {
            [lng, lat, ..] => Coordinate::from_lng_lat(*lng, *lat),
            _ => None,
        })
        .collect()
}

fn geometry_lines(geometry: &Geometry, out: &mut Vec<LineString>) {
    match &geometry.value {
        Value::LineString(coords) => out.push(to_line(coords)),
        Value::MultiLineString(lines) => out.extend(lines.iter().map(|l| to_line(l))),
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                out.push(to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                if let Some(exterior) = rings.first() {
                    out.push(to_line(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                geometry_lines(g, out);
            }
        }
        _ => {}
    }
}

/// Built-in Arabian Peninsula coastline, (lng, lat) pairs
const PENINSULA: &[(f64, f64)] = &[
    (34.9, 29.5), (36.0, 27.0), (37.5, 24.5), (39.1, 21.5), (40.5, 19.0),
    (42.3, 16.5), (42.8, 14.0), (43.5, 12.7), (45.0, 12.8), (48.5, 14.0),
    (52.2, 15.6), (55.0, 17.2), (57.0, 18.9), (58.5, 20.5), (59.8, 22.5),
    (58.7, 23.6), (56.4, 24.9), (56.3, 26.3), (55.5, 25.5), (54.0, 24.1),
    (52.0, 24.0), (51.6, 24.6), (51.6, 25.9), (51.0, 26.1), (50.8, 25.0),
    (50.2, 26.3), (49.5, 27.1), (48.5, 28.0), (48.0, 29.9), (47.7, 30.1),
];

/// Approximate Saudi land borders, (lng, lat) pairs
const SAUDI_BORDER: &[(f64, f64)] = &[
    (34.9, 29.5), (36.5, 29.5), (38.0, 30.5), (39.2, 32.2), (42.0, 31.1),
    (44.7, 29.2), (46.5, 29.1), (47.7, 28.5), (48.4, 28.5),
];

pub fn generate_peninsula(renderer: &mut MapRenderer) {
    let outline = |pairs: &[(f64, f64)]| -> LineString {
        pairs
            .iter()
            .filter_map(|&(lng, lat)| Coordinate::from_lng_lat(lng, lat))
            .collect()
    };
    renderer.add_coastline(outline(PENINSULA), Lod::Low);
    renderer.add_border(outline(SAUDI_BORDER), Lod::Medium);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geojson_axis_order() {
        let gj: GeoJson = r#"{"type":"LineString","coordinates":[[46.7,24.6],[46.8,24.7]]}"#
            .parse()
            .unwrap();
        let lines = geojson_lines(&gj);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0][0], Coordinate { lat: 24.6, lng: 46.7 });
    }

    #[test]
    fn test_polygon_exterior_only() {
        let gj: GeoJson = r#"{"type":"Polygon","coordinates":[
            [[0,0],[1,0],[1,1],[0,0]],
            [[0.2,0.2],[0.4,0.2],[0.2,0.4],[0.2,0.2]]
        ]}"#
        .parse()
        .unwrap();
        let lines = geojson_lines(&gj);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 4);
    }

    #[test]
    fn test_missing_dir_falls_back() {
        let mut r = MapRenderer::new();
        let loaded = load_base_map(&mut r, Path::new("/nonexistent/raya-map-data"));
        assert_eq!(loaded, 0);
        assert!(r.has_data());
    }
}
