//! Administrative boundary layer: one feature per Peruvian district.

use geo_types::MultiPolygon;
use serde::{Deserialize, Serialize};

use crate::error::ZonalError;
use crate::normalize::normalize;

/// One district feature with its UBIGEO code, hierarchical names, and
/// multipolygon footprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct District {
    /// Unique administrative unit code.
    pub ubigeo: String,
    pub department: String,
    pub province: String,
    pub district: String,
    pub geometry: MultiPolygon<f64>,
}

/// A validated district collection.
///
/// Construction canonicalizes all names through [`normalize`] and enforces
/// the layer invariants: UBIGEO codes are non-empty and unique, geometries
/// are non-empty.
#[derive(Debug, Clone)]
pub struct DistrictLayer {
    districts: Vec<District>,
}

impl DistrictLayer {
    pub fn new(mut districts: Vec<District>) -> Result<Self, ZonalError> {
        let mut seen = std::collections::HashSet::new();
        for d in &mut districts {
            if d.ubigeo.trim().is_empty() {
                return Err(ZonalError::InvalidParameter(format!(
                    "district \"{}\" has an empty UBIGEO code",
                    d.district
                )));
            }
            if !seen.insert(d.ubigeo.clone()) {
                return Err(ZonalError::InvalidParameter(format!(
                    "duplicate UBIGEO code {}",
                    d.ubigeo
                )));
            }
            if d.geometry.0.is_empty() || d.geometry.0.iter().all(|p| p.exterior().0.is_empty()) {
                return Err(ZonalError::InvalidParameter(format!(
                    "district {} has an empty geometry",
                    d.ubigeo
                )));
            }
            d.department = normalize(&d.department);
            d.province = normalize(&d.province);
            d.district = normalize(&d.district);
        }
        Ok(Self { districts })
    }

    pub fn districts(&self) -> &[District] {
        &self.districts
    }

    pub fn len(&self) -> usize {
        self.districts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    fn unit_district(ubigeo: &str, name: &str) -> District {
        District {
            ubigeo: ubigeo.to_string(),
            department: "Junín".to_string(),
            province: "Huancayo".to_string(),
            district: name.to_string(),
            geometry: MultiPolygon(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
                (x: 0.0, y: 1.0),
            ]]),
        }
    }

    #[test]
    fn names_are_normalized_on_ingest() {
        let layer = DistrictLayer::new(vec![unit_district("120101", "Chupaca")]).unwrap();
        let d = &layer.districts()[0];
        assert_eq!(d.department, "JUNIN");
        assert_eq!(d.province, "HUANCAYO");
        assert_eq!(d.district, "CHUPACA");
    }

    #[test]
    fn duplicate_ubigeo_is_rejected() {
        let err = DistrictLayer::new(vec![
            unit_district("120101", "A"),
            unit_district("120101", "B"),
        ])
        .unwrap_err();
        assert!(matches!(err, ZonalError::InvalidParameter(_)));
    }

    #[test]
    fn empty_ubigeo_is_rejected() {
        let err = DistrictLayer::new(vec![unit_district("  ", "A")]).unwrap_err();
        assert!(matches!(err, ZonalError::InvalidParameter(_)));
    }

    #[test]
    fn empty_geometry_is_rejected() {
        let mut d = unit_district("120101", "A");
        d.geometry = MultiPolygon(vec![]);
        assert!(DistrictLayer::new(vec![d]).is_err());
    }
}
