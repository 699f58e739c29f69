use crate::geo::haversine_km;
use crate::models::geofence::GeofenceZone;
use crate::models::professional::GeoPoint;

pub trait ZoneDirectory: Send + Sync {
    fn zones(&self) -> Vec<GeofenceZone>;

    fn zones_containing(&self, point: &GeoPoint) -> Vec<GeofenceZone> {
        self.zones()
            .into_iter()
            .filter(|zone| haversine_km(&zone.center, point) <= zone.radius_km)
            .collect()
    }
}

#[derive(Debug, Default, Clone)]
pub struct StaticZones {
    zones: Vec<GeofenceZone>,
}

impl StaticZones {
    pub fn new(zones: Vec<GeofenceZone>) -> Self {
        Self { zones }
    }
}

impl ZoneDirectory for StaticZones {
    fn zones(&self) -> Vec<GeofenceZone> {
        self.zones.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_inside_radius_is_contained() {
        let directory = StaticZones::new(vec![GeofenceZone {
            id: "cbd".to_string(),
            name: "Sydney CBD".to_string(),
            center: GeoPoint::new(-33.8688, 151.2093),
            radius_km: 1.0,
        }]);

        assert_eq!(
            directory
                .zones_containing(&GeoPoint::new(-33.8700, 151.2100))
                .len(),
            1
        );
        assert!(directory
            .zones_containing(&GeoPoint::new(-33.8915, 151.2767))
            .is_empty());
    }
}
