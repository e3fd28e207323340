//! Layered flight plan construction.

use serde::{Deserialize, Serialize};

use crate::config::MissionConfig;
use crate::error::ConfigError;
use crate::models::{StarLayer, Waypoint};

/// Ordered star layers, each lower and smaller than the one before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightPlan {
    pub approach_speed_mps: f64,
    pub cruise_speed_mps: f64,
    pub layers: Vec<StarLayer>,
}

impl FlightPlan {
    /// Expand the configured first layer across `config.layers` layers.
    ///
    /// Each layer after the first drops by the altitude decrement (never below
    /// the safety floor) and scales both radii of the previous layer by the
    /// decay factor, so decay compounds.
    pub fn build(config: &MissionConfig) -> Result<Self, ConfigError> {
        config.validate_geometry()?;

        let mut layers = Vec::with_capacity(config.layers as usize);
        let mut altitude = config.initial_altitude_m;
        let mut outer = config.outer_radius_m;
        let mut inner = config.inner_radius_m;

        for index in 0..config.layers {
            if index > 0 {
                altitude = (altitude - config.altitude_decrement_m).max(config.altitude_floor_m);
                outer *= config.radius_decay;
                inner *= config.radius_decay;
            }
            layers.push(StarLayer::new(index, altitude, outer, inner));
        }

        Ok(Self {
            approach_speed_mps: config.approach_speed_mps,
            cruise_speed_mps: config.cruise_speed_mps,
            layers,
        })
    }

    pub fn layers(&self) -> &[StarLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Waypoints of one layer with this plan's speed profile.
    pub fn layer_waypoints(&self, layer: &StarLayer) -> Vec<Waypoint> {
        layer.waypoints(self.approach_speed_mps, self.cruise_speed_mps)
    }

    /// Every waypoint of the plan in flight order.
    pub fn waypoints(&self) -> impl Iterator<Item = Waypoint> + '_ {
        self.layers
            .iter()
            .flat_map(move |layer| self.layer_waypoints(layer))
    }

    pub fn total_waypoints(&self) -> usize {
        self.layers.iter().map(|layer| layer.points.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(layers: u32) -> MissionConfig {
        MissionConfig { layers, ..MissionConfig::default() }
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "expected {:?}, got {:?}", expected, actual);
        }
    }

    #[test]
    fn test_layer_altitudes_descend() {
        let plan = FlightPlan::build(&config(3)).unwrap();
        let altitudes: Vec<f64> = plan.layers().iter().map(|l| l.altitude_m).collect();

        assert_eq!(altitudes, vec![30.0, 25.0, 20.0]);
    }

    #[test]
    fn test_layer_radii_compound() {
        let plan = FlightPlan::build(&config(3)).unwrap();
        let outer: Vec<f64> = plan.layers().iter().map(|l| l.outer_radius_m).collect();
        let inner: Vec<f64> = plan.layers().iter().map(|l| l.inner_radius_m).collect();

        assert_close(&outer, &[50.0, 40.0, 32.0]);
        assert_close(&inner, &[28.0, 22.4, 17.92]);
    }

    #[test]
    fn test_altitude_clamps_at_floor() {
        let plan = FlightPlan::build(&config(20)).unwrap();
        let altitudes: Vec<f64> = plan.layers().iter().map(|l| l.altitude_m).collect();

        assert_eq!(&altitudes[..6], &[30.0, 25.0, 20.0, 15.0, 10.0, 5.0]);
        assert!(altitudes[5..].iter().all(|&alt| alt == 5.0));
        assert!(altitudes.iter().all(|&alt| alt >= 5.0));
    }

    #[test]
    fn test_floor_clamps_uneven_decrement() {
        let config = MissionConfig {
            initial_altitude_m: 12.0,
            altitude_decrement_m: 4.0,
            layers: 4,
            ..MissionConfig::default()
        };
        let plan = FlightPlan::build(&config).unwrap();
        let altitudes: Vec<f64> = plan.layers().iter().map(|l| l.altitude_m).collect();

        assert_eq!(altitudes, vec![12.0, 8.0, 5.0, 5.0]);
    }

    #[test]
    fn test_layers_are_indexed_and_closed() {
        let plan = FlightPlan::build(&config(3)).unwrap();

        for (i, layer) in plan.layers().iter().enumerate() {
            assert_eq!(layer.index as usize, i);
            assert_eq!(layer.points[0], layer.points[12]);
        }
    }

    #[test]
    fn test_plan_waypoint_sequence() {
        let plan = FlightPlan::build(&config(2)).unwrap();
        let waypoints: Vec<Waypoint> = plan.waypoints().collect();

        assert_eq!(waypoints.len(), 26);
        assert_eq!(plan.total_waypoints(), 26);
        assert_eq!(waypoints[0].speed_mps, Some(15.0));
        assert_eq!(waypoints[1].speed_mps, Some(8.0));
        assert_eq!(waypoints[13].speed_mps, Some(15.0));
        assert_eq!(waypoints[13].altitude_m, 25.0);
    }

    #[test]
    fn test_invalid_config_builds_nothing() {
        assert_eq!(FlightPlan::build(&config(0)), Err(ConfigError::NoLayers));

        let config = MissionConfig { outer_radius_m: 0.0, ..MissionConfig::default() };
        assert!(FlightPlan::build(&config).is_err());
    }

    #[test]
    fn test_plan_serializes() {
        let plan = FlightPlan::build(&config(1)).unwrap();
        let json = serde_json::to_value(&plan).unwrap();

        assert_eq!(json["layers"].as_array().unwrap().len(), 1);
        assert_eq!(json["layers"][0]["points"].as_array().unwrap().len(), 13);
    }
}
