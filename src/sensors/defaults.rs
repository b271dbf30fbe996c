// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Built-in plant catalogue

use super::model::SensorSpec;

/// Sensors of the reference extrusion plant, in line order
pub fn default_sensors() -> Vec<SensorSpec> {
    vec![
        // Melting
        SensorSpec::new("Furnace-01", "Temperature", 1200.0, 10.0, 20.0),
        SensorSpec::new("Furnace-01", "Pressure", 100.0, 2.0, 5.0),
        SensorSpec::new("Furnace-02", "Temperature", 1200.0, 10.0, 20.0),
        SensorSpec::new("Furnace-02", "Pressure", 100.0, 2.0, 5.0),
        // Feeding
        SensorSpec::new("Rod-Feeder-01", "Temperature", 200.0, 3.0, 8.0),
        SensorSpec::new("Rod-Feeder-01", "Speed", 50.0, 1.0, 3.0),
        // Ultrasonic testing
        SensorSpec::new("UT-01", "Temperature", 25.0, 1.0, 2.0),
        SensorSpec::new("UT-01", "Accuracy", 98.0, 0.5, 1.0),
        // Casting
        SensorSpec::new("Casting-Machine-01", "Temperature", 800.0, 5.0, 10.0),
        SensorSpec::new("Casting-Machine-01", "Pressure", 150.0, 2.0, 5.0),
        SensorSpec::new("Casting-Machine-01", "Speed", 30.0, 1.0, 3.0),
        // Cooling towers
        SensorSpec::new("CT-01", "Temperature", 80.0, 2.0, 5.0),
        SensorSpec::new("CT-01", "FlowRate", 200.0, 5.0, 10.0),
        SensorSpec::new("CT-02", "Temperature", 80.0, 2.0, 5.0),
        SensorSpec::new("CT-02", "FlowRate", 200.0, 5.0, 10.0),
        SensorSpec::new("CT-03", "Temperature", 80.0, 2.0, 5.0),
        SensorSpec::new("CT-03", "FlowRate", 200.0, 5.0, 10.0),
        SensorSpec::new("CT-04", "Temperature", 80.0, 2.0, 5.0),
        SensorSpec::new("CT-04", "FlowRate", 200.0, 5.0, 10.0),
        // Homogenizing
        SensorSpec::new("Homogenizing-01", "Temperature", 500.0, 5.0, 10.0),
        SensorSpec::new("Homogenizing-01", "Pressure", 120.0, 2.0, 5.0),
        // Charging
        SensorSpec::new("Charging-Machine-01", "Temperature", 300.0, 3.0, 8.0),
        SensorSpec::new("Charging-Machine-01", "LoadCapacity", 500.0, 10.0, 20.0),
        // Swarf handling
        SensorSpec::new("Swarf-01", "Temperature", 150.0, 2.0, 5.0),
        SensorSpec::new("Swarf-01", "Volume", 100.0, 5.0, 10.0),
        // Sawing
        SensorSpec::new("Sawing-01", "Temperature", 100.0, 2.0, 5.0),
        SensorSpec::new("Sawing-01", "BladeSpeed", 200.0, 5.0, 10.0),
        SensorSpec::new("Sawing-01", "Pressure", 80.0, 2.0, 5.0),
        // Weighing
        SensorSpec::new("Weightning-01", "Weight", 1000.0, 10.0, 20.0),
        SensorSpec::new("Weightning-01", "Accuracy", 99.5, 0.1, 0.5),
    ]
}
