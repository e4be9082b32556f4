//! Random-walk message simulator
//!
//! Produces a plausible stream of NMEA 0183 and NMEA 2000 messages for
//! trying the pipeline without a boat.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use marine_sens_types::ParsedMessage;

/// One simulated value drifting inside its bounds
#[derive(Debug, Clone, Copy)]
struct Walk {
    value: f64,
    step: f64,
    min: f64,
    max: f64,
}

impl Walk {
    const fn new(value: f64, step: f64, min: f64, max: f64) -> Self {
        Self { value, step, min, max }
    }

    fn next(&mut self, rng: &mut StdRng) -> f64 {
        self.value = (self.value + rng.gen_range(-self.step..=self.step)).clamp(self.min, self.max);
        self.value
    }
}

pub struct Simulator {
    rng: StdRng,
    depth: Walk,
    wind_speed: Walk,
    wind_angle: Walk,
    battery: Walk,
    current: Walk,
    rpm: Walk,
    coolant: Walk,
    fuel: Walk,
    water: Walk,
    latitude: Walk,
    longitude: Walk,
    ticks: u64,
}

impl Simulator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic stream for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            depth: Walk::new(8.0, 0.3, 0.5, 60.0),
            wind_speed: Walk::new(12.0, 0.8, 0.0, 45.0),
            wind_angle: Walk::new(40.0, 4.0, 0.0, 359.0),
            battery: Walk::new(12.8, 0.05, 11.0, 14.4),
            current: Walk::new(-6.0, 0.5, -40.0, 30.0),
            rpm: Walk::new(1800.0, 40.0, 650.0, 3200.0),
            coolant: Walk::new(80.0, 0.4, 60.0, 105.0),
            fuel: Walk::new(70.0, 0.05, 0.0, 100.0),
            water: Walk::new(16.0, 0.05, 4.0, 30.0),
            latitude: Walk::new(54.35, 0.0005, 54.0, 55.0),
            longitude: Walk::new(10.16, 0.0005, 9.5, 11.0),
            ticks: 0,
        }
    }

    /// Messages for one simulated second
    pub fn next_batch(&mut self, timestamp: i64) -> Vec<ParsedMessage> {
        self.ticks += 1;
        let rng = &mut self.rng;
        let mut batch = vec![
            ParsedMessage::new("SDDPT", timestamp)
                .with("depth", self.depth.next(rng))
                .with("offset", 0.3),
            ParsedMessage::new("WIMWV", timestamp)
                .with("angle", self.wind_angle.next(rng))
                .with("reference", "R")
                .with("speed", self.wind_speed.next(rng))
                .with("speedUnit", "N")
                .with("status", "A"),
            ParsedMessage::new("PGN127508", timestamp)
                .with("instance", 0.0)
                .with("voltage", self.battery.next(rng))
                .with("current", self.current.next(rng)),
            ParsedMessage::new("PGN127488", timestamp)
                .with("instance", 0.0)
                .with("speed", self.rpm.next(rng)),
            ParsedMessage::new("PGN129025", timestamp)
                .with("latitude", self.latitude.next(rng))
                .with("longitude", self.longitude.next(rng)),
        ];

        // slower sensors
        if self.ticks % 5 == 0 {
            batch.push(
                ParsedMessage::new("PGN127489", timestamp)
                    .with("instance", 0.0)
                    .with("temperature", self.coolant.next(rng) + 273.15),
            );
            batch.push(
                ParsedMessage::new("PGN127505", timestamp)
                    .with("instance", 0.0)
                    .with("type", "fuel")
                    .with("level", self.fuel.next(rng))
                    .with("capacity", 200.0),
            );
            batch.push(ParsedMessage::new("YXMTW", timestamp).with("temperature", self.water.next(rng)));
        }
        batch
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}
