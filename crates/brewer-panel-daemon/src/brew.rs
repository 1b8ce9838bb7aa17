//! Read-only view of the brewer state consumed by the display.

#![allow(dead_code)]

use std::fmt;

/// Lowest button sensitivity setting.
pub const BUTTON_SENSITIVITY_MIN: u8 = 0;
/// Highest button sensitivity setting.
pub const BUTTON_SENSITIVITY_MAX: u8 = 7;

/// Stage of the brew cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrewStage {
    #[default]
    NotStarted,
    Starting,
    InsertWater,
    AdjustingTemperature,
    Blooming,
    Pouring,
    Draining,
    Finished,
}

impl BrewStage {
    /// Short label shown on the status line.
    pub fn label(&self) -> &'static str {
        match self {
            BrewStage::NotStarted => "READY",
            BrewStage::Starting => "STARTING",
            BrewStage::InsertWater => "ADD WATER",
            BrewStage::AdjustingTemperature => "HEATING",
            BrewStage::Blooming => "BLOOMING",
            BrewStage::Pouring => "POURING",
            BrewStage::Draining => "DRAINING",
            BrewStage::Finished => "DONE",
        }
    }
}

impl fmt::Display for BrewStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Quantities a widget can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    BrewElapsed,
    ButtonSensitivity,
    ContainerTemperature,
    FunnelWaterLevel,
}

/// A quantity resolved to its current value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundQuantity {
    BrewElapsed { elapsed_ms: u32, brew_time_s: u16 },
    ButtonSensitivity(u8),
    /// Degrees Celsius.
    ContainerTemperature(f32),
    FunnelWaterLevel(i32),
}

impl BoundQuantity {
    pub fn quantity(&self) -> Quantity {
        match self {
            BoundQuantity::BrewElapsed { .. } => Quantity::BrewElapsed,
            BoundQuantity::ButtonSensitivity(_) => Quantity::ButtonSensitivity,
            BoundQuantity::ContainerTemperature(_) => Quantity::ContainerTemperature,
            BoundQuantity::FunnelWaterLevel(_) => Quantity::FunnelWaterLevel,
        }
    }
}

/// Point-in-time copy of the brewer state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BrewSnapshot {
    pub stage: BrewStage,
    pub elapsed_ms: u32,
    /// Target brew time in seconds.
    pub brew_time_s: u16,
    pub button_sensitivity: u8,
    pub container_temperature: f32,
    pub funnel_water_level: i32,
}

impl BrewSnapshot {
    /// Resolves a quantity against this snapshot.
    pub fn bind(&self, quantity: Quantity) -> BoundQuantity {
        match quantity {
            Quantity::BrewElapsed => BoundQuantity::BrewElapsed {
                elapsed_ms: self.elapsed_ms,
                brew_time_s: self.brew_time_s,
            },
            Quantity::ButtonSensitivity => BoundQuantity::ButtonSensitivity(self.button_sensitivity),
            Quantity::ContainerTemperature => {
                BoundQuantity::ContainerTemperature(self.container_temperature)
            }
            Quantity::FunnelWaterLevel => BoundQuantity::FunnelWaterLevel(self.funnel_water_level),
        }
    }

    /// Remaining brew time as `M:SS`.
    pub fn remaining_text(&self) -> String {
        let total_ms = u32::from(self.brew_time_s) * 1000;
        let remaining_s = total_ms.saturating_sub(self.elapsed_ms).div_ceil(1000);
        format!("{}:{:02}", remaining_s / 60, remaining_s % 60)
    }
}

/// Brew cycle driven by wall-clock time, standing in for the controller.
#[derive(Debug, Clone)]
pub struct SimulatedBrew {
    brew_time_s: u16,
    bloom_time_s: u16,
    button_sensitivity: u8,
    start_temperature: f32,
    target_temperature: f32,
}

impl SimulatedBrew {
    /// Lead-in before the brew timer starts: starting, water, heating.
    const PREPARE_MS: u32 = 3000;

    pub fn new(brew_time_s: u16, bloom_time_s: u16, target_temperature: f32) -> Self {
        Self {
            brew_time_s,
            bloom_time_s: bloom_time_s.min(brew_time_s),
            button_sensitivity: 4,
            start_temperature: 20.0,
            target_temperature,
        }
    }

    pub fn with_button_sensitivity(mut self, sensitivity: u8) -> Self {
        self.button_sensitivity = sensitivity.min(BUTTON_SENSITIVITY_MAX);
        self
    }

    /// State `since_start_ms` after the start button was pressed.
    pub fn snapshot(&self, since_start_ms: u32) -> BrewSnapshot {
        let third = Self::PREPARE_MS / 3;
        let brew_ms = u32::from(self.brew_time_s) * 1000;
        let bloom_ms = u32::from(self.bloom_time_s) * 1000;
        let elapsed_ms = since_start_ms.saturating_sub(Self::PREPARE_MS).min(brew_ms);

        let stage = match since_start_ms {
            t if t < third => BrewStage::Starting,
            t if t < 2 * third => BrewStage::InsertWater,
            t if t < Self::PREPARE_MS => BrewStage::AdjustingTemperature,
            _ if elapsed_ms >= brew_ms => BrewStage::Finished,
            _ if elapsed_ms < bloom_ms => BrewStage::Blooming,
            _ if elapsed_ms < brew_ms - brew_ms / 5 => BrewStage::Pouring,
            _ => BrewStage::Draining,
        };

        let heat = (since_start_ms as f32 / Self::PREPARE_MS as f32).min(1.0);
        let water_level = match stage {
            BrewStage::NotStarted | BrewStage::Starting => 0,
            BrewStage::InsertWater | BrewStage::AdjustingTemperature | BrewStage::Blooming => 100,
            BrewStage::Pouring | BrewStage::Draining => {
                let span = brew_ms.saturating_sub(bloom_ms).max(1);
                let used = elapsed_ms.saturating_sub(bloom_ms);
                100 - (used * 100 / span).min(100) as i32
            }
            BrewStage::Finished => 0,
        };

        BrewSnapshot {
            stage,
            elapsed_ms,
            brew_time_s: self.brew_time_s,
            button_sensitivity: self.button_sensitivity,
            container_temperature: self.start_temperature
                + (self.target_temperature - self.start_temperature) * heat,
            funnel_water_level: water_level,
        }
    }
}
