//! Simulation law parameters and their `KEY=value` file format.
//!
//! The simulator reads its laws from a plain text file, one parameter per
//! line. Keys keep the simulator's spelling; the struct uses descriptive
//! field names.

use sedlab_env::VizError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Every key, in file order.
pub const KEYS: [&str; 11] = [
    "K_E",
    "K_D",
    "K_C",
    "SEUIL_ENERGIE_DIVISION",
    "FACTEUR_ECHANGE_ENERGIE",
    "SEUIL_DIFFERENCE_ENERGIE",
    "SEUIL_SIMILARITE_R",
    "TAUX_AUGMENTATION_ENNUI",
    "FACTEUR_ECHANGE_PSYCHIQUE",
    "K_M",
    "intervalle_export",
];

/// Laws governing energy, charge and psychic exchange between cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LawParameters {
    /// `K_E`: energy coefficient
    pub energy_gain: f64,
    /// `K_D`: dissipation coefficient
    pub dissipation: f64,
    /// `K_C`: charge coefficient
    pub charge_gain: f64,
    /// `SEUIL_ENERGIE_DIVISION`: energy above which a cell divides
    pub division_threshold: f64,
    /// `FACTEUR_ECHANGE_ENERGIE`: share of energy exchanged with neighbours
    pub energy_exchange: f64,
    /// `SEUIL_DIFFERENCE_ENERGIE`: minimum gap that triggers an exchange
    pub energy_gap_threshold: f64,
    /// `SEUIL_SIMILARITE_R`: similarity threshold on the R state
    pub similarity_threshold: f64,
    /// `TAUX_AUGMENTATION_ENNUI`: boredom growth per cycle
    pub boredom_rate: f64,
    /// `FACTEUR_ECHANGE_PSYCHIQUE`: psychic exchange factor
    pub psychic_exchange: f64,
    /// `K_M`: memory coefficient
    pub memory_gain: f64,
    /// `intervalle_export`: cycles between two snapshot files
    pub export_interval: u32,
}

impl Default for LawParameters {
    fn default() -> Self {
        Self {
            energy_gain: 2.0,
            dissipation: 1.0,
            charge_gain: 0.5,
            division_threshold: 1.8,
            energy_exchange: 0.05,
            energy_gap_threshold: 0.2,
            similarity_threshold: 0.1,
            boredom_rate: 0.001,
            psychic_exchange: 0.1,
            memory_gain: 0.5,
            export_interval: 10,
        }
    }
}

/// Inclusive range accepted for a real-valued key.
fn bounds(key: &str) -> Option<(f64, f64)> {
    match key {
        "K_E" | "K_D" | "K_C" | "K_M" => Some((0.0, 5.0)),
        "SEUIL_ENERGIE_DIVISION" => Some((0.1, 5.0)),
        "FACTEUR_ECHANGE_ENERGIE" | "FACTEUR_ECHANGE_PSYCHIQUE" => Some((0.0, 0.5)),
        "SEUIL_DIFFERENCE_ENERGIE" | "SEUIL_SIMILARITE_R" => Some((0.0, 1.0)),
        "TAUX_AUGMENTATION_ENNUI" => Some((0.0, 0.01)),
        _ => None,
    }
}

impl LawParameters {
    /// Value of `key` as written in the file.
    pub fn get(&self, key: &str) -> Option<f64> {
        let value = match key {
            "K_E" => self.energy_gain,
            "K_D" => self.dissipation,
            "K_C" => self.charge_gain,
            "SEUIL_ENERGIE_DIVISION" => self.division_threshold,
            "FACTEUR_ECHANGE_ENERGIE" => self.energy_exchange,
            "SEUIL_DIFFERENCE_ENERGIE" => self.energy_gap_threshold,
            "SEUIL_SIMILARITE_R" => self.similarity_threshold,
            "TAUX_AUGMENTATION_ENNUI" => self.boredom_rate,
            "FACTEUR_ECHANGE_PSYCHIQUE" => self.psychic_exchange,
            "K_M" => self.memory_gain,
            "intervalle_export" => self.export_interval as f64,
            _ => return None,
        };
        Some(value)
    }

    /// Parses `raw` and stores it under `key`. Range is not checked here.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<(), String> {
        if key == "intervalle_export" {
            self.export_interval = raw
                .parse()
                .map_err(|_| format!("{} expects a positive integer, got '{}'", key, raw))?;
            return Ok(());
        }

        let value: f64 = raw
            .parse()
            .map_err(|_| format!("{} expects a number, got '{}'", key, raw))?;
        let slot = match key {
            "K_E" => &mut self.energy_gain,
            "K_D" => &mut self.dissipation,
            "K_C" => &mut self.charge_gain,
            "SEUIL_ENERGIE_DIVISION" => &mut self.division_threshold,
            "FACTEUR_ECHANGE_ENERGIE" => &mut self.energy_exchange,
            "SEUIL_DIFFERENCE_ENERGIE" => &mut self.energy_gap_threshold,
            "SEUIL_SIMILARITE_R" => &mut self.similarity_threshold,
            "TAUX_AUGMENTATION_ENNUI" => &mut self.boredom_rate,
            "FACTEUR_ECHANGE_PSYCHIQUE" => &mut self.psychic_exchange,
            "K_M" => &mut self.memory_gain,
            _ => return Err(format!("unknown key '{}'", key)),
        };
        *slot = value;
        Ok(())
    }

    /// Checks every value against the range the control surface allows.
    pub fn validate(&self) -> Result<(), VizError> {
        if self.export_interval < 1 {
            return Err(VizError::invalid("intervalle_export must be at least 1"));
        }
        for key in KEYS {
            let Some((lo, hi)) = bounds(key) else {
                continue;
            };
            let value = self.get(key).unwrap_or(f64::NAN);
            if !(lo..=hi).contains(&value) {
                return Err(VizError::invalid(format!(
                    "{} = {} is outside [{}, {}]",
                    key, value, lo, hi
                )));
            }
        }
        Ok(())
    }

    /// Writes the file the simulator reads.
    pub fn write_to_file(&self, path: &Path) -> Result<(), VizError> {
        fs::write(path, self.to_string())?;
        tracing::info!("Law parameters written to {}", path.display());
        Ok(())
    }

    /// Reads a parameter file. Keys absent from the file keep their default.
    pub fn from_file(path: &Path) -> Result<Self, VizError> {
        fs::read_to_string(path)?.parse()
    }
}

impl fmt::Display for LawParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in KEYS {
            if key == "intervalle_export" {
                writeln!(f, "{}={}", key, self.export_interval)?;
            } else if let Some(value) = self.get(key) {
                writeln!(f, "{}={}", key, value)?;
            }
        }
        Ok(())
    }
}

impl FromStr for LawParameters {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut params = Self::default();

        for (index, line) in s.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let config_err = |reason: String| VizError::Config {
                line: index + 1,
                reason,
            };

            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| config_err(format!("expected KEY=value, got '{}'", line)))?;
            params.set(key.trim(), value.trim()).map_err(config_err)?;
        }

        Ok(params)
    }
}
