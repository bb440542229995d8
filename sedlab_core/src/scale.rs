//! Global Scale Estimator
//! ======================
//!
//! One full pass over every parsed snapshot of a run, producing the bounds
//! that keep all frames visually comparable:
//! - **max_coord**: one spatial bound shared by x, y and z
//! - **max_energy**: divisor for the color scale
//! - **max_charge**: divisor for the marker size
//!
//! Bounds cover *all* records, dead ones included, while the renderer only
//! draws alive records.

use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

/// Run-wide normalization bounds.
///
/// Fields are private: a scale is only built through [`GlobalScale::estimate`]
/// or [`GlobalScale::from_maxima`], both of which guarantee that
/// `max_energy()` and `max_charge()` are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalScale {
    max_coord: f64,
    max_energy: f64,
    max_charge: f64,
    snapshots: usize,
    records: usize,
}

impl GlobalScale {
    /// Computes the bounds over every record of every snapshot.
    ///
    /// Maxima start at zero, so an empty run yields a coordinate bound of 0
    /// and unit energy/charge divisors.
    pub fn estimate(snapshots: &[Snapshot]) -> Self {
        let mut max_coord = 0.0_f64;
        let mut max_energy = 0.0_f64;
        let mut max_charge = 0.0_f64;
        let mut records = 0;

        for snapshot in snapshots {
            for record in &snapshot.records {
                max_coord = max_coord.max(record.position.max());
                max_energy = max_energy.max(record.energy);
                max_charge = max_charge.max(record.charge);
            }
            records += snapshot.records.len();
        }

        let scale = Self {
            snapshots: snapshots.len(),
            records,
            ..Self::from_maxima(max_coord, max_energy, max_charge)
        };

        tracing::info!(
            "Global scale: max_coord={:.3} max_energy={:.3} max_charge={:.3} ({} records in {} snapshots)",
            scale.max_coord,
            scale.max_energy,
            scale.max_charge,
            scale.records,
            scale.snapshots
        );

        scale
    }

    /// Builds a scale from raw maxima, replacing non-positive energy or
    /// charge maxima with 1.0.
    pub fn from_maxima(max_coord: f64, max_energy: f64, max_charge: f64) -> Self {
        Self {
            max_coord: if max_coord.is_finite() { max_coord } else { 0.0 },
            max_energy: guard_divisor(max_energy),
            max_charge: guard_divisor(max_charge),
            snapshots: 0,
            records: 0,
        }
    }

    /// Largest coordinate seen on any axis.
    pub fn max_coord(&self) -> f64 {
        self.max_coord
    }

    pub fn max_energy(&self) -> f64 {
        self.max_energy
    }

    pub fn max_charge(&self) -> f64 {
        self.max_charge
    }

    /// Upper bound used for all three axes: `[0, max_coord + 1]`.
    pub fn axis_limit(&self) -> f64 {
        self.max_coord + 1.0
    }

    /// Energy divided by the run maximum. Not clamped.
    pub fn normalized_energy(&self, energy: f64) -> f64 {
        energy / self.max_energy
    }

    /// Charge divided by the run maximum. Not clamped.
    pub fn normalized_charge(&self, charge: f64) -> f64 {
        charge / self.max_charge
    }

    /// Number of snapshots that contributed.
    pub fn snapshots(&self) -> usize {
        self.snapshots
    }

    /// Number of records that contributed.
    pub fn records(&self) -> usize {
        self.records
    }
}

fn guard_divisor(value: f64) -> f64 {
    if value > 0.0 && value.is_finite() {
        value
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotRecord;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn snapshot(cycle: u64, records: Vec<SnapshotRecord>) -> Snapshot {
        Snapshot {
            cycle,
            source: PathBuf::from(format!("s_cycle_{}.csv", cycle)),
            records,
        }
    }

    #[test]
    fn test_shared_coordinate_bound() {
        let snaps = vec![
            snapshot(1, vec![SnapshotRecord::new(3.0, 1.0, 0.0, 1.0, 0.2)]),
            snapshot(2, vec![SnapshotRecord::new(0.0, 0.0, 9.0, 0.5, 0.8)]),
        ];
        let scale = GlobalScale::estimate(&snaps);

        assert_relative_eq!(scale.max_coord(), 9.0);
        assert_relative_eq!(scale.axis_limit(), 10.0);
        assert_relative_eq!(scale.max_energy(), 1.0);
        assert_relative_eq!(scale.max_charge(), 0.8);
        assert_eq!(scale.snapshots(), 2);
        assert_eq!(scale.records(), 2);
    }

    #[test]
    fn test_dead_records_count_toward_bounds() {
        // The dead cell has the largest coordinate and charge
        let snaps = vec![snapshot(
            1,
            vec![
                SnapshotRecord::new(1.0, 1.0, 1.0, 0.5, 0.1),
                SnapshotRecord::new(20.0, 0.0, 0.0, 0.0, 4.0),
            ],
        )];
        let scale = GlobalScale::estimate(&snaps);
        assert_relative_eq!(scale.max_coord(), 20.0);
        assert_relative_eq!(scale.max_charge(), 4.0);
        assert_relative_eq!(scale.max_energy(), 0.5);
    }

    #[test]
    fn test_zero_maxima_replaced() {
        let snaps = vec![snapshot(1, vec![SnapshotRecord::new(2.0, 2.0, 2.0, 0.0, 0.0)])];
        let scale = GlobalScale::estimate(&snaps);
        assert_relative_eq!(scale.max_energy(), 1.0);
        assert_relative_eq!(scale.max_charge(), 1.0);
    }

    #[test]
    fn test_empty_run() {
        let scale = GlobalScale::estimate(&[]);
        assert_relative_eq!(scale.max_coord(), 0.0);
        assert_relative_eq!(scale.axis_limit(), 1.0);
        assert_relative_eq!(scale.max_energy(), 1.0);
        assert_relative_eq!(scale.max_charge(), 1.0);
    }

    #[test]
    fn test_normalization_not_clamped() {
        let scale = GlobalScale::from_maxima(5.0, 2.0, 0.5);
        assert_relative_eq!(scale.normalized_energy(3.0), 1.5);
        assert_relative_eq!(scale.normalized_charge(0.25), 0.5);
    }

    proptest! {
        #[test]
        fn prop_divisors_strictly_positive(
            rows in proptest::collection::vec(
                (0.0f64..50.0, 0.0f64..50.0, 0.0f64..50.0, -2.0f64..2.0, 0.0f64..3.0),
                0..40,
            ),
            zero_energy in any::<bool>(),
            zero_charge in any::<bool>(),
        ) {
            let records = rows
                .into_iter()
                .map(|(x, y, z, e, c)| {
                    SnapshotRecord::new(
                        x,
                        y,
                        z,
                        if zero_energy { 0.0 } else { e },
                        if zero_charge { 0.0 } else { c },
                    )
                })
                .collect();
            let scale = GlobalScale::estimate(&[snapshot(1, records)]);
            prop_assert!(scale.max_energy() > 0.0);
            prop_assert!(scale.max_charge() > 0.0);
            prop_assert!(scale.axis_limit() >= 1.0);
        }
    }
}
