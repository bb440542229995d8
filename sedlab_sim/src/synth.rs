//! Synthetic snapshot generator.
//!
//! Produces the same files the external simulator writes, so the pipeline
//! can be exercised without it:
//! - cells seeded on an X×Y×Z grid with the requested density
//! - energies drawn from a normal distribution, decaying every cycle
//! - positions random-walk inside the grid, charges drift
//!
//! Every draw comes from one ChaCha8 stream, so a seed fully determines the
//! output.

use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use sedlab_core::snapshot::{snapshot_file_name, write_snapshot, SnapshotRecord};
use sedlab_env::{SimulationRequest, VizError};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for one synthetic run.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    /// Master seed
    pub seed: u64,

    /// Grid size, cycle count, density and basename
    pub request: SimulationRequest,

    /// A snapshot is written every `export_interval` cycles
    pub export_interval: u32,

    /// Mean initial energy
    pub energy_mean: f64,

    /// Standard deviation of initial energy
    pub energy_std: f64,

    /// Mean energy lost per cycle
    pub decay_mean: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            request: SimulationRequest::default(),
            export_interval: 10,
            energy_mean: 1.0,
            energy_std: 0.3,
            decay_mean: 0.01,
        }
    }
}

#[derive(Debug, Clone)]
struct Cell {
    position: Vector3<f64>,
    energy: f64,
    charge: f64,
}

/// Seeded cell population stepped one cycle at a time.
pub struct SyntheticWorld {
    rng: ChaCha8Rng,
    bounds: Vector3<f64>,
    cells: Vec<Cell>,
    cycle: u32,
    decay: Normal<f64>,
    drift: Normal<f64>,
}

impl SyntheticWorld {
    /// Seeds the grid. Fails on invalid grid, density or distribution parameters.
    pub fn new(config: &SynthConfig) -> Result<Self, VizError> {
        config.request.validate()?;
        if config.export_interval == 0 {
            return Err(VizError::invalid("export interval must be at least 1"));
        }

        let energy = Normal::new(config.energy_mean, config.energy_std)
            .map_err(|e| VizError::invalid(format!("energy distribution: {}", e)))?;
        let decay = Normal::new(config.decay_mean, config.decay_mean / 2.0)
            .map_err(|e| VizError::invalid(format!("decay distribution: {}", e)))?;
        let drift = Normal::new(0.0, 0.05)
            .map_err(|e| VizError::invalid(format!("charge drift: {}", e)))?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let [sx, sy, sz] = config.request.size;
        let density = config.request.initial_density;

        let mut cells = Vec::new();
        for x in 0..sx {
            for y in 0..sy {
                for z in 0..sz {
                    if rng.gen::<f64>() < density {
                        cells.push(Cell {
                            position: Vector3::new(x as f64, y as f64, z as f64),
                            energy: energy.sample(&mut rng).abs(),
                            charge: rng.gen_range(0.0..1.0),
                        });
                    }
                }
            }
        }

        tracing::debug!("Seeded {} cells on a {}x{}x{} grid", cells.len(), sx, sy, sz);

        Ok(Self {
            rng,
            bounds: Vector3::new((sx - 1) as f64, (sy - 1) as f64, (sz - 1) as f64),
            cells,
            cycle: 0,
            decay,
            drift,
        })
    }

    /// Current cycle (0 before the first step).
    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    /// Number of cells with positive energy.
    pub fn alive(&self) -> usize {
        self.cells.iter().filter(|c| c.energy > 0.0).count()
    }

    /// Advances one cycle. Dead cells stay in place with zero energy.
    pub fn step(&mut self) {
        self.cycle += 1;

        for cell in &mut self.cells {
            if cell.energy <= 0.0 {
                continue;
            }

            let loss = self.decay.sample(&mut self.rng).max(0.0);
            cell.energy = (cell.energy - loss).max(0.0);
            cell.charge = (cell.charge + self.drift.sample(&mut self.rng)).max(0.0);

            let axis = self.rng.gen_range(0..3);
            let delta = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            cell.position[axis] = (cell.position[axis] + delta).clamp(0.0, self.bounds[axis]);
        }
    }

    /// All cells as snapshot records, dead ones included.
    pub fn records(&self) -> Vec<SnapshotRecord> {
        self.cells
            .iter()
            .map(|c| SnapshotRecord::new(c.position.x, c.position.y, c.position.z, c.energy, c.charge))
            .collect()
    }
}

/// Runs the generator and writes `<basename>_cycle_<N>.csv` into `dir`.
///
/// Returns the written paths in cycle order.
pub fn generate(config: &SynthConfig, dir: &Path) -> Result<Vec<PathBuf>, VizError> {
    let mut world = SyntheticWorld::new(config)?;
    fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for _ in 0..config.request.cycles {
        world.step();
        if world.cycle() % config.export_interval == 0 {
            let path = dir.join(snapshot_file_name(&config.request.basename, world.cycle() as u64));
            write_snapshot(&path, &world.records())?;
            tracing::debug!("Cycle {}: {} alive, wrote {}", world.cycle(), world.alive(), path.display());
            written.push(path);
        }
    }

    tracing::info!(
        "Generated {} snapshots for '{}' (seed={})",
        written.len(),
        config.request.basename,
        config.seed
    );
    Ok(written)
}
