//! Turns a loaded [`SimulationSetup`] into live engine objects.

use lvmc_core::error::LatticeError;
use lvmc_core::flow::{FlowError, FlowField};
use lvmc_core::grid::{Grid, Region};
use lvmc_core::lattice::{Lattice, Population};
use lvmc_core::orientation::Orientation;
use lvmc_core::rates::{PropensityPolicy, RateEngine, RateError, RateParams};

use crate::schema::{FlowData, OrientationData, PolicyData, PopulationData, RatesData, SimulationSetup};

/// Errors that can occur while building a simulation from a setup.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Lattice(#[from] LatticeError),
    #[error(transparent)]
    Rates(#[from] RateError),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("unknown spin glyph '{glyph}' at row {row}, column {col}")]
    InvalidGlyph { row: usize, col: usize, glyph: char },
    #[error("spin rows must all have the same length")]
    RaggedSpins,
}

/// A ready-to-run bundle.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub lattice: Lattice,
    pub rates: RateEngine,
    pub flow: Option<FlowField>,
}

impl From<OrientationData> for Orientation {
    fn from(o: OrientationData) -> Self {
        match o {
            OrientationData::Up => Orientation::Up,
            OrientationData::Down => Orientation::Down,
            OrientationData::Left => Orientation::Left,
            OrientationData::Right => Orientation::Right,
        }
    }
}

impl From<PolicyData> for PropensityPolicy {
    fn from(p: PolicyData) -> Self {
        match p {
            PolicyData::AllEvents => PropensityPolicy::AllEvents,
            PolicyData::RotateAndHopOnly => PropensityPolicy::RotateAndHopOnly,
        }
    }
}

/// Parse glyph rows into an orientation grid.
pub fn parse_spins(rows: &[String]) -> Result<Grid<Orientation>, SetupError> {
    let parsed = rows
        .iter()
        .enumerate()
        .map(|(row, line)| {
            line.chars()
                .filter(|c| !c.is_whitespace())
                .enumerate()
                .map(|(col, glyph)| {
                    Orientation::from_glyph(glyph).ok_or(SetupError::InvalidGlyph { row, col, glyph })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;
    Grid::from_rows(parsed).ok_or(SetupError::RaggedSpins)
}

fn population(data: &PopulationData) -> Result<Option<Population>, SetupError> {
    Ok(match data {
        PopulationData::Empty => None,
        PopulationData::Density { density } => Some(Population::ByDensity { density: *density }),
        PopulationData::Spins { rows } => Some(Population::BySpins {
            spins: parse_spins(rows)?,
        }),
        PopulationData::Region {
            x_min,
            x_max,
            y_min,
            y_max,
            orientation,
            n,
        } => Some(Population::ByRegionFlux {
            region: Region::new(*x_min, *x_max, *y_min, *y_max),
            orientation: orientation.map(Orientation::from),
            n: *n,
        }),
    })
}

fn rate_params(data: &RatesData) -> Result<RateParams, RateError> {
    let params = RateParams {
        beta: data.beta,
        v0: data.v0,
        propensity_policy: data.policy.into(),
    };
    params.with_overrides(data.overrides.iter().map(|(k, v)| (k.as_str(), *v)))
}

/// Build the lattice, rate engine and flow field described by `setup`.
pub fn build(setup: &SimulationSetup) -> Result<Simulation, SetupError> {
    let dims = &setup.lattice;
    let mut lattice = Lattice::with_seed(dims.width, dims.height, dims.seed)?;

    for &[x, y] in &setup.obstacles {
        lattice.set_obstacle(x, y)?;
    }
    for &[x, y] in &setup.sinks {
        lattice.set_sink(x, y)?;
    }
    if let Some(population) = population(&setup.population)? {
        lattice.add_particles(population)?;
    }

    let params = rate_params(&setup.rates)?;
    let rates = RateEngine::new(&lattice, params);

    let flow = match setup.flow {
        FlowData::None => None,
        FlowData::Uniform { vx, vy } => Some(FlowField::uniform(dims.width, dims.height, vx, vy)?),
        FlowData::Poiseuille { v1 } => Some(FlowField::poiseuille(dims.width, dims.height, v1)?),
    };
    let flow = match flow {
        Some(mut field) => {
            field.set_obstacles(lattice.obstacles().clone())?;
            Some(field)
        }
        None => None,
    };

    log::debug!(
        "built {}x{} simulation: {} particles, beta={}, v0={}, flow={}",
        dims.width,
        dims.height,
        lattice.n_particles(),
        params.beta,
        params.v0,
        flow.is_some()
    );
    Ok(Simulation {
        lattice,
        rates,
        flow,
    })
}
