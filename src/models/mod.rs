pub mod brownian;
pub mod monte_carlo;

pub use brownian::DriftCorrection;
pub use monte_carlo::{
    simulate, NormalSource, ReplayDraws, RngNormals, Simulation, SimulationParameters,
    SimulationResult,
};
