pub mod distribution;

pub use distribution::{run_monte_carlo, MonteCarloInput, MonteCarloOutput};
