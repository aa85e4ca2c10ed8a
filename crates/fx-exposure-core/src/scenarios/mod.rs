pub mod shock;

pub use shock::{simulate_shock, simulate_shocks, ShockScenario};
