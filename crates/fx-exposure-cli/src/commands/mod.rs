pub mod exposure;
pub mod monte_carlo;
pub mod scenarios;
