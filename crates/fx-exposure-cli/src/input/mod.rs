pub mod csv_in;
pub mod rates;
pub mod stdin;
