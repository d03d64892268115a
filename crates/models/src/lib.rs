pub mod errors;
pub mod db;
pub mod customer;
pub mod service;
pub mod appointment;
pub mod billing;

#[cfg(test)]
mod tests;
