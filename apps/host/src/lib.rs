// Library exports for the host and client binaries and their tests.

pub mod cad;
pub mod cli;
pub mod composition;
pub mod error;
pub mod logger;
pub mod paths;

#[cfg(test)]
mod tests;
