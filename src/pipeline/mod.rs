pub mod text;
pub mod vectorize;
pub mod safety; // runs first on every request
pub mod classify;
pub mod knowledge;
pub mod context;
pub mod response;

#[cfg(test)]
pub mod fixtures;
