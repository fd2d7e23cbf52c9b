pub mod alerts;
pub mod contacts;
pub mod extract;
pub mod middleware;
