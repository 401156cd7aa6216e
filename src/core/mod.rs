pub mod certs;
pub mod credentials;
pub mod errors;
pub mod events;
pub mod models;
pub mod objectives;
