pub mod classify;
pub mod http;
pub mod probe_executor;
pub mod tls;
pub mod transport;

#[cfg(test)]
pub mod mock;

pub use http::ReqwestTransport;
pub use probe_executor::ProbeExecutor;
