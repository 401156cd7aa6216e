//! Well-known paths and payloads of a pod deployment.

pub const WEB_ROOT: &str = "/";
pub const POD_CLIENT_PATH: &str = "/client/index.html";
pub const POD_HEALTHCHECK_PATH: &str = "/webcontroller/HealthCheck/aggregated";
pub const CHECK_AUTH_PATH: &str = "/login/checkauth?type=user";
pub const POD_INFO_PATH: &str = "/webcontroller/public/podInfo";
pub const RELAY_PATH: &str = "/relay";

pub const SESSION_AUTH_BASE: &str = "/sessionauth";
pub const KEY_AUTH_BASE: &str = "/keyauth";
pub const AUTHENTICATE_PATH: &str = "/v1/authenticate";

pub const POD_API_BASE: &str = "/pod";
pub const SESSION_INFO_PATH: &str = "/v2/sessioninfo";

pub const AGENT_BASE: &str = "/agent";
pub const AGENT_ECHO_PATH: &str = "/v1/util/echo";
pub const AGENT_ECHO_BODY: &str = r#"{ "message": "Hello World"}"#;

pub const TOKEN_TAG: &str = "token";
pub const CHECK_AUTH_KEY_MANAGER: &str = "keymanagerUrl";
pub const POD_INFO_DATA: &str = "data";
pub const POD_INFO_POD_ID: &str = "podId";
pub const POD_INFO_KEY_MANAGER: &str = "keyManagerUrl";

/// Status codes the health check answers with; an unhealthy pod says 500.
pub const HEALTHCHECK_STATUS: &[u16] = &[200, 500];
pub const CHECK_AUTH_STATUS: &[u16] = &[200, 401];
