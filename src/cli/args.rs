use clap::{Parser, ArgAction};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "podprobe", version, about = "Probe a host for a pod and discover its service endpoints")]
pub struct Cli {
    /// Host to probe; a bare name gets the default domain (required)
    #[arg(short = 't', long = "target")]
    pub target: String,

    /// Overwrite any existing saved config for this pod
    #[arg(short = 's', long = "overwrite", action = ArgAction::SetTrue)]
    pub overwrite: bool,

    /// Verbose human output
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// Debug logs (implies verbose)
    #[arg(short = 'd', long = "debug", action = ArgAction::SetTrue)]
    pub debug: bool,

    /// Plain narration without progress bars
    #[arg(long = "simple", action = ArgAction::SetTrue)]
    pub simple: bool,

    /// Configuration file to use instead of the default search path
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Directory where discovered pods are saved
    #[arg(long = "home")]
    pub home: Option<PathBuf>,

    #[arg(long = "connect-timeout-ms")]
    pub connect_timeout_ms: Option<u64>,

    /// 0 disables the read timeout
    #[arg(long = "read-timeout-ms")]
    pub read_timeout_ms: Option<u64>,

    /// PEM client certificate chain presented when a server asks for one
    #[arg(long = "cert", requires = "key")]
    pub cert: Option<PathBuf>,

    /// PEM private key for --cert
    #[arg(long = "key", requires = "cert")]
    pub key: Option<PathBuf>,
}
