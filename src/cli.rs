use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay server, accepting XMLSocket TCP connections.
    Serve(ServeArgs),
    /// Connect to a relay and exchange frames from the terminal.
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Socket address the relay should bind to. Use port 0 for an ephemeral port.
    #[arg(long, default_value = "0.0.0.0:9604")]
    pub listen: SocketAddr,

    /// Domain granted access in the served cross-domain policy document.
    #[arg(long, default_value = "*")]
    pub policy_domain: String,

    /// Port list granted access in the served cross-domain policy document.
    #[arg(long, default_value = "9604")]
    pub policy_ports: String,
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Address of the relay to connect to.
    #[arg(long, default_value = "127.0.0.1:9604")]
    pub server: SocketAddr,
}
