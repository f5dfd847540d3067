//! Entry point for the cube-snake server.

mod config;
mod constants;
mod docs;
mod error;
mod geometry;
mod ids;
mod protocol;
mod room;
mod server;
mod sim;

use config::Config;
use server::start_server;
use tracing::error;

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    if let Err(e) = start_server(config).await {
        error!("server exited with error: {e}");
        std::process::exit(1);
    }
}
