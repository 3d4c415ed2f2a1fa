use std::process::ExitCode;

use clap::Parser;

use tracking_bridge::app;
use tracking_bridge::config::Args;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = app::run(Args::parse(), app::interrupted()).await;
    if let Err(e) = &result {
        log::error!("{:#}", e);
    }

    ExitCode::from(app::exit_status(&result))
}
