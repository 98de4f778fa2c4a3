mod cmd;
mod util;

use std::process::ExitCode;

use clap::Parser;
use cmd::GlobalArgs;
use colored::Colorize;

#[tokio::main]
async fn main() -> ExitCode {
    let app = GlobalArgs::parse();
    app.init_logger();
    app.exec_subcmd().await.unwrap_or_else(|e| {
        eprintln!("{} {:?}", "Error:".red().bold(), e);
        ExitCode::FAILURE
    })
}
