
use std::process::ExitCode;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Print what cjudge is doing (same as RUST_LOG=info)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// Compile the solution and judge it against the samples
    #[command(alias("t"))]
    Test(test::Args),
}

pub type SubcmdResult = anyhow::Result<ExitCode>;

impl GlobalArgs {
    pub fn init_logger(&self) {
        let default_filter = if self.verbose { "info" } else { "warn" };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
            .format_timestamp(None)
            .init();
    }

    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Test(args) => test::exec(args, self).await,
        }
    }
}
