use anyhow::Result;
use clap::Parser;

use framesearch::cli::SubCommandExtend;
use framesearch::config::{Opts, SubCommand};

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let opts = Opts::parse();
    match &opts.subcmd {
        SubCommand::Build(cmd) => cmd.run(&opts),
        SubCommand::Import(cmd) => cmd.run(&opts),
        SubCommand::Search(cmd) => cmd.run(&opts),
        SubCommand::Info(cmd) => cmd.run(&opts),
    }
}
