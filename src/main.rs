use clap::Parser;
use imstudio::cli::SubCommandExtend;
use imstudio::config::SubCommand;
use imstudio::Opts;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let opts = Opts::parse();
    match &opts.subcmd {
        SubCommand::Build(config) => config.run(&opts).await,
        SubCommand::Search(config) => config.run(&opts).await,
        SubCommand::Generate(config) => config.run(&opts).await,
        SubCommand::Server(config) => config.run(&opts).await,
    }
}
