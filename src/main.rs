use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use glowsphere::{AppConfig, AppOptions};

#[derive(Parser)]
#[command(name = "glowsphere", about = "Matcap sphere with bloom and optional physics")]
struct Cli {
    /// Enable the box-stacking physics simulation
    #[arg(long)]
    physics: bool,

    /// Enable frame statistics and bloom tuning keys
    #[arg(long)]
    debug: bool,

    /// Feature fragment such as "#physics,debug"
    #[arg(long, env = "GLOWSPHERE_FRAGMENT", default_value = "")]
    fragment: String,

    /// Directory holding noise.png and matcap.png
    #[arg(long, default_value = "assets")]
    assets: PathBuf,

    #[arg(long, default_value = "glowsphere")]
    title: String,

    #[arg(long, default_value = "1280")]
    width: u32,

    #[arg(long, default_value = "720")]
    height: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "glowsphere=debug,wgpu=warn"
    } else {
        "glowsphere=info,wgpu=error"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let options = AppOptions::from_fragment(&cli.fragment).merge(AppOptions {
        physics: cli.physics,
        debug: cli.debug,
    });
    let config = AppConfig::new()
        .title(cli.title)
        .size(cli.width, cli.height)
        .assets(cli.assets);

    glowsphere::run(config, options)?;
    Ok(())
}
