mod bundle;
mod cargo;
mod serve;

use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use env_logger::Env;
use log::error;

/// Build a Rust Macroquad project for WASM
#[derive(Parser)]
struct Cli {
    /// Name of library produced by rust
    #[arg(short, long = "libName", value_name = "NAME", default_value = "luminara")]
    lib_name: String,

    /// Start a web server and serve the output
    #[arg(short, long)]
    run: bool,

    /// The cargo profile to use when compiling
    #[arg(short, long, value_name = "PROFILE", default_value = "dev")]
    profile: String,

    /// Output directory
    #[arg(short, long = "outputDir", value_name = "PATH", default_value = "dist")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(err) = bundle::prepare_output(&cli.output_dir) {
        error!("{err}");
        exit(1);
    }

    // Does not return if the build fails; the process exits with cargo's code.
    cargo::build_wasm(&cli.profile);

    if let Err(err) = bundle::assemble(&cli.output_dir, &cli.lib_name, &cli.profile) {
        error!("{err}");
        exit(1);
    }

    if cli.run {
        if let Err(err) = serve::serve(cli.output_dir).await {
            error!("dev server failed: {err}");
            exit(1);
        }
    }
}
