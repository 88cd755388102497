use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use ascii_density::load_grid;
use clap::Parser;

mod config;
mod output;
mod shell;

use config::{ShellConfig, DEFAULT_CONFIG_FILE};
use output::OutputMethod;
use shell::Shell;

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert an image to brightness-matched ASCII art")]
struct Cli {
    /// Input image path
    image: PathBuf,
    /// TOML file with the session's starting settings
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Characters per row of the first conversion
    #[arg(long)]
    resolution: Option<u32>,
    /// Where `asciiArt` writes its result
    #[arg(long, value_enum)]
    output: Option<OutputMethod>,
    /// Destination of HTML output
    #[arg(long)]
    html_path: Option<PathBuf>,
    /// Font family used by HTML output
    #[arg(long)]
    font: Option<String>,
}

impl Cli {
    fn shell_config(&self) -> Result<ShellConfig> {
        let mut config = ShellConfig::load_from(&self.config)
            .with_context(|| format!("failed to load {:?}", self.config))?;

        if let Some(resolution) = self.resolution {
            config.resolution = resolution;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(html_path) = &self.html_path {
            config.html_path = html_path.clone();
        }
        if let Some(font) = &self.font {
            config.font = font.clone();
        }

        config.validate().context("invalid command line settings")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.shell_config()?;

    let image = match load_grid(&cli.image) {
        Ok(image) => image,
        Err(err) => {
            log::error!("failed to load {:?}: {err}", cli.image);
            println!("Error: Unable to load image file.");
            process::exit(1);
        },
    };

    let mut shell = Shell::new(image, &config).context("failed to start session")?;
    shell.run(io::stdin().lock(), io::stdout().lock())
}
