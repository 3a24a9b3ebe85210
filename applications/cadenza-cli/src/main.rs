/// Cadenza - queue playback from the command line
use cadenza_cli::{config::CliConfig, host::Host, loader};
use cadenza_playback::{PlaybackState, RepeatMode};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadenza")]
#[command(about = "Play a queue of local audio files through a simulated output", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue files and play them
    Play {
        /// Audio files, in queue order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Configuration file path
        #[arg(short, long, env = "CADENZA_CONFIG")]
        config: Option<PathBuf>,

        /// Shuffle the queue
        #[arg(long)]
        shuffle: bool,

        /// Repeat mode
        #[arg(long, value_enum)]
        repeat: Option<RepeatArg>,

        /// Simulated playback speed multiplier
        #[arg(long)]
        speed: Option<f64>,

        /// Play index to start from
        #[arg(long, default_value_t = 0)]
        start_index: usize,
    },
    /// Print the metadata read from files
    Inspect {
        /// Audio files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RepeatArg {
    Off,
    One,
    All,
}

impl From<RepeatArg> for RepeatMode {
    fn from(arg: RepeatArg) -> Self {
        match arg {
            RepeatArg::Off => RepeatMode::Off,
            RepeatArg::One => RepeatMode::One,
            RepeatArg::All => RepeatMode::All,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadenza_cli=info,cadenza_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            files,
            config,
            shuffle,
            repeat,
            speed,
            start_index,
        } => {
            let mut config = CliConfig::load(config.as_deref())?;
            if shuffle {
                config.playback.shuffle = true;
            }
            if let Some(repeat) = repeat {
                config.playback.repeat = repeat.into();
            }
            if let Some(speed) = speed {
                config.simulation.speed = speed;
            }
            config.validate()?;

            play(&config, &files, start_index).await?;
        }
        Commands::Inspect { files } => {
            inspect(&files);
        }
    }

    Ok(())
}

async fn play(config: &CliConfig, files: &[PathBuf], start_index: usize) -> anyhow::Result<()> {
    tracing::info!("Queueing {} file(s)", files.len());

    let mut host = Host::new(config)?;
    host.enqueue(files);
    host.start(start_index);

    let state = host
        .run(Duration::from_millis(config.simulation.tick_ms))
        .await;

    if state == PlaybackState::Failed {
        anyhow::bail!("playback stopped after a failed load");
    }
    tracing::info!("Playback finished");
    Ok(())
}

fn inspect(files: &[PathBuf]) {
    for path in files {
        println!("{}", path.display());
        match loader::probe(path) {
            Ok(report) => {
                let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
                println!("  title:    {}", text(&report.tags.title));
                println!("  artist:   {}", text(&report.tags.artist));
                println!("  album:    {}", text(&report.tags.album));
                match report.duration {
                    Some(duration) => println!("  duration: {:.1}s", duration.as_secs_f64()),
                    None => println!("  duration: -"),
                }
                match report.artwork {
                    Some(artwork) => println!("  artwork:  {:?}", artwork),
                    None => println!("  artwork:  -"),
                }
            }
            Err(e) => println!("  error: {}", e),
        }
    }
}
