use card_points::driver::{self, Config, Phase};
use card_points::source::DEFAULT_BASE_URL;
use clap::Parser;
use std::{path::PathBuf, process, time::Duration};

#[derive(Debug, Parser)]
#[clap(
    name = "card-points",
    about = "Download card images and stamp their point values on them"
)]
struct Args {
    /// Path to the cards JSON file.
    #[clap(short, long, value_name = "FILE", default_value = "cards.json")]
    cards: PathBuf,

    /// Path to the alias JSON file.
    #[clap(short, long, value_name = "FILE", default_value = "alias.json")]
    alias: PathBuf,

    /// Directory containing the pre-downloaded alias images.
    #[clap(short = 'i', long, value_name = "DIR", default_value = "alias_images")]
    alias_images: PathBuf,

    /// Output directory for every generated card.
    #[clap(short, long, value_name = "DIR", default_value = "generated_cards")]
    output: PathBuf,

    /// Delay between downloads in seconds.
    #[clap(short, long, value_name = "SECS", default_value = "0.1", value_parser = parse_delay)]
    delay: Duration,

    /// Only process the first N cards. Aliases are never limited.
    #[clap(short, long, value_name = "N")]
    limit: Option<usize>,

    /// Keep original image sizes instead of making thumbnails.
    #[clap(long, visible_alias = "hq")]
    high_quality: bool,

    /// Which pass to run.
    #[clap(short, long, value_enum, default_value_t = Phase::All)]
    phase: Phase,

    /// Only process these card codes (and their aliases).
    #[clap(long = "code", value_name = "CODE", value_delimiter = ',')]
    codes: Vec<u64>,

    /// Font file to try before the system fonts.
    #[clap(long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Base URL card images are downloaded from.
    #[clap(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// JPEG quality (1-100) for every generated file.
    #[clap(long, value_name = "QUALITY", value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: Option<u8>,

    /// Sets verbosity level. Can be specified multiple times.
    #[clap(long = "verbose", short, action(clap::ArgAction::Count))]
    verbosity: u8,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            cards_path: args.cards,
            alias_path: args.alias,
            alias_images: args.alias_images,
            output: args.output,
            delay: args.delay,
            limit: args.limit,
            high_quality: args.high_quality,
            phase: args.phase,
            codes: args.codes,
            font: args.font,
            base_url: args.base_url,
            jpeg_quality: args.jpeg_quality,
        }
    }
}

fn parse_delay(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("{value:?} is not a number of seconds"))?;
    Duration::try_from_secs_f64(seconds).map_err(|err| format!("invalid delay {value:?}: {err}"))
}

fn main() {
    let args = Args::parse();

    let log_filter = match args.verbosity {
        0 => "info",
        1 => "info,card_points=debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter))
        .format_module_path(false)
        .format_timestamp(None)
        .format_indent(Some(8))
        .init();

    let config = Config::from(args);
    match driver::run(&config) {
        Ok(summary) => {
            if let Some(cards) = summary.cards {
                println!("✓ Cards: {cards}");
            }
            if let Some(aliases) = summary.aliases {
                println!("✓ Aliases: {aliases}");
            }
            let missing = summary.not_generated();
            if missing > 0 {
                println!("⚠ {missing} images were skipped or failed, see the log above");
            }
            println!("Images saved to {}", config.output.display());
        }
        Err(err) => {
            log::error!("{err:?}");
            process::exit(1);
        }
    }
}
