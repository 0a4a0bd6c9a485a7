//! The batch: walk the cards and aliases, stamp each image and write it out.
//!
//! Processing is strictly sequential. A failure on one card is logged and
//! counted, then the next card is processed; only problems loading the input
//! files stop a run.

use crate::{
    error::ItemError,
    overlay::{BadgeStyle, Renderer},
    records::{image_file_name, index_by_code, load_cards, unique_by_code, AliasMap, CardRecord},
    source::{ImageSource, LocalSource, RemoteSource, DEFAULT_BASE_URL},
    typeface::Typeface,
};
use anyhow::{Context, Result};
use clap::ValueEnum;
use fs_err as fs;
use image::{codecs::jpeg::JpegEncoder, Rgb, RgbImage, RgbaImage};
use log::{error, info, warn};
use std::{
    fmt,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

/// JPEG quality for downloaded cards and for standard-mode aliases.
pub const STANDARD_JPEG_QUALITY: u8 = 50;
/// JPEG quality for aliases in high-quality mode.
pub const HIGH_JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Phase {
    /// Cards first, then aliases.
    #[default]
    All,
    /// Only download and stamp cards from the cards file.
    Cards,
    /// Only stamp local alias images.
    Alias,
}

impl Phase {
    pub fn includes_cards(self) -> bool {
        matches!(self, Phase::All | Phase::Cards)
    }

    pub fn includes_aliases(self) -> bool {
        matches!(self, Phase::All | Phase::Alias)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cards_path: PathBuf,
    pub alias_path: PathBuf,
    pub alias_images: PathBuf,
    pub output: PathBuf,
    /// Pause between two network fetches.
    pub delay: Duration,
    /// Cards-pass only.
    pub limit: Option<usize>,
    pub high_quality: bool,
    pub phase: Phase,
    /// Original card codes to restrict both passes to. Empty means everything.
    pub codes: Vec<u64>,
    pub font: Option<PathBuf>,
    pub base_url: String,
    pub jpeg_quality: Option<u8>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cards_path: PathBuf::from("cards.json"),
            alias_path: PathBuf::from("alias.json"),
            alias_images: PathBuf::from("alias_images"),
            output: PathBuf::from("generated_cards"),
            delay: Duration::from_millis(100),
            limit: None,
            high_quality: false,
            phase: Phase::All,
            codes: Vec::new(),
            font: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            jpeg_quality: None,
        }
    }
}

impl Config {
    pub fn selects(&self, code: u64) -> bool {
        self.codes.is_empty() || self.codes.contains(&code)
    }

    fn card_quality(&self) -> u8 {
        self.jpeg_quality.unwrap_or(STANDARD_JPEG_QUALITY)
    }

    fn alias_quality(&self) -> u8 {
        self.jpeg_quality.unwrap_or(if self.high_quality {
            HIGH_JPEG_QUALITY
        } else {
            STANDARD_JPEG_QUALITY
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseSummary {
    pub total: usize,
    pub processed: usize,
    /// Items whose source image does not exist.
    pub skipped: usize,
    pub failed: usize,
}

impl PhaseSummary {
    fn record(&mut self, code: u64, result: Result<PathBuf, ItemError>) {
        match result {
            Ok(path) => {
                info!("  Generated {}", path.display());
                self.processed += 1;
            }
            Err(err) => {
                let skip = err.is_skip();
                let err = anyhow::Error::new(err);
                if skip {
                    warn!("  Skipping {code}: {err:#}");
                    self.skipped += 1;
                } else {
                    error!("  Failed to process {code}: {err:#}");
                    self.failed += 1;
                }
            }
        }
    }
}

impl fmt::Display for PhaseSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} generated, {} skipped, {} failed",
            self.processed, self.total, self.skipped, self.failed
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cards: Option<PhaseSummary>,
    pub aliases: Option<PhaseSummary>,
}

impl RunSummary {
    /// Number of cards and aliases that were not written.
    pub fn not_generated(&self) -> usize {
        [self.cards, self.aliases]
            .iter()
            .flatten()
            .map(|summary| summary.skipped + summary.failed)
            .sum()
    }
}

pub struct Batch<'a> {
    config: &'a Config,
    renderer: Renderer,
    cards: Vec<CardRecord>,
    aliases: AliasMap,
}

impl<'a> Batch<'a> {
    /// Read the input files named by `config` and pick a font. Any error here
    /// is fatal for the run.
    pub fn load(config: &'a Config) -> Result<Batch<'a>> {
        let cards = load_cards(&config.cards_path)
            .with_context(|| format!("Can't load cards from {}", config.cards_path.display()))?;

        let aliases = if config.phase.includes_aliases() {
            AliasMap::load(&config.alias_path).with_context(|| {
                format!("Can't load aliases from {}", config.alias_path.display())
            })?
        } else {
            AliasMap::default()
        };

        let typeface = Typeface::discover(config.font.as_deref());
        info!("Badge font: {}", typeface.origin());

        Ok(Batch::new(config, Renderer::new(typeface), cards, aliases))
    }

    /// Repeated card codes collapse to their last record, so each code is
    /// fetched once and its aliases get the same points as the card.
    pub fn new(
        config: &'a Config,
        renderer: Renderer,
        cards: Vec<CardRecord>,
        aliases: AliasMap,
    ) -> Batch<'a> {
        let listed = cards.len();
        let cards = unique_by_code(cards);
        if cards.len() < listed {
            warn!(
                "{} duplicate card codes in the cards file, the last record of each is used",
                listed - cards.len()
            );
        }

        Batch {
            config,
            renderer,
            cards,
            aliases,
        }
    }

    /// Run every pass selected by the config against the given sources.
    pub fn run(&self, remote: &dyn ImageSource, local: &dyn ImageSource) -> Result<RunSummary> {
        fs::create_dir_all(&self.config.output).context("Can't create output directory")?;
        info!("Output directory: {}", self.config.output.display());

        if self.config.high_quality {
            info!("High quality mode: keeping original image sizes");
        } else {
            info!("Standard mode: resizing to thumbnails");
        }

        let mut summary = RunSummary::default();
        if self.config.phase.includes_cards() {
            summary.cards = Some(self.process_cards(remote));
        }
        if self.config.phase.includes_aliases() {
            summary.aliases = Some(self.process_aliases(local));
        }
        Ok(summary)
    }

    pub fn process_cards(&self, remote: &dyn ImageSource) -> PhaseSummary {
        info!("Processing cards from {}", self.config.cards_path.display());

        let mut selected: Vec<&CardRecord> = self
            .cards
            .iter()
            .filter(|card| self.config.selects(card.code))
            .collect();
        if let Some(limit) = self.config.limit {
            if selected.len() > limit {
                info!("Limiting this run to the first {limit} cards");
                selected.truncate(limit);
            }
        }

        let style = BadgeStyle::for_cards(self.config.high_quality);
        let quality = self.config.card_quality();
        let mut summary = PhaseSummary {
            total: selected.len(),
            ..PhaseSummary::default()
        };

        for (i, card) in selected.iter().enumerate() {
            info!(
                "[{}/{}] {} (code {}, points {}) from {}",
                i + 1,
                summary.total,
                card.display_name(),
                card.code,
                card.points,
                remote.locate(card.code)
            );

            let result = self.process_one(remote, card.code, card.points, &style, quality);
            summary.record(card.code, result);

            if i + 1 < summary.total && !self.config.delay.is_zero() {
                thread::sleep(self.config.delay);
            }
        }

        info!("Cards: {summary}");
        summary
    }

    pub fn process_aliases(&self, local: &dyn ImageSource) -> PhaseSummary {
        info!(
            "Processing {} aliases from {}",
            self.aliases.alias_count(),
            self.config.alias_path.display()
        );

        let index = index_by_code(&self.cards);
        let style = BadgeStyle::default();
        let quality = self.config.alias_quality();
        let mut summary = PhaseSummary::default();

        for (original, alias_codes) in self.aliases.iter() {
            if !self.config.selects(original) {
                continue;
            }
            summary.total += alias_codes.len();

            let Some(card) = index.get(&original) else {
                warn!(
                    "Original card {original} is not in the cards file, skipping its {} aliases",
                    alias_codes.len()
                );
                summary.skipped += alias_codes.len();
                continue;
            };

            info!(
                "Aliases of {} (code {}, points {})",
                card.display_name(),
                original,
                card.points
            );

            for &alias in alias_codes {
                let result = self.process_one(local, alias, card.points, &style, quality);
                summary.record(alias, result);
            }
        }

        info!("Aliases: {summary}");
        summary
    }

    fn process_one(
        &self,
        source: &dyn ImageSource,
        code: u64,
        points: i64,
        style: &BadgeStyle,
        quality: u8,
    ) -> Result<PathBuf, ItemError> {
        let data = source.fetch(code)?;
        let image = image::load_from_memory(&data).map_err(ItemError::Decode)?;
        let rendered = self
            .renderer
            .render_with(&image, points, self.config.high_quality, style)?;

        let path = self.config.output.join(image_file_name(code));
        write_jpeg(&rendered, &path, quality)?;
        Ok(path)
    }
}

/// Load the inputs named by `config` and run it against the real sources.
pub fn run(config: &Config) -> Result<RunSummary> {
    let batch = Batch::load(config)?;
    let remote = RemoteSource::new(&config.base_url)?;
    let local = LocalSource::new(&config.alias_images);
    batch.run(&remote, &local)
}

/// Flatten onto white and write as a JPEG.
pub fn write_jpeg(image: &RgbaImage, path: &Path, quality: u8) -> Result<(), ItemError> {
    let flat = flatten_on_white(image);

    let file = fs::File::create(path).map_err(|source| ItemError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);

    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode_image(&flat)
        .map_err(|source| ItemError::Encode {
            path: path.to_path_buf(),
            source,
        })?;

    writer.flush().map_err(|source| ItemError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let pixel = image.get_pixel(x, y);
        let alpha = pixel[3] as u32;
        let blend = |channel: u8| {
            let mixed = channel as u32 * alpha + 255 * (255 - alpha);
            ((mixed + 127) / 255) as u8
        };
        Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])])
    })
}
