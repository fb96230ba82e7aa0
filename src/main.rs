use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thumbsmith::cache::CacheStats;
use thumbsmith::config::{self, HelperConfig};
use thumbsmith::derive::{Derivatives, Outcome, StoredFile};
use thumbsmith::filters::{FilterContext, FilterRegistry};
use thumbsmith::imaging::{AnyBackend, CropSpec, ImageBackend};
use thumbsmith::output;
use thumbsmith::translate::Catalog;
use tracing_subscriber::EnvFilter;

/// Target box and crop shared by the derivative commands.
#[derive(clap::Args, Clone)]
struct BoxArgs {
    /// Target width in pixels
    #[arg(long, short)]
    width: u32,

    /// Target height in pixels
    #[arg(long, short = 'H')]
    height: Option<u32>,

    /// Crop: "x,y,w,h" bounds or an anchor (top, bottom, left, right, center)
    #[arg(long)]
    crop: Option<String>,

    /// Source image URLs, relative to the public root (e.g. /img/photo.jpg)
    #[arg(required = true)]
    urls: Vec<String>,
}

impl BoxArgs {
    fn crop(&self) -> Option<CropSpec> {
        self.crop.as_deref().map(CropSpec::parse)
    }
}

#[derive(Parser)]
#[command(name = "thumbsmith")]
#[command(about = "Cached image derivatives and template helpers")]
#[command(long_about = "\
Cached image derivatives and template helpers

Derivatives are written next to their source and named by a hash of the
request, so every URL is stable until the source changes:

  www/
  ├── img/photo.jpg                  # source
  ├── img/thumbs/<sha256>.jpg        # thumb: shrink to fit
  ├── img/fits/<sha256>.jpg          # fit: fill the box, crop at the anchor
  ├── img/fitThumbs/<sha256>.jpg     # fit-thumb: center on a transparent canvas
  └── cache/images/<sha256>.jpg      # mirror: copies of remote images

A missing source never fails: the original URL is printed instead.

Run 'thumbsmith gen-config' to generate a documented thumbsmith.toml.")]
#[command(version)]
struct Cli {
    /// Project directory containing thumbsmith.toml
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Log debug output (cache hits, render plans)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Shrink-only thumbnails
    Thumb(BoxArgs),
    /// Exact-size crops that fill the box
    Fit(BoxArgs),
    /// Thumbnails centered on a transparent canvas of exactly the box size
    FitThumb(BoxArgs),
    /// CSS padding that centers each image in the box
    Offset(BoxArgs),
    /// Copy remote images into the mirror cache
    Mirror {
        /// Print the original URL instead of failing
        #[arg(long)]
        allow_failure: bool,
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Print "WxH" of stored files (paths relative to the storage root)
    Dimensions {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Run a template filter; arguments are parsed as JSON, else taken as strings
    Apply { filter: String, args: Vec<String> },
    /// List the available template filters
    Filters,
    /// Show which image backend will be used
    Backend,
    /// Print a stock thumbsmith.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Filters => {
            let registry = FilterRegistry::<AnyBackend>::standard();
            for line in output::format_list("Filters", registry.names()) {
                println!("{}", line);
            }
        }
        command => {
            let config = config::load_config(&cli.root)?;
            let derivatives = derivatives(&config, &cli.root)?;
            run(command, &config, &derivatives)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("thumbsmith=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn derivatives(
    config: &HelperConfig,
    root: &std::path::Path,
) -> Result<Derivatives<AnyBackend>, Box<dyn std::error::Error>> {
    let backend = config
        .processing
        .backend
        .create()
        .ok_or("ImageMagick backend requested but neither `magick` nor `convert` is on PATH")?;
    Ok(Derivatives::new(
        backend,
        config.roots(root),
        config.processing.options(),
    ))
}

fn run(
    command: Command,
    config: &HelperConfig,
    derivatives: &Derivatives<AnyBackend>,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Thumb(args) => batch(&args.urls, |url| {
            derivatives.thumb(url, args.width, args.height, args.crop())
        })?,
        Command::Fit(args) => batch(&args.urls, |url| {
            derivatives.fit(url, args.width, args.height, args.crop())
        })?,
        Command::FitThumb(args) => {
            let height = args.height.ok_or("fit-thumb requires --height")?;
            batch(&args.urls, |url| {
                derivatives.fit_thumb(url, args.width, height, args.crop())
            })?
        }
        Command::Offset(args) => {
            let crop = args.crop();
            for url in &args.urls {
                let padding = derivatives.image_offset(url, args.width, args.height, crop.as_ref());
                for line in output::format_offset(url, padding.as_ref()) {
                    println!("{}", line);
                }
            }
        }
        Command::Mirror {
            allow_failure,
            urls,
        } => batch(&urls, |url| derivatives.cached_image(url, allow_failure))?,
        Command::Dimensions { paths } => {
            for path in paths {
                let file = StoredFile {
                    name: path.clone(),
                    path: path.clone(),
                };
                println!("{} → {}", path, derivatives.image_dimensions(&file));
            }
        }
        Command::Apply { filter, args } => {
            let catalog = Catalog::from_config(&config.translations);
            let ctx = FilterContext {
                derivatives,
                translator: &catalog,
                now: chrono::Utc::now(),
            };
            let values: Vec<serde_json::Value> = args
                .iter()
                .map(|a| {
                    serde_json::from_str::<serde_json::Value>(a)
                        .unwrap_or_else(|_| a.as_str().into())
                })
                .collect();
            let result = FilterRegistry::standard().apply(&filter, &ctx, &values)?;
            match result {
                serde_json::Value::String(s) => println!("{}", s),
                other => println!("{}", other),
            }
        }
        Command::Backend => {
            println!("Backend: {}", derivatives.backend().name());
        }
        Command::GenConfig | Command::Filters => {}
    }
    Ok(())
}

/// Run one request per URL, print each outcome, then the cache summary.
fn batch<F>(urls: &[String], mut request: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnMut(&str) -> Result<Outcome, thumbsmith::derive::DeriveError>,
{
    let mut stats = CacheStats::default();
    for url in urls {
        let outcome = request(url)?;
        stats.record(&outcome);
        output::print_outcome(url, &outcome);
    }
    output::print_stats(&stats);
    Ok(())
}
