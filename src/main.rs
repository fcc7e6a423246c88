use clap::{Parser, Subcommand};
use lot_gallery::config::{self, SiteConfig};
use lot_gallery::gallery::{self, BuildOptions};
use lot_gallery::import::{self, LocalImage};
use lot_gallery::publish::{self, PublishTarget};
use lot_gallery::output;
use lot_gallery::render;
use lot_gallery::store::{BlobStore, LocalBlobStore, LocalRecordStore, RecordStore};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "lot-gallery")]
#[command(about = "Static inventory page for a car dealership")]
#[command(long_about = "\
Static inventory page for a car dealership

Reads car records from a table, fetches each car's image from blob storage,
and renders one self-contained HTML page with every image inlined. The page
is written locally and published to the public site root container.

Storage layout (under --storage):

  storage/
  ├── tables/
  │   └── aliceCarInventory.json     # Records, sorted by PartitionKey, RowKey
  └── blobs/
      ├── alicecardealer/            # Car images, referenced by blob_path
      │   └── CAR001.png
      └── $web/                      # Public site root
          └── alice_index.html

Records reference their image as blob_path = \"<container>/<name>\".
Cars without an image, or whose image cannot be fetched, are still listed.

Run 'lot-gallery gen-config' to generate a documented gallery.toml.")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Where configuration comes from, and the overrides applied on top.
#[derive(clap::Args)]
struct SettingsArgs {
    /// Config file
    #[arg(long, default_value = "gallery.toml", global = true)]
    config: PathBuf,

    /// Storage account directory (overrides storage.root)
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// Owner identifier (overrides owner)
    #[arg(long, global = true)]
    owner: Option<String>,
}

impl SettingsArgs {
    /// Load the config file and apply command-line overrides.
    fn resolve(&self) -> Result<SiteConfig, config::ConfigError> {
        let overrides = config::Overrides {
            owner: self.owner.clone(),
            storage_root: self.storage.clone(),
        };
        let config = config::load_config_with_overrides(&self.config, &overrides)?;
        tracing::debug!(
            root = %config.storage.root.display(),
            table = %config.table_name(),
            "resolved config"
        );
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Build the gallery page, write it locally, and publish it
    Build {
        /// Local output file (overrides site.output)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write the local file only
        #[arg(long)]
        no_publish: bool,
        /// Only include records matching this filter
        #[arg(long)]
        query: Option<String>,
    },
    /// Print records matching a filter, e.g. "make eq 'Toyota' and price lt 30000"
    Query {
        filter: String,
    },
    /// Print the number of records in the inventory table
    Count,
    /// Import records from a JSON file, optionally uploading an image for each
    Import {
        /// JSON array of records with PartitionKey and RowKey
        file: PathBuf,
        /// Image uploaded as <RowKey>.<ext> for every record
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// List blobs in a container (default: the image container)
    Blobs {
        container: Option<String>,
    },
    /// Print a stock gallery.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build {
            output,
            no_publish,
            query,
        } => {
            let config = cli.settings.resolve()?;
            let root = &config.storage.root;
            let records = LocalRecordStore::open(root, &config.table_name())?;
            let blobs = LocalBlobStore::open(root);
            let local = output.unwrap_or_else(|| config.site.output.clone());
            run_build(&config, &records, &blobs, query.as_deref(), &local, !no_publish)?;
        }
        Command::Query { filter } => {
            let config = cli.settings.resolve()?;
            let records = LocalRecordStore::open(&config.storage.root, &config.table_name())?;
            output::print_query_output(&records.query(&filter)?);
        }
        Command::Count => {
            let config = cli.settings.resolve()?;
            let records = LocalRecordStore::open(&config.storage.root, &config.table_name())?;
            output::print_count(&config.gallery.count_label, records.list()?.len());
        }
        Command::Import { file, image } => {
            let config = cli.settings.resolve()?;
            let root = &config.storage.root;
            let records = LocalRecordStore::open(root, &config.table_name())?;
            let blobs = LocalBlobStore::open(root);
            let input = import::load_records(&file)?;
            let image = image.as_deref().map(LocalImage::read).transpose()?;
            let summary = import::import(
                input,
                image.as_ref(),
                &records,
                &blobs,
                &config.container_name(),
            )?;
            output::print_import_output(&summary);
        }
        Command::Blobs { container } => {
            let config = cli.settings.resolve()?;
            let blobs = LocalBlobStore::open(&config.storage.root);
            let container = container.unwrap_or_else(|| config.container_name());
            let mut listing = Vec::new();
            for name in blobs.list_blobs(&container)? {
                let properties = blobs.properties(&container, &name)?;
                listing.push((name, properties));
            }
            output::print_blob_listing(&container, &listing);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Read, build, render, write locally, then publish.
fn run_build(
    config: &SiteConfig,
    records: &impl RecordStore,
    blobs: &impl BlobStore,
    query: Option<&str>,
    local: &Path,
    publish_page: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = match query {
        Some(filter) => records.query(filter)?,
        None => records.list()?,
    };

    let options = BuildOptions::from_site_config(config);
    tracing::debug!(
        records = records.len(),
        workers = options.max_workers,
        "building gallery"
    );
    let document = gallery::build(&records, |c, n| blobs.get(c, n), &options);
    output::print_build_output(&document);

    let html = render::render(&document);
    publish::write_local(local, &html)?;

    let published = if publish_page {
        let target = PublishTarget::from_site_config(config);
        let properties = publish::publish(blobs, &target, &html, &options.retry)?;
        Some((target, properties))
    } else {
        None
    };
    output::print_publish_output(
        Some(local),
        published.as_ref().map(|(target, properties)| (target, properties)),
    );
    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
