//! Extract and list files from CASC builds and MPQ installations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hoard_formats::config::BuildConfig;
use hoard_protocol::{FetchConfig, Fetcher};
use hoard_storage::listfile::{ExtensionFilter, FormatOptions};
use hoard_storage::{
    ArchiveSource, CascSource, KeyRing, ListfileIndex, ListfileLoader, LooseFileStore, MpqSource,
    StorageConfig,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hoard")]
#[command(about = "Read files from CASC builds and MPQ installations", long_about = None)]
struct Cli {
    /// Locale used for root lookups
    #[arg(long, env = "HOARD_LOCALE", default_value = "enUS", global = true)]
    locale: String,

    /// Report this build name instead of the one read from the build
    #[arg(long, env = "HOARD_BUILD_NAME", global = true)]
    build_name: Option<String>,

    #[command(subcommand)]
    backend: Backend,
}

#[derive(Subcommand)]
enum Backend {
    /// Open a CASC build from a loose file store
    Casc {
        /// Build config file
        #[arg(long)]
        build_config: PathBuf,

        /// Directory holding `<ab>/<cd>/<hash>` files
        #[arg(long)]
        store: PathBuf,

        /// Local `<id>;<path>` listfile instead of downloading one
        #[arg(long)]
        listfile: Option<PathBuf>,

        /// Local `name key` TACT key list instead of downloading one
        #[arg(long)]
        tact_keys: Option<PathBuf>,

        #[command(subcommand)]
        command: Command,
    },
    /// Open an MPQ installation
    Mpq {
        /// Installation root containing `Data/`
        #[arg(long)]
        install: PathBuf,

        #[command(subcommand)]
        command: Command,
    },
}

#[derive(Subcommand)]
enum Command {
    /// Write one file to disk
    Extract {
        /// FileDataID or path
        target: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print listfile entries
    List(ListArgs),
}

#[derive(Args)]
struct ListArgs {
    /// Only paths ending with this extension (repeatable)
    #[arg(long = "ext")]
    extensions: Vec<String>,

    /// Sort by FileDataID instead of by name
    #[arg(long)]
    sort_by_id: bool,

    /// Append ` [id]` to each path
    #[arg(long)]
    show_ids: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = StorageConfig::from_env().with_locale(cli.locale);
    if let Some(name) = cli.build_name {
        config = config.with_build_name(name);
    }
    let listfile = Arc::new(ListfileIndex::new());

    let (source, command) = match cli.backend {
        Backend::Casc {
            build_config,
            store,
            listfile: local_listfile,
            tact_keys,
            command,
        } => {
            let casc = open_casc(
                &config,
                &build_config,
                store,
                local_listfile,
                tact_keys,
                Arc::clone(&listfile),
            )
            .await?;
            (ArchiveSource::from(casc), command)
        }
        Backend::Mpq { install, command } => {
            let mpq = MpqSource::open(&install, Arc::clone(&listfile), &config)
                .await
                .with_context(|| format!("opening MPQ installation {}", install.display()))?;
            (ArchiveSource::from(mpq), command)
        }
    };

    info!("Build: {}", source.build_name());

    match command {
        Command::Extract { target, output } => {
            let data = match target.parse::<u32>() {
                Ok(id) => source.get_file_with_timeout(id, config.request_timeout).await,
                Err(_) => source.get_file_by_name(&target).await,
            }
            .with_context(|| format!("reading {target}"))?;

            tokio::fs::write(&output, &data)
                .await
                .with_context(|| format!("writing {}", output.display()))?;
            info!("Wrote {} bytes to {}", data.len(), output.display());
        }
        Command::List(args) => {
            let options = FormatOptions {
                sort_by_id: args.sort_by_id,
                show_file_data_ids: args.show_ids,
            };
            let entries = if args.extensions.is_empty() {
                listfile.full_listfile(options)
            } else {
                let filters: Vec<ExtensionFilter> = args
                    .extensions
                    .into_iter()
                    .map(ExtensionFilter::suffix)
                    .collect();
                listfile.filenames_by_extension(&filters, options)
            };
            for entry in entries {
                println!("{entry}");
            }
        }
    }

    Ok(())
}

async fn open_casc(
    config: &StorageConfig,
    build_config: &Path,
    store: PathBuf,
    local_listfile: Option<PathBuf>,
    tact_keys: Option<PathBuf>,
    listfile: Arc<ListfileIndex>,
) -> Result<CascSource> {
    let text = tokio::fs::read_to_string(build_config)
        .await
        .with_context(|| format!("reading build config {}", build_config.display()))?;
    let build_config = BuildConfig::parse(&text);

    let fetcher = Fetcher::new(FetchConfig::from_env())?;
    let keys = KeyRing::new(config.key_cache_path.clone());
    match tact_keys {
        Some(path) => {
            keys.load_cache().await;
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading TACT keys {}", path.display()))?;
            info!("Loaded {} TACT keys from {}", keys.merge_key_list(&text), path.display());
        }
        None => {
            if let Err(e) = keys.load(&fetcher, &config.tact_key_urls).await {
                warn!("Unable to update TACT keys: {}", e);
            }
        }
    }

    let casc = CascSource::open(
        Arc::new(LooseFileStore::new(store)),
        &build_config,
        keys.clone(),
        listfile,
        config,
    )
    .await?;

    match local_listfile {
        Some(path) => {
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading listfile {}", path.display()))?;
            let root = casc.root();
            let keep = |id: u32| root.contains(id.into());
            let count = casc.listfile().load_manifest(&text, Some(&keep))?;
            info!("Loaded {} listfile entries from {}", count, path.display());
        }
        None => {
            let loader = ListfileLoader::new(fetcher, config.listfile_urls.clone());
            casc.load_listfile(&loader).await?;
        }
    }

    keys.flush().await?;
    Ok(casc)
}
