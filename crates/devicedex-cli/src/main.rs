//! devicedex - command-line front end for the device catalog.
//!
//! Syncs the catalog into the offline snapshot, warms the image cache, and
//! exposes the maintenance actions the app's settings screen offers.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use devicedex_core::models::ColorImage;
use devicedex_core::utils::{format_price, truncate_string};
use devicedex_core::{
    CatalogClient, CatalogOrigin, Config, CredentialStore, DeviceType, ImageCache, ImageSource,
    ImageTier, SnapshotStore, SyncService,
};

// ============================================================================
// Constants
// ============================================================================

/// Width of the model column in `list` output
const NAME_COLUMN_WIDTH: usize = 32;

const USAGE: &str = "\
Usage: devicedex <command> [args]

Commands:
  sync [--force] [--preload]          Load today's snapshot or fetch the catalog
  status                              Show snapshot age and image cache size
  list [phone|tablet|laptop] [query]  List catalog entries from the snapshot
  compare <id> <id>                   Compare two entries side by side
  image <id> <color> [high|low]       Print the best source for an image
  clear-images                        Delete every cached image
  clear-snapshot                      Delete the offline snapshot
  login <username>                    Store an admin token (read from stdin)
  logout                              Remove the stored admin token
  upload <id> <color> <high|low> <file>  Upload a color image (admin)";

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // DEVICEDEX_LOG_DIR adds a daily rolling log file next to stderr output
    let (file_layer, guard) = match std::env::var_os("DEVICEDEX_LOG_DIR") {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "devicedex.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };
    let rest = &args[1..];

    let config = Config::load().context("Failed to load config")?;
    let cache_dir = config
        .cache_dir()
        .unwrap_or_else(|_| PathBuf::from("./cache"));
    info!(?cache_dir, command = command.as_str(), "devicedex starting");

    match command.as_str() {
        "sync" => sync(&config, cache_dir, rest).await,
        "status" => status(&config, cache_dir),
        "list" => list(cache_dir, rest),
        "compare" => compare(cache_dir, rest),
        "image" => image(&config, cache_dir, rest).await,
        "clear-images" => {
            let cache = ImageCache::new(&cache_dir)?;
            report(cache.clear(), "Image cache cleared", "Failed to clear image cache")
        }
        "clear-snapshot" => {
            let snapshot = SnapshotStore::new(cache_dir)?;
            report(snapshot.clear(), "Snapshot cleared", "Failed to clear snapshot")
        }
        "login" => login(config, rest),
        "logout" => logout(config),
        "upload" => upload(&config, rest).await,
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}

fn build_service(config: &Config, cache_dir: PathBuf) -> Result<SyncService> {
    let client = CatalogClient::new(config)?;
    let images = ImageCache::new(&cache_dir)?;
    let snapshot = SnapshotStore::new(cache_dir)?;
    Ok(SyncService::new(
        Arc::new(client),
        snapshot,
        Arc::new(images),
    ))
}

fn report(ok: bool, success: &str, failure: &str) -> Result<()> {
    if ok {
        println!("{}", success);
        Ok(())
    } else {
        bail!("{}", failure)
    }
}

async fn sync(config: &Config, cache_dir: PathBuf, args: &[String]) -> Result<()> {
    let force = args.iter().any(|a| a == "--force");
    let preload = args.iter().any(|a| a == "--preload");

    let service = build_service(config, cache_dir)?;
    let (catalog, origin) = service.load_or_sync(force).await?;

    let source = match origin {
        CatalogOrigin::Remote => "remote",
        CatalogOrigin::Snapshot => "today's snapshot",
        CatalogOrigin::StaleSnapshot => "stale snapshot (sync failed)",
    };
    println!("{} items from {}", catalog.items.len(), source);

    if preload {
        let cached = service.spawn_preload(&catalog).await?;
        println!(
            "{} images cached ({})",
            cached,
            service.images().size_formatted()
        );
    }
    Ok(())
}

fn status(config: &Config, cache_dir: PathBuf) -> Result<()> {
    let images = ImageCache::new(&cache_dir)?;
    let snapshot = SnapshotStore::new(cache_dir)?;

    let validity = if snapshot.has_valid_snapshot_for_today() {
        "valid for today"
    } else {
        "missing or out of date"
    };
    println!("Snapshot:    {}", validity);
    println!("Last sync:   {}", snapshot.time_since_sync());
    println!("Image cache: {}", images.size_formatted());
    match config.admin_username.as_deref() {
        Some(username) if CredentialStore::has_token(username) => {
            println!("Admin:       {} (token stored)", username)
        }
        Some(username) => println!("Admin:       {} (no token - run login)", username),
        None => println!("Admin:       not configured"),
    }
    Ok(())
}

fn load_snapshot(cache_dir: PathBuf) -> Result<devicedex_core::Catalog> {
    SnapshotStore::new(cache_dir)?
        .load()
        .context("No snapshot on disk - run `devicedex sync` first")
}

fn list(cache_dir: PathBuf, args: &[String]) -> Result<()> {
    let catalog = load_snapshot(cache_dir)?;

    let (device_type, query) = match args.first().and_then(|a| DeviceType::from_tag(a)) {
        Some(t) => (Some(t), args[1..].join(" ")),
        None => (None, args.join(" ")),
    };

    for item in catalog.search(&query, device_type) {
        println!(
            "{:<12} {:<width$} {:<8} {:>10}",
            item.id,
            truncate_string(&item.display_name(), NAME_COLUMN_WIDTH),
            item.device_type.label(),
            format_price(item.price),
            width = NAME_COLUMN_WIDTH
        );
    }
    Ok(())
}

fn compare(cache_dir: PathBuf, args: &[String]) -> Result<()> {
    let [left, right] = args else {
        bail!("compare needs exactly two ids");
    };
    let catalog = load_snapshot(cache_dir)?;
    let rows = catalog
        .compare(left, right)
        .with_context(|| format!("Unknown id: {} or {}", left, right))?;

    for row in rows {
        let marker = if row.differs() { "*" } else { " " };
        println!(
            "{} {:<10} {:<30} {:<30}",
            marker, row.label, row.left, row.right
        );
    }
    Ok(())
}

async fn image(config: &Config, cache_dir: PathBuf, args: &[String]) -> Result<()> {
    let (item_id, color) = match args {
        [item_id, color, ..] => (item_id, color),
        _ => bail!("image needs <id> <color>"),
    };
    let tier = match args.get(2) {
        Some(t) => ImageTier::parse(t).with_context(|| format!("Unknown tier: {}", t))?,
        None => ImageTier::High,
    };

    let service = build_service(config, cache_dir)?;
    let catalog = service
        .snapshot()
        .load()
        .context("No snapshot on disk - run `devicedex sync` first")?;
    let url = catalog
        .images_for(item_id)
        .and_then(|set| set.get(color))
        .and_then(|image| image.url(tier));

    match service.images().best_source(url, item_id, color, tier).await {
        Some(ImageSource::Local(path)) => println!("{}", path.display()),
        Some(ImageSource::Remote(url)) => println!("{} (not cached)", url),
        None => bail!("No image for {} / {} ({})", item_id, color, tier),
    }
    Ok(())
}

fn login(mut config: Config, args: &[String]) -> Result<()> {
    let username = args.first().context("login needs <username>")?;

    eprint!("Admin token: ");
    let mut token = String::new();
    io::stdin().lock().read_line(&mut token)?;
    let token = token.trim();
    if token.is_empty() {
        bail!("Empty token");
    }

    CredentialStore::store_token(username, token)?;
    config.admin_username = Some(username.clone());
    config.save()?;
    println!("Stored admin token for {}", username);
    Ok(())
}

fn logout(mut config: Config) -> Result<()> {
    let Some(username) = config.admin_username.take() else {
        println!("No admin configured");
        return Ok(());
    };
    CredentialStore::delete(&username)?;
    config.save()?;
    println!("Removed admin token for {}", username);
    Ok(())
}

async fn upload(config: &Config, args: &[String]) -> Result<()> {
    let [item_id, color, tier, file] = args else {
        bail!("upload needs <id> <color> <high|low> <file>");
    };
    let tier = ImageTier::parse(tier).with_context(|| format!("Unknown tier: {}", tier))?;
    let username = config
        .admin_username
        .as_deref()
        .context("No admin configured - run `devicedex login <username>` first")?;
    let token = CredentialStore::get_token(username)?;

    let path = PathBuf::from(file);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg")
        .to_string();
    let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {}", file))?;

    let client = CatalogClient::new(config)?.with_token(token);
    let ids = std::slice::from_ref(item_id);
    if client.fetch_items_by_ids(ids).await?.is_empty() {
        bail!("Unknown id: {}", item_id);
    }

    let download_url = client
        .upload_color_image(item_id, color, tier, bytes, &ext)
        .await?;

    // Merge into the existing metadata so the other tier and hex override survive
    let existing = client.fetch_images(ids).await?;
    let current = existing.get(item_id.as_str());
    let key = current
        .and_then(|set| set.find_key(color))
        .unwrap_or(color.as_str())
        .to_string();
    let mut image = current
        .and_then(|set| set.get(color))
        .cloned()
        .unwrap_or_else(ColorImage::default);
    match tier {
        ImageTier::High => image.high_res = download_url.clone(),
        ImageTier::Low => image.low_res = download_url.clone(),
    }
    client.update_color_image(item_id, &key, &image).await?;

    println!("{}", download_url);
    Ok(())
}
