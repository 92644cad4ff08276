use anyhow::{Context, bail};
use clap::Parser;
use neonfetch::config::MAX_MEMORY_MB;
use neonfetch::{Config, ExtractionResult, FetchState, Session, VERSION};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "neonfetch",
    version = VERSION,
    about = "Resolve video URLs and download the media",
    long_about = "Resolve direct media links and hosting pages to a playable stream,\n\
    then download each one into memory with same-site Referer/Origin headers.\n\n\
    Examples:\n\
      neonfetch https://cdn.example/movie.php?name=clip.mp4   # Download a direct link\n\
      neonfetch -i https://video.example/watch?v=42           # Show info only\n\
      neonfetch --batch urls.txt -d ./videos                  # One URL per line\n\
      neonfetch --max-mb 100 https://cdn.example/a.mp4        # Lower the memory ceiling"
)]
struct Args {
    /// URLs to fetch
    #[arg(help = "Direct media links or video page URLs")]
    urls: Vec<String>,

    /// File with one URL per line
    #[arg(short = 'b', long = "batch", help = "File with one URL per line")]
    batch: Option<PathBuf>,

    /// Download to specified directory
    #[arg(short = 'd', long = "dir", help = "Download to specified directory")]
    output_dir: Option<PathBuf>,

    /// Extract and show information only, no download
    #[arg(
        short = 'i',
        long = "info-only",
        help = "Extract and show information only, no download"
    )]
    info_only: bool,

    /// Memory ceiling per download in megabytes
    #[arg(long = "max-mb", default_value_t = MAX_MEMORY_MB, help = "Memory ceiling per download in megabytes")]
    max_mb: u64,

    /// Print the diagnostics snapshot as JSON when done
    #[arg(long = "diagnostics", help = "Print the diagnostics snapshot as JSON when done")]
    diagnostics: bool,
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn display_info(index: usize, info: &ExtractionResult) {
    println!("[{}] {}", index + 1, info.title);
    println!("    File: {}", info.filename);
    println!("    Stream: {}", info.direct_url);
    if let Some(uploader) = &info.uploader {
        println!("    Uploader: {}", uploader);
    }
    if let Some(duration) = info.duration {
        println!("    Duration: {}", format_duration(duration));
    }
    if let Some(thumbnail) = &info.thumbnail {
        println!("    Thumbnail: {}", thumbnail);
    }
    if let Some(size) = info.content_length {
        println!("    Size: {} bytes", size);
    }
}

fn save(session: &Session, index: usize, dir: &Path) -> anyhow::Result<PathBuf> {
    let artifact = session.artifact(index)?;
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let path = dir.join(artifact.disk_name());
    fs::write(&path, artifact.data).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(path)
}

fn read_input(args: &Args) -> anyhow::Result<String> {
    let mut input = args.urls.join("\n");
    if let Some(batch) = &args.batch {
        let text = fs::read_to_string(batch)
            .with_context(|| format!("cannot read batch file {}", batch.display()))?;
        input.push('\n');
        input.push_str(&text);
    }
    Ok(input)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let input = read_input(&args)?;

    let config = Config::default().with_max_mb(args.max_mb);
    let mut session = Session::with_ytdlp(config);
    session.set_queue_text(&input);
    if session.is_empty() {
        bail!("no URLs given");
    }

    let dir = args.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut failed = 0;

    for index in 0..session.len() {
        if args.info_only {
            match session.resolve(index).await {
                Ok(info) => display_info(index, info),
                Err(e) => {
                    eprintln!("✗ [{}] {}", index + 1, e);
                    failed += 1;
                }
            }
            println!();
            continue;
        }

        println!("Fetching [{}]: {}", index + 1, session.items()[index].input);
        match session.trigger_fetch(index).await? {
            FetchState::Ready(_) => {
                if let Some(info) = &session.items()[index].resolution {
                    display_info(index, info);
                }
                match save(&session, index, &dir) {
                    Ok(path) => println!("✓ Saved to: {}", path.display()),
                    Err(e) => {
                        eprintln!("✗ [{}] {:#}", index + 1, e);
                        failed += 1;
                    }
                }
            }
            FetchState::Failed(e) => {
                eprintln!("✗ [{}] {}", index + 1, e);
                failed += 1;
            }
            FetchState::Idle | FetchState::Fetching => {}
        }
        println!();
    }

    if args.diagnostics {
        println!("{}", serde_json::to_string_pretty(&session.diagnostics())?);
    }

    if failed > 0 {
        bail!("{} of {} item(s) failed", failed, session.len());
    }
    println!("Download completed successfully!");
    Ok(())
}
