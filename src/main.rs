use video_caption::headless::{HeadlessPage, Playback};
use video_caption::messenger::{BackgroundRequest, InboundEvent, Messenger};
use video_caption::protocol::BackgroundReply;
use video_caption::{
    serialiser, CaptionSource, CaptionStore, HttpCaptionSource, Session, SessionConfig,
    SrtCaptionSource,
};

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();
    match run().await {
        Ok(()) => (),
        Err(err) => {
            eprintln!("An error occurred: {}", err);
            for cause in err.chain().skip(1) {
                eprintln!("    {}", cause);
            }
            std::process::exit(1);
        }
    }
}

#[derive(ClapParser)]
#[command(about = "Run a caption overlay session against a simulated video page")]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Read session settings from a JSON file. Flags below override it."
    )]
    config: Option<PathBuf>,
    #[arg(
        long,
        value_name = "URL",
        default_value = "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        help = "Address of the simulated page; the video id is its `v` parameter."
    )]
    url: String,
    #[arg(long, default_value = "", help = "Title of the simulated video.")]
    title: String,
    #[arg(long, help = "Simulate a page without a video element.")]
    no_video: bool,
    #[arg(long, value_name = "MS", default_value_t = 0, help = "Playback position at startup.")]
    start_ms: u64,
    #[arg(long, default_value_t = 1.0, help = "Playback speed of the simulated video.")]
    rate: f64,
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Serve captions from a local SRT file instead of the caption service."
    )]
    srt: Option<PathBuf>,
    #[arg(
        long,
        value_name = "URL",
        env = "VIDEO_CAPTION_SERVICE",
        help = "Base URL of the caption service."
    )]
    service: Option<String>,
    #[arg(long, value_name = "ID", help = "Extension id; its origin is always trusted.")]
    extension_id: Option<String>,
    #[arg(
        long = "allow-origin",
        value_name = "ORIGIN",
        help = "Only accept messages from this origin. May be repeated."
    )]
    allow_origins: Vec<String>,
    #[arg(long, value_name = "MS", help = "Tick period of the caption timer.")]
    tick_ms: Option<u64>,
    #[arg(long, help = "Leave the last caption up while playback is between cues.")]
    keep_text_in_gaps: bool,
    #[arg(long, help = "Stop as soon as standard input is exhausted.")]
    exit_on_eof: bool,
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Write the captions loaded during the session to an SRT file on exit."
    )]
    export: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::from_file(path)
            .with_context(|| format!("Failed to read config file: '{}'", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(service) = &cli.service {
        config.caption_service = service.clone();
    }
    if let Some(id) = &cli.extension_id {
        config.extension_id = id.clone();
    }
    if !cli.allow_origins.is_empty() {
        config.allowed_origins = cli.allow_origins.clone();
    }
    if let Some(ms) = cli.tick_ms {
        config.tick_period_ms = ms;
    }
    if cli.keep_text_in_gaps {
        config.clear_on_gap = false;
    }
    Ok(config)
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let source: Arc<dyn CaptionSource> = match &cli.srt {
        Some(path) => {
            std::fs::metadata(path)
                .with_context(|| format!("Failed to open SRT file: '{}'", path.display()))?;
            Arc::new(SrtCaptionSource::new(path))
        }
        None => Arc::new(HttpCaptionSource::new(config.caption_service.clone())),
    };

    let playback = if cli.no_video {
        None
    } else {
        Some(Playback::playing_from(cli.start_ms as f64 / 1000.0, cli.rate))
    };
    let (page, page_events) = HeadlessPage::new(cli.url.clone(), cli.title.clone(), playback);
    let (messenger, ports) = Messenger::channel(&config);

    tokio::spawn(print_all("surface", ports.surface));
    tokio::spawn(print_all("editor", ports.editor));
    tokio::spawn(print_all("page", page_events));
    tokio::spawn(answer_background(ports.background));

    let (inbound_tx, mut inbound) = mpsc::unbounded_channel();
    tokio::spawn(read_stdin(inbound_tx, !cli.exit_on_eof));

    let mut session = Session::new(config, page, CaptionStore::new(source), messenger);
    session.run(&mut inbound).await;

    if let Some(path) = &cli.export {
        serialiser::export_srt(session.store().cues(), path)
            .with_context(|| format!("Failed to export captions to '{}'", path.display()))?;
        info!(path = %path.display(), "captions exported");
    }

    Ok(())
}

#[derive(Serialize)]
struct OutputLine<'a, T> {
    channel: &'a str,
    message: T,
}

fn print_line<T: Serialize>(channel: &str, message: T) {
    match serde_json::to_string(&OutputLine { channel, message }) {
        Ok(line) => println!("{}", line),
        Err(err) => warn!(channel, "could not serialise output: {}", err),
    }
}

async fn print_all<T>(channel: &'static str, mut rx: mpsc::UnboundedReceiver<T>)
where
    T: Serialize + Send + 'static,
{
    while let Some(message) = rx.recv().await {
        print_line(channel, message);
    }
}

/// Stands in for the extension background: acknowledges every request.
async fn answer_background(mut rx: mpsc::UnboundedReceiver<BackgroundRequest>) {
    while let Some(request) = rx.recv().await {
        print_line("background", request.message.to_wire());
        let _ = request.reply.send(BackgroundReply { success: true });
    }
}

async fn read_stdin(tx: mpsc::UnboundedSender<InboundEvent>, linger: bool) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => match InboundEvent::from_line(&line) {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
                Err(err) => warn!("skipping input line: {}", err),
            },
            Ok(None) => break,
            Err(err) => {
                warn!("failed to read standard input: {}", err);
                break;
            }
        }
    }

    if linger {
        info!("input finished, press Ctrl-C to end the session");
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("cannot wait for Ctrl-C: {}", err);
        }
    }
    drop(tx);
}

