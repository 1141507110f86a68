use anyhow::Result;
use clap::Parser;
use live_transcriber::{
    logging, Config, ConsoleSink, DeviceFactory, DeviceSource, ResponseSink, SessionController,
    SessionReport, TeeSink, VertexEndpoint, VertexTransport, WavSink, WavSinkConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Exit code for settings the session cannot start with
const EXIT_CONFIG: u8 = 2;

/// How long blocking workers get to finish once the session is over
const RUNTIME_SHUTDOWN: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "live-transcriber")]
#[command(about = "Stream microphone audio to the Gemini Live API and print the responses")]
struct Args {
    /// Config file (toml, yaml or json)
    #[arg(short, long)]
    config: Option<String>,

    /// Google Cloud project ID
    #[arg(long)]
    project_id: Option<String>,

    /// Google Cloud region
    #[arg(long)]
    region: Option<String>,

    /// Live model ID
    #[arg(long)]
    model_id: Option<String>,

    /// Response modality (text or audio)
    #[arg(long)]
    modality: Option<String>,

    /// Prebuilt voice for audio responses
    #[arg(long)]
    voice: Option<String>,

    /// System instruction sent at session setup
    #[arg(long)]
    system_instruction: Option<String>,

    /// Stream a 16-bit PCM WAV file instead of the microphone
    #[arg(short, long)]
    input_file: Option<PathBuf>,

    /// Write received audio to this WAV file
    #[arg(long)]
    save_audio: Option<PathBuf>,

    /// Log format (text or json)
    #[arg(long)]
    log_format: Option<String>,
}

impl Args {
    fn apply(&self, cfg: &mut Config) {
        if let Some(v) = &self.project_id {
            cfg.project_id = v.clone();
        }
        if let Some(v) = &self.region {
            cfg.region = v.clone();
        }
        if let Some(v) = &self.model_id {
            cfg.model_id = v.clone();
        }
        if let Some(v) = &self.modality {
            cfg.response_modality = v.clone();
        }
        if let Some(v) = &self.voice {
            cfg.voice = v.clone();
        }
        if let Some(v) = &self.system_instruction {
            cfg.system_instruction = v.clone();
        }
        if let Some(v) = &self.log_format {
            cfg.log_format = v.clone();
        }
    }
}

fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(args));

    // A device read stuck in the blocking pool must not hold the process open
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN);
    result
}

async fn run(args: Args) -> Result<ExitCode> {
    let mut cfg = match Config::load(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };
    args.apply(&mut cfg);

    if let Err(e) = cfg.validate() {
        eprintln!("Configuration error: {}", e);
        return Ok(ExitCode::from(EXIT_CONFIG));
    }

    logging::init(&cfg.log_format);
    info!("Live Transcriber v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Project: {}, region: {}, model: {}",
        cfg.project_id, cfg.region, cfg.model_id
    );

    let source = match &args.input_file {
        Some(path) => DeviceSource::File {
            path: path.clone(),
            realtime: true,
        },
        None => DeviceSource::Microphone,
    };
    let devices = DeviceFactory::create(source);
    let transport = Arc::new(VertexTransport::new(VertexEndpoint::from_settings(&cfg)));

    let controller = match SessionController::from_settings(&cfg, transport, devices) {
        Ok(controller) => controller,
        Err(e) => {
            error!("{}", e);
            return Ok(ExitCode::from(e.exit_code()));
        }
    };

    let sink: Box<dyn ResponseSink> = match &args.save_audio {
        Some(path) => {
            let mut wav = WavSinkConfig::new(path);
            wav.sample_rate = cfg.output_sample_rate;
            Box::new(TeeSink::new(ConsoleSink::stdout(), WavSink::create(wav)?))
        }
        None => Box::new(ConsoleSink::stdout()),
    };

    let stop = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match controller.run(sink, stop).await {
        Ok(report) => {
            print_summary(&report);
            Ok(ExitCode::from(report.exit_code()))
        }
        Err(e) => {
            error!("Session failed: {}", e);
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}

fn print_summary(report: &SessionReport) {
    let stats = &report.stats;
    info!("Session {} ended: {:?}", report.session_id, report.stop_reason);
    info!("  Duration: {:.1}s", stats.duration_secs);
    info!(
        "  Frames: {} captured, {} sent",
        stats.frames_captured, stats.frames_sent
    );
    info!(
        "  Turns: {} ({} empty), {} text parts, {} audio bytes",
        stats.turns_completed, stats.empty_turns, stats.text_parts, stats.audio_bytes
    );
    if stats.decode_errors > 0 {
        info!("  Undecodable events: {}", stats.decode_errors);
    }
}
