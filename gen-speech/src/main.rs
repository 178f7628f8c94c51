//! gen-speech - Convert long text or SSML into a single audio file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gen_speech::audio::Assembler;
use gen_speech::{GenSpeechConfig, Pipeline, PipelineEvent};
use indicatif::{ProgressBar, ProgressStyle};
use speech_client::{
    AudioFormat, Config, InputType, ProviderConfig, ProviderKind, SynthesisOptions, get_provider,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "gen-speech")]
#[command(about = "Convert text or SSML into a single audio file using cloud TTS", long_about = None)]
#[command(version)]
struct Args {
    /// Input text file, or '-' for stdin
    input: Option<PathBuf>,

    /// Output audio file (default: <input-name>.<format>)
    output: Option<PathBuf>,

    /// Provider to use (aws, gcp)
    #[arg(short, long)]
    provider: Option<String>,

    /// Output format (mp3, ogg, pcm)
    #[arg(short, long)]
    format: Option<String>,

    /// Voice name or id
    #[arg(long)]
    voice: Option<String>,

    /// Language code (e.g. en-US)
    #[arg(long)]
    language: Option<String>,

    /// Voice gender (gcp)
    #[arg(long)]
    gender: Option<String>,

    /// Synthesis engine (aws)
    #[arg(long)]
    engine: Option<String>,

    /// Input type (text, ssml)
    #[arg(long = "type")]
    input_type: Option<String>,

    /// Speaking rate (0.25-4.0, gcp)
    #[arg(long)]
    speed: Option<f32>,

    /// Pitch in semitones (-20.0-20.0, gcp)
    #[arg(long)]
    pitch: Option<f32>,

    /// Sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Volume gain in dB (-96.0-16.0, gcp)
    #[arg(long)]
    gain: Option<f32>,

    /// Audio effects profile (gcp, repeatable)
    #[arg(long = "effect")]
    effects: Vec<String>,

    /// Pronunciation lexicon name (aws, repeatable)
    #[arg(long = "lexicon")]
    lexicons: Vec<String>,

    /// Service region (aws)
    #[arg(long)]
    region: Option<String>,

    /// Maximum synthesis requests in flight
    #[arg(long)]
    throttle: Option<usize>,

    /// Maximum characters per request (default: provider limit)
    #[arg(long)]
    max_chars: Option<usize>,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default provider
    SetProvider {
        /// Provider name (aws, gcp)
        name: String,
    },
    /// Set default output format
    SetFormat {
        /// Format (mp3, ogg, pcm)
        format: String,
    },
    /// Set default input type
    SetType {
        /// Input type (text, ssml)
        input_type: String,
    },
    /// Set default voice
    SetVoice {
        /// Voice name or id
        voice: String,
    },
    /// Set default number of requests in flight
    SetConcurrency {
        /// Value (at least 1)
        value: usize,
    },
    /// Set the FFmpeg program used for encoded output
    SetFfmpeg {
        /// Program name or path
        path: PathBuf,
    },
    /// Store an API key for a provider
    SetApiKey {
        /// Provider name (gcp)
        provider: String,
        /// API key
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if args.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    if let Some(Commands::Config { action }) = &args.command {
        return handle_config_command(action);
    }

    let input_path = args
        .input
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Input path is required. Run 'gen-speech --help' for usage."))?;

    let config = GenSpeechConfig::load().context("Failed to load configuration")?;
    let providers = Config::load().context("Failed to load provider configuration")?;

    // Format and provider problems are reported before any input is read
    let format: AudioFormat = match &args.format {
        Some(format) => format.parse().context("Invalid output format")?,
        None => config.format,
    };
    let input_type: InputType = match &args.input_type {
        Some(input_type) => input_type.parse().context("Invalid input type")?,
        None => config.input_type,
    };

    let provider_name = args
        .provider
        .clone()
        .or_else(|| config.provider.clone())
        .unwrap_or_else(|| providers.default_provider.clone());
    let kind = ProviderKind::from_str(&provider_name)?;

    let mut provider_config = providers
        .get_provider_config(kind.config_key())
        .cloned()
        .unwrap_or_default();
    if let Some(region) = &args.region {
        provider_config.region = Some(region.clone());
    }
    let provider = get_provider(kind, format, Some(&provider_config))
        .with_context(|| format!("Failed to initialize provider '{}'", provider_name))?;

    let options = build_options(&args, &config, format, input_type);

    let output_path = args.output.clone().unwrap_or_else(|| {
        if input_path.as_os_str() == "-" {
            PathBuf::from(format!("speech.{}", format.extension()))
        } else {
            input_path.with_extension(format.extension())
        }
    });

    let input = read_input(&input_path)?;

    let mut pipeline = Pipeline::new(Arc::from(provider), options)
        .with_concurrency(args.throttle.unwrap_or(config.concurrency))
        .with_assembler(Assembler::new(&config.ffmpeg));
    if let Some(max_chars) = args.max_chars.or(config.max_chars) {
        pipeline = pipeline.with_max_chars(max_chars);
    }

    if args.debug {
        eprintln!("Provider: {}", provider_name);
        eprintln!("Format: {}", format);
        eprintln!("Input type: {}", input_type);
        eprintln!("Max characters: {}", pipeline.max_chars());
        eprintln!("Output: {}", output_path.display());
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );

    let result = pipeline
        .run(&input, &output_path, |event| match event {
            PipelineEvent::Split { chunks } => {
                pb.set_length(chunks as u64);
                pb.set_message(format!("synthesizing with {}", provider_name));
            }
            PipelineEvent::Synthesized(progress) => {
                pb.set_position(progress.completed as u64);
            }
            PipelineEvent::ManifestWritten { .. } => {
                pb.set_message("assembling");
            }
            PipelineEvent::Assembled { .. } => {
                pb.set_message("cleaning up");
            }
            PipelineEvent::Cleaned => {
                pb.finish_with_message("done");
            }
        })
        .await;

    let output_path = match result {
        Ok(path) => path,
        Err(e) => {
            pb.abandon();
            return Err(e).context("Failed to generate speech");
        }
    };

    // Get output file size
    let metadata = std::fs::metadata(&output_path)?;
    let size_mb = metadata.len() as f64 / (1024.0 * 1024.0);

    eprintln!("Output: {} ({:.1} MB)", output_path.display(), size_mb);

    Ok(())
}

/// Merge command-line flags over configured defaults.
fn build_options(
    args: &Args,
    config: &GenSpeechConfig,
    format: AudioFormat,
    input_type: InputType,
) -> SynthesisOptions {
    let mut options = SynthesisOptions::new(format).with_input_type(input_type);

    if let Some(voice) = args.voice.as_ref().or(config.voice.as_ref()) {
        options = options.with_voice(voice.as_str());
    }
    if let Some(language) = args.language.as_ref().or(config.language.as_ref()) {
        options = options.with_language(language.as_str());
    }
    if let Some(speed) = args.speed {
        options = options.with_speed(speed);
    }
    if let Some(pitch) = args.pitch {
        options = options.with_pitch(pitch);
    }
    if let Some(gain) = args.gain {
        options = options.with_gain(gain);
    }
    if let Some(sample_rate) = args.sample_rate {
        options = options.with_sample_rate(sample_rate);
    }
    options.gender = args.gender.clone();
    options.engine = args.engine.clone().or_else(|| config.engine.clone());
    options.effects = args.effects.clone();
    options.lexicons = args.lexicons.clone();
    options
}

/// Read the whole input from a file, or from stdin for '-'.
fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read stdin")?;
        return Ok(input);
    }

    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = GenSpeechConfig::load()?;
            println!("Configuration file: {:?}", GenSpeechConfig::config_path()?);
            println!();
            match &config.provider {
                Some(provider) => println!("provider = \"{}\"", provider),
                None => println!("provider = (from providers.toml)"),
            }
            println!("format = \"{}\"", config.format);
            println!("input_type = \"{}\"", config.input_type);
            match &config.voice {
                Some(voice) => println!("voice = \"{}\"", voice),
                None => println!("voice = (provider default)"),
            }
            if let Some(language) = &config.language {
                println!("language = \"{}\"", language);
            }
            if let Some(engine) = &config.engine {
                println!("engine = \"{}\"", engine);
            }
            println!("concurrency = {}", config.concurrency);
            match config.max_chars {
                Some(max) => println!("max_chars = {}", max),
                None => println!("max_chars = (provider limit)"),
            }
            println!("ffmpeg = \"{}\"", config.ffmpeg.display());

            let providers = Config::load()?;
            println!();
            println!("Provider file: {:?}", Config::config_path()?);
            println!("default_provider = \"{}\"", providers.default_provider);
            let mut names: Vec<&String> = providers.providers.keys().collect();
            names.sort();
            for name in names {
                let has_key = providers.providers[name].api_key.is_some();
                println!("[{}] api_key = {}", name, if has_key { "(set)" } else { "(none)" });
            }
        }
        ConfigAction::SetProvider { name } => {
            let kind = ProviderKind::from_str(name)?;
            let mut config = GenSpeechConfig::load()?;
            config.provider = Some(kind.config_key().to_string());
            config.save()?;
            println!("Default provider set to: {}", kind.config_key());
        }
        ConfigAction::SetFormat { format } => {
            let parsed: AudioFormat = format.parse()?;
            let mut config = GenSpeechConfig::load()?;
            config.format = parsed;
            config.save()?;
            println!("Default format set to: {}", parsed);
        }
        ConfigAction::SetType { input_type } => {
            let parsed: InputType = input_type.parse()?;
            let mut config = GenSpeechConfig::load()?;
            config.input_type = parsed;
            config.save()?;
            println!("Default input type set to: {}", parsed);
        }
        ConfigAction::SetVoice { voice } => {
            let mut config = GenSpeechConfig::load()?;
            config.voice = Some(voice.clone());
            config.save()?;
            println!("Default voice set to: {}", voice);
        }
        ConfigAction::SetConcurrency { value } => {
            let mut config = GenSpeechConfig::load()?;
            config.concurrency = (*value).max(1);
            config.save()?;
            println!("Default concurrency set to: {}", config.concurrency);
        }
        ConfigAction::SetFfmpeg { path } => {
            let mut config = GenSpeechConfig::load()?;
            config.ffmpeg = path.clone();
            config.save()?;
            println!("FFmpeg program set to: {}", path.display());
        }
        ConfigAction::SetApiKey { provider, key } => {
            let kind = ProviderKind::from_str(provider)?;
            let mut providers = Config::load()?;
            providers
                .providers
                .entry(kind.config_key().to_string())
                .or_insert_with(ProviderConfig::default)
                .api_key = Some(key.clone());
            providers.save()?;
            println!("API key stored for: {}", kind.config_key());
        }
    }
    Ok(())
}
