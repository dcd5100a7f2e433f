use std::{io, path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use vision_ocr::{
    Config, VisionClient,
    auth::{self, ConsolePrompt},
    config::normalize_flag_style,
    constants::{DEFAULT_TOKEN_CACHE, VISION_ANNOTATE_ENDPOINT},
    image_processor, output,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a service account credentials file
    #[arg(long = "service_account", allow_hyphen_values = true, visible_alias = "service-account", value_name = "FILE")]
    service_account: Option<String>,

    /// Path to a client ID credentials file
    #[arg(long = "client_id", allow_hyphen_values = true, visible_alias = "client-id", value_name = "FILE")]
    client_id: Option<String>,

    /// Path to an image with text to be OCRed
    #[arg(long, allow_hyphen_values = true, value_name = "FILE")]
    input: Option<String>,

    /// Where the OAuth2 token is cached between runs
    #[arg(long = "token_cache", allow_hyphen_values = true, visible_alias = "token-cache", value_name = "FILE", default_value = DEFAULT_TOKEN_CACHE)]
    token_cache: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,vision_ocr=info,ocr=info"),
    )
    .init();

    let args = Args::parse_from(normalize_flag_style(std::env::args_os()));

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::new(
        args.service_account.as_deref(),
        args.client_id.as_deref(),
        args.input.as_deref(),
        args.token_cache,
    )?;

    let http = vision_ocr::http_client().context("Failed to create client")?;
    let mut prompt = ConsolePrompt::stdio();
    let tokens = auth::resolve(&config, &http, &mut prompt)
        .await
        .context("Failed to create client")?;
    let mut client = VisionClient::with_http(http, VISION_ANNOTATE_ENDPOINT, tokens);

    let image = image_processor::process_image_from_path(&config.input)
        .context("Failed to read file")?;

    let texts = client
        .detect_texts(&image)
        .await
        .context("Error detecting text")?;

    output::write_texts(&mut io::stdout().lock(), &texts).context("Failed to write results")?;
    Ok(())
}
