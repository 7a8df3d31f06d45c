use clap::Parser;
use modelscope_image::config::DEFAULT_API_KEY_ENV;
use modelscope_image::{
    list_models, ApiKeySource, GenerationRequest, GenerationResult, ModelScopeClient,
    ModelScopeConfig,
};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Generate an image with the ModelScope API and save it locally.
///
/// The result is printed as JSON on stdout. The exit status is 0 whether or
/// not generation succeeded; check the `success` field.
#[derive(Debug, Parser)]
#[command(name = "modelscope-image", version)]
struct Args {
    /// Image description
    #[arg(long, required_unless_present = "list_models")]
    prompt: Option<String>,

    /// Model identifier
    #[arg(long, default_value = "Tongyi-MAI/Z-Image-Turbo")]
    model: String,

    /// Image size as WxH
    #[arg(long, default_value = "1024x1024")]
    size: String,

    /// Output filename
    #[arg(long, default_value = "result_image.jpg")]
    output: String,

    /// Output directory
    #[arg(long, default_value = "./outputs")]
    dir: PathBuf,

    /// Maximum time to wait for the task, in seconds
    #[arg(long, default_value_t = 300)]
    max_wait: u64,

    /// Environment variable holding the API key
    #[arg(long, default_value = DEFAULT_API_KEY_ENV)]
    api_key_env: String,

    /// Print the supported models and exit
    #[arg(long)]
    list_models: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    if args.list_models {
        let output = json!({ "success": true, "models": list_models() });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let result = run(args).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run(args: Args) -> GenerationResult {
    let source = ApiKeySource::with_primary(args.api_key_env);
    let client = match ModelScopeConfig::from_source(&source).and_then(ModelScopeClient::new) {
        Ok(client) => client,
        Err(e) => return e.into(),
    };

    let request = GenerationRequest::new(args.prompt.unwrap_or_default())
        .model(args.model)
        .size(args.size)
        .output_filename(args.output)
        .output_dir(args.dir)
        .max_wait(Duration::from_secs(args.max_wait));

    client.generate(&request).await
}
