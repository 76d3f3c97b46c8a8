//! Upload a pet photo and wait for the generated video.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::Parser;
use petreel_client::{ClientConfig, PetReelClient, Photo, PollOutcome, PollPolicy, Poller};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "petreel-submit", version, about = "Submit a photo to PetReel and poll until done")]
struct Args {
    /// Photo of the pet
    photo: PathBuf,

    /// Birthday message / prompt
    #[arg(long, short)]
    message: String,

    /// Where the video link is sent
    #[arg(long, short)]
    email: String,

    /// API base URL (defaults to PETREEL_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Upload only, do not poll
    #[arg(long, default_value_t = false)]
    no_wait: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    let args = Args::parse();

    let mut config = ClientConfig::from_env();
    if let Some(url) = args.api_url {
        config.base_url = url;
    }
    let client = PetReelClient::new(config)?;

    let photo = Photo::from_path(&args.photo).await?;
    let task_id = client.upload(photo, &args.message, &args.email).await?;
    println!("task: {}", task_id);

    if args.no_wait {
        return Ok(());
    }

    let poller = Poller::new(client, PollPolicy::default());
    let stop = poller.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.store(true, Ordering::SeqCst);
        }
    });

    let mut last_stage = String::new();
    let outcome = poller
        .run(&task_id, |reply| {
            let stage = reply.stage.clone().unwrap_or_default();
            if stage != last_stage {
                println!("[{}] {}", reply.status, stage);
                last_stage = stage;
            }
        })
        .await;

    match outcome {
        PollOutcome::Completed { result_url } => {
            println!("done: {}", result_url);
            Ok(())
        }
        PollOutcome::Failed { reason } => anyhow::bail!("task {} failed: {}", task_id, reason),
        PollOutcome::Stopped => {
            println!("stopped; check again later with task id {}", task_id);
            Ok(())
        }
    }
}
