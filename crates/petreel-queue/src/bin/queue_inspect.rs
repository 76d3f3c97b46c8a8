//! Inspect the Redis job queue: connectivity, list depths, waiting jobs.

use clap::Parser;
use petreel_models::VideoJob;
use petreel_queue::{QueueConfig, RedisJobQueue};

#[derive(Parser, Debug)]
#[command(name = "queue-inspect", about = "Inspect the PetReel Redis job queue")]
struct Args {
    /// Redis URL (defaults to REDIS_URL)
    #[arg(long)]
    redis_url: Option<String>,

    /// Maximum number of waiting jobs to list
    #[arg(long, default_value_t = 20)]
    limit: usize,

    /// Show the job the worker will pop next
    #[arg(long)]
    peek: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = QueueConfig::from_env()?;
    if let Some(url) = args.redis_url {
        config.redis_url = url;
    }

    println!("queue-inspect: connecting to {}", redact(&config.redis_url));
    let queue = RedisJobQueue::new(config.clone())?;
    let pong = queue
        .ping()
        .await
        .map_err(|e| anyhow::anyhow!("redis not reachable: {}", e))?;
    println!("queue-inspect: ping -> {}", pong);

    println!("{}: {} waiting", config.tasks_list, queue.len().await?);
    println!("{}: {} unclaimed", config.results_list, queue.results_len().await?);

    for (i, raw) in queue.pending_jobs(args.limit).await?.iter().enumerate() {
        match serde_json::from_str::<VideoJob>(raw) {
            Ok(job) => println!(
                "  [{}] task={} email={} photo={} created={}",
                i, job.task_id, job.email, job.photo_path, job.created_at
            ),
            Err(_) => println!("  [{}] unparseable: {}", i, raw),
        }
    }

    if args.peek {
        match queue.peek().await? {
            Some(raw) => println!("next job: {}", raw),
            None => println!("next job: none"),
        }
    }

    Ok(())
}

/// Hide the password part of a Redis URL.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => format!("{}://***{}", &url[..scheme], &url[at..]),
        _ => url.to_string(),
    }
}
