use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use cli::{utils::*, PollClient};
use log::info;
use poll_service::types::{CreatePollRequest, PollView, VoteRequest};
use tokio::runtime::Builder;

#[derive(Clone, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(
        short,
        long,
        env = "POLL_SERVICE_URL",
        default_value = "http://localhost:3000",
        value_parser = parse_base_url
    )]
    pub base_url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Clone)]
pub enum Commands {
    List {
        #[arg(long, help = "Only polls created by this user")]
        created_by: Option<String>,
    },
    Summary {},
    Show {
        #[arg(long, help = "Id of the poll")]
        id: String,

        #[arg(long, help = "Include this user's vote state")]
        user_id: Option<String>,
    },
    Create {
        #[arg(long)]
        title: String,

        #[arg(long = "option", required = true, help = "Option text, repeat for each option")]
        options: Vec<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long, help = "Allow selecting several options in one vote")]
        multiple: bool,

        #[arg(long, value_parser = parse_rfc3339, help = "Closing time, RFC3339")]
        ends_at: Option<DateTime<Utc>>,
    },
    Vote {
        #[arg(long, help = "Id of the poll")]
        id: String,

        #[arg(long, value_delimiter = ',', value_parser = parse_option_id, required = true)]
        options: Vec<String>,

        #[arg(long, help = "Vote as this user, anonymous when omitted")]
        user_id: Option<String>,
    },
    Tally {
        #[arg(long, help = "Id of the poll")]
        id: String,
    },
    Close {
        #[arg(long, help = "Id of the poll")]
        id: String,
    },
    Stats {
        #[arg(long, env = "METRICS_AUTH_TOKEN")]
        token: String,
    },
}

fn print_poll(poll: &PollView) {
    let status = if poll.is_active { "open" } else { "closed" };
    println!("{} [{}] {}", poll.id, status, poll.title);
    for option in &poll.options {
        println!("  {:>3}  {:<40} {}", option.id, option.text, option.votes);
    }
    println!("  total votes: {}", poll.total_votes);
    if let Some(has_voted) = poll.has_voted {
        let choices = poll.user_votes.clone().unwrap_or_default();
        println!("  has voted: {} {:?}", has_voted, choices);
    }
}

fn main() -> Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(false)
        .try_init();

    let runtime = Builder::new_multi_thread().enable_all().build()?;
    let cli = Cli::parse();
    let client = PollClient::new(&cli.base_url)?;

    runtime.block_on(async move {
        match cli.command {
            Commands::List { created_by } => {
                let list = client.list_polls(created_by.as_deref()).await?;
                info!("{} poll(s)", list.polls.len());
                for poll in &list.polls {
                    print_poll(poll);
                }
            }
            Commands::Summary {} => {
                let summary = client.summary().await?;
                println!("total polls:  {}", summary.total_polls);
                println!("active polls: {}", summary.active_polls);
                println!("total votes:  {}", summary.total_votes);
            }
            Commands::Show { id, user_id } => {
                let poll = client.get_poll(&id, user_id.as_deref()).await?;
                print_poll(&poll);
            }
            Commands::Create {
                title,
                options,
                description,
                multiple,
                ends_at,
            } => {
                info!("Creating poll {:?}...", title);
                let poll = client
                    .create_poll(&CreatePollRequest {
                        title,
                        description,
                        options,
                        allow_multiple_votes: multiple,
                        ends_at,
                        created_by: None,
                    })
                    .await?;
                info!("Poll created: {}", poll.id);
                print_poll(&poll);
            }
            Commands::Vote {
                id,
                options,
                user_id,
            } => {
                info!("Voting on poll {}...", id);
                let resp = client
                    .vote(
                        &id,
                        &VoteRequest {
                            option_ids: options,
                            user_id,
                        },
                    )
                    .await?;
                info!("{}", resp.message);
                println!(
                    "voted for {:?}, poll total {}",
                    resp.voted_options, resp.poll_total_votes
                );
            }
            Commands::Tally { id } => {
                let tally = client.tally(&id).await?;
                println!("== Tally for poll {} ==", tally.poll_id);
                for (option_id, votes) in &tally.votes {
                    println!("  {:>3}  {}", option_id, votes);
                }
                println!("  total votes: {}", tally.total_votes);
            }
            Commands::Close { id } => {
                info!("Closing poll {}...", id);
                let poll = client.close_poll(&id).await?;
                print_poll(&poll);
            }
            Commands::Stats { token } => {
                let stats = client.stats(&token).await?;
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
        }

        Ok::<(), anyhow::Error>(())
    })
}
