use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use crossbeam_channel::unbounded;

use marauder::client::{Identity, PersonLookup, ResolutionClient, UpdateRequest};
use marauder::config::{LocatorConfig, PollInterval, SamplerBackend};
use marauder::fingerprint::FingerprintCache;
use marauder::output::{Formatter, OutputFormat, create_formatter};
use marauder::place::{Coordinate, MapId, PlaceId};
use marauder::worker::{Outcome, PollingWorker, WorkerEvent, WorkerOptions};

#[derive(Parser, Debug)]
#[command(name = "marauder")]
#[command(about = "Indoor Wi-Fi fingerprint location client", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Service base URL, overrides the config file
    #[arg(long)]
    server: Option<String>,

    /// Username reported to the service
    #[arg(short = 'u', long)]
    user: Option<String>,

    /// Signal sampler backend
    #[arg(long, value_enum)]
    sampler: Option<SamplerBackend>,

    /// Recorded fingerprints for the replay sampler
    #[arg(long)]
    replay: Option<String>,

    /// Output format for location results
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Take a reading and print the ranked candidates
    Locate,
    /// Tell the service where you are
    Post {
        place: String,
        #[arg(long)]
        status: Option<String>,
    },
    /// Bind a fresh reading to a place on the map
    Train {
        place: String,
        x: i32,
        y: i32,
        #[arg(long, default_value = "1")]
        map: MapId,
    },
    /// Show where the service last saw a user
    Query { username: String },
    /// Check whether a place has reference data
    Exists { place: String },
    /// Hide a user from the map (defaults to yourself)
    Cloak { username: Option<String> },
    /// Keep refreshing in the background and print every result
    Watch {
        #[arg(long)]
        interval: Option<PollInterval>,
        /// Stop after this many results
        #[arg(long)]
        count: Option<usize>,
    },
    /// Print the map page address
    Map,
    /// Print one encoded reading without contacting the service
    Scan,
}

fn load_config(args: &Args) -> Result<LocatorConfig> {
    let mut config = match &args.config {
        Some(path) => LocatorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LocatorConfig::default(),
    };

    if let Some(server) = &args.server {
        config.service.base_url = server.clone();
    }
    if let Some(backend) = args.sampler {
        config.sampler.backend = backend;
    }
    if let Some(replay) = &args.replay {
        config.sampler.replay_file = Some(replay.clone());
        if args.sampler.is_none() {
            config.sampler.backend = SamplerBackend::Replay;
        }
    }
    if let Some(user) = &args.user {
        config.identity.username = Some(user.clone());
    }
    if let Command::Watch {
        interval: Some(interval),
        ..
    } = &args.command
    {
        config.polling.interval = *interval;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn identity(config: &LocatorConfig) -> Result<Identity> {
    Identity::discover(config.identity.username.as_deref())
        .context("Cannot determine username; pass --user or set identity.username")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = load_config(&args)?;

    let mut client =
        ResolutionClient::from_config(&config).context("Failed to set up location client")?;
    let mut cache = FingerprintCache::new();
    let formatter = create_formatter(args.format, args.verbose > 0);

    match args.command {
        Command::Map => println!("{}", config.service.map_url),
        Command::Locate => {
            let me = identity(&config)?;
            let candidates = client.update(&mut cache, &me.username, &UpdateRequest::locate())?;
            if let Some(header) = formatter.header() {
                println!("{}", header);
            }
            println!("{}", formatter.format(&candidates));
        }
        Command::Post { place, status } => {
            let me = identity(&config)?;
            let place = PlaceId::new(place);
            let mut request = UpdateRequest::post(place.clone());
            request.status = status;
            client.update(&mut cache, &me.username, &request)?;
            println!("Posted {} ({})", place.readable_name(), place);
        }
        Command::Train { place, x, y, map } => {
            let me = identity(&config)?;
            let place = PlaceId::new(place);
            let ack = client.train(&mut cache, &me.username, &place, &Coordinate::new(x, y, map))?;
            println!("{}", ack);
        }
        Command::Query { username } => match client.query_person(&username)? {
            PersonLookup::Found(record) => println!(
                "{} is at {} ({}) since {}{}",
                record.username,
                record.place.readable_name(),
                record.place,
                record.last_update,
                if record.status.is_empty() {
                    String::new()
                } else {
                    format!(": {}", record.status)
                }
            ),
            PersonLookup::Nobody => println!("{} is not on the map", username),
        },
        Command::Exists { place } => {
            let place = PlaceId::new(place);
            let exists = client.check_place_exists(&place)?;
            println!("{}: {}", place, if exists { "known" } else { "unknown" });
        }
        Command::Cloak { username } => {
            let username = match username {
                Some(username) => username,
                None => identity(&config)?.username,
            };
            println!("{}", client.cloak(&username)?);
        }
        Command::Watch { count, .. } => {
            let me = identity(&config)?;
            watch(client, me, &config, count, formatter.as_ref())?;
        }
        Command::Scan => println!("{}", client.sample()?),
    }

    Ok(())
}

fn watch(
    client: ResolutionClient,
    me: Identity,
    config: &LocatorConfig,
    count: Option<usize>,
    formatter: &dyn Formatter,
) -> Result<()> {
    let (event_tx, event_rx) = unbounded();
    let options = WorkerOptions::from(&config.polling);
    log::info!(
        "Watching location of {} every {}",
        me.username,
        config.polling.interval
    );
    let handle = PollingWorker::spawn(client, me, options, event_tx)?;

    if let Some(header) = formatter.header() {
        println!("{}", header);
    }

    let mut seen = 0;
    for event in event_rx.iter() {
        match event {
            WorkerEvent::Located(Outcome::Completed(candidates)) => {
                println!("{}", formatter.format(&candidates));
                seen += 1;
            }
            WorkerEvent::Located(Outcome::Failed(e)) => {
                if e.is_transient() {
                    eprintln!("Refresh failed, will retry: {}", e);
                } else {
                    eprintln!("Refresh failed: {}", e);
                }
                seen += 1;
            }
            WorkerEvent::Posted {
                outcome: Outcome::Failed(e),
                ..
            } => eprintln!("Post failed: {}", e),
            WorkerEvent::Stopped => bail!("Location worker stopped unexpectedly"),
            _ => {}
        }

        if count.is_some_and(|limit| seen >= limit) {
            break;
        }
    }

    handle.shutdown();
    Ok(())
}
