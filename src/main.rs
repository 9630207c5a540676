use std::{fs, path::PathBuf, sync::Arc, thread, time::Duration};

use clap::{Parser, Subcommand};

use autoreply_pro::{
    link::render_qr_ascii, monitor::SIMULATION_INTERVAL, GeminiClient, GeneratorConfig, LinkConfig,
    LinkSession, LinkState, LogSource, ReplyGenerator, Simulator,
};

/// Reference CLI for the AutoReply Pro core.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to a JSON file holding a GeneratorConfig.
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Override the business name.
    #[arg(long)]
    company: Option<String>,

    /// Override the working hours string.
    #[arg(long)]
    hours: Option<String>,

    /// Override the working days string.
    #[arg(long)]
    days: Option<String>,

    /// Override the business context.
    #[arg(long)]
    context: Option<String>,

    /// Override the reply tone (professional, short-and-smart, friendly, urgent).
    #[arg(long)]
    reply_type: Option<String>,

    /// Ask for a contact-info closing line.
    #[arg(long)]
    contact_info: bool,

    /// Choose a command to run.
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the standing auto-reply template.
    Generate,
    /// Generate a dynamic reply to a specific customer message.
    Reply { message: String },
    /// Run the device-link flow: show a QR code and simulate a scan.
    Link {
        /// Name recorded for the linked device.
        #[arg(long, default_value = "My Browser")]
        device_name: String,
        /// Probability of an injected handshake failure.
        #[arg(long)]
        failure_probability: Option<f64>,
    },
    /// Link a device and run the traffic simulator.
    Simulate {
        /// Number of fabricated incoming messages.
        #[arg(long, default_value_t = 3)]
        count: u32,
        /// Seconds between triggers.
        #[arg(long, default_value_t = SIMULATION_INTERVAL.as_secs())]
        interval_secs: u64,
    },
    /// Print the effective configuration.
    ShowConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Generate => {
            let generator = ReplyGenerator::new(Arc::new(GeminiClient::from_env()));
            match generator.generate_default_reply(&config) {
                Ok(text) => println!("{text}"),
                Err(err) => {
                    eprintln!("{err}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Reply { message } => {
            let generator = ReplyGenerator::new(Arc::new(GeminiClient::from_env()));
            println!("{}", generator.generate_reply_to(&message, &config));
        }
        Commands::Link {
            device_name,
            failure_probability,
        } => {
            let mut link_config = LinkConfig::default();
            if let Some(p) = failure_probability {
                link_config.failure_probability = p;
            }
            run_link_flow(link_config, &device_name)?;
        }
        Commands::Simulate {
            count,
            interval_secs,
        } => {
            run_simulation(config, count, Duration::from_secs(interval_secs))?;
        }
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<GeneratorConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config_file {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => GeneratorConfig::default(),
    };

    if let Some(company) = &cli.company {
        config = config.with_company_name(company);
    }
    if let Some(hours) = &cli.hours {
        config = config.with_working_hours(hours);
    }
    if let Some(days) = &cli.days {
        config = config.with_working_days(days);
    }
    if let Some(context) = &cli.context {
        config = config.with_context(context);
    }
    if let Some(reply_type) = &cli.reply_type {
        config = config.with_reply_type(reply_type.parse()?);
    }
    if cli.contact_info {
        config = config.with_contact_info(true);
    }

    Ok(config)
}

fn run_link_flow(
    link_config: LinkConfig,
    device_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = LinkSession::new(link_config);
    let mut rng = rand::thread_rng();

    let code = session.begin_linking(&mut rng)?;
    println!("{}", render_qr_ascii(&code)?);
    println!("Scan the code with your phone. Simulating scan...");

    session.scan(device_name)?;
    while session.poll(&mut rng) == LinkState::Linking {
        thread::sleep(Duration::from_millis(250));
    }

    match session.state() {
        LinkState::Linked => {
            let device = &session.devices()[0];
            println!(
                "Linked: {} ({}) from {} at {}",
                device.name, device.platform, device.location, device.last_active
            );
        }
        LinkState::Failed => eprintln!("Link failed. Run the link command to try again."),
        LinkState::Expired => eprintln!("Link code expired. Run the link command to try again."),
        state => eprintln!("Unexpected link state: {state}"),
    }

    Ok(())
}

fn run_simulation(
    config: GeneratorConfig,
    count: u32,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    // Fast-link a virtual device so the simulator has a connection to run
    // against; failure injection is disabled for this path.
    let link_config = LinkConfig {
        connect_delay: Duration::from_millis(200),
        failure_probability: 0.0,
        ..LinkConfig::default()
    };
    let mut session = LinkSession::new(link_config);
    let mut rng = rand::thread_rng();
    session.begin_linking(&mut rng)?;
    session.scan("CLI Simulator")?;
    while session.poll(&mut rng) == LinkState::Linking {
        thread::sleep(Duration::from_millis(50));
    }
    println!("Device linked. Simulating {count} incoming messages...\n");

    let generator = ReplyGenerator::new(Arc::new(GeminiClient::from_env()));
    let mut simulator = Simulator::new(generator, config);
    simulator.set_connected(session.state() == LinkState::Linked);

    for i in 0..count {
        simulator.trigger(&mut rng, LogSource::Simulator)?;
        if i + 1 < count {
            thread::sleep(interval);
            simulator.poll_completions();
        }
    }
    simulator.drain();

    for entry in simulator.log().entries().iter().rev() {
        println!("From {} at {}:", entry.from, entry.timestamp.time());
        println!("  Q: {}", entry.incoming_message);
        println!("  A: {}\n", entry.outbound_reply);
    }

    Ok(())
}
