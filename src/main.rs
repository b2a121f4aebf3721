#[macro_use]
extern crate tracing;

use std::{net::IpAddr, net::SocketAddr, path::PathBuf, time::Duration};

use rackled::models::ConfigExt;
use structopt::StructOpt;
use tokio::runtime::Builder;
use tokio::signal;

#[derive(Debug, StructOpt)]
struct Opts {
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u32,
    #[structopt(
        short,
        long = "config",
        env = "LED_CONFIG_PATH",
        default_value = "led_strip_config.json"
    )]
    config_path: PathBuf,
    #[structopt(long)]
    dump_config: bool,
    #[structopt(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    address: IpAddr,
    #[structopt(short, long, env = "PORT", default_value = "3000")]
    port: u16,
    /// JSON state endpoint of the controller, e.g. http://192.168.1.50/json/state
    #[structopt(long, env = "WLED_API_URL")]
    device_url: Option<reqwest::Url>,
    #[structopt(long)]
    device_timeout_ms: Option<u64>,
    /// Controller host for the live-view proxy
    #[structopt(long, env = "WLED_LAN_IP")]
    ws_host: Option<String>,
    #[structopt(long, env = "WLED_WS_PORT", default_value = "80")]
    ws_port: u16,
    #[structopt(long, env = "WLED_WS_PATH", default_value = "/ws")]
    ws_path: String,
    #[structopt(long, default_value = "web")]
    web_root: PathBuf,
}

async fn run(opts: Opts) -> color_eyre::eyre::Result<()> {
    // Load configuration
    let config = rackled::models::Config::load_file(&opts.config_path).await?;

    // Dump configuration if this was asked
    if opts.dump_config {
        print!("{}", config.to_string()?);
        return Ok(());
    }

    let device = rackled::device::from_url(
        opts.device_url.clone(),
        opts.device_timeout_ms.map(Duration::from_millis),
    )?;

    // Create the global state object
    let global = rackled::global::GlobalData::new(&config, device).wrap();

    let web_config = rackled::web::WebConfig {
        address: SocketAddr::new(opts.address, opts.port),
        document_root: opts.web_root.clone(),
        upstream: opts.ws_host.clone().map(|host| rackled::web::Upstream {
            host,
            port: opts.ws_port,
            path: opts.ws_path.clone(),
        }),
    };

    match &web_config.upstream {
        Some(upstream) => info!(upstream = %upstream, "live-view proxy enabled"),
        None => warn!("no live-view host configured, the proxy endpoint is disabled"),
    }

    // Start the API server
    let server = tokio::spawn(rackled::web::bind(global.clone(), web_config).await?);

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("shutting down");
        }
        result = server => {
            if let Err(error) = result {
                error!(error = %error, "API server stopped");
            }
        }
    }

    global.tasks().shutdown();

    Ok(())
}

fn install_tracing(opts: &Opts) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let fmt_layer = fmt::layer();

    let filter_layer = EnvFilter::try_from_env("RACKLED_LOG").unwrap_or_else(|_| {
        EnvFilter::new(match opts.verbose {
            0 => "rackled=warn,rackledd=warn",
            1 => "rackled=info,rackledd=info",
            2 => "rackled=debug,rackledd=debug",
            _ => "rackled=trace,rackledd=trace",
        })
    });

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()
}

#[paw::main]
fn main(opts: Opts) -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    install_tracing(&opts)?;

    // Create tokio runtime
    let thd_count = match num_cpus::get() {
        1 => 2,
        other => other.min(4),
    };

    let rt = Builder::new_multi_thread()
        .worker_threads(thd_count)
        .enable_all()
        .build()?;
    rt.block_on(run(opts))
}
