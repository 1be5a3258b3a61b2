mod state;
mod types;
mod util;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use vdesks::{Config, Output, Outputs, RememberLayout};

use state::VdeskState;
use types::event::{parse_output, Event};

/// Replays monitor hotplug events against a set of virtual desks and prints
/// the layout the active desk would show after each one.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(long, name = "LEVEL")]
    log: Option<String>,
    /// Which remembered layout a desk falls back to after a monitor change.
    #[arg(long, value_enum, default_value_t = RememberLayout::Size)]
    remember: RememberLayout,
    #[arg(long, default_value_t = 1)]
    desks: u32,
    /// Initially connected monitor, as DESC[=WINDOWS].
    #[arg(long = "monitor", name = "MONITOR", value_parser = parse_output)]
    monitors: Vec<Output>,
    /// connect:DESC[=W], disable:DESC, enable:DESC, unplug:DESC, windows:DESC=W,
    /// switch:N, assign:DESC=WS, reset, prune
    #[arg(name = "EVENT")]
    events: Vec<Event>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    util::log::init(args.log);

    let config = Config::with_remember_layout(args.remember);
    let outputs: Outputs = args.monitors.into_iter().collect();
    let mut state = VdeskState::new(config, outputs, args.desks)?;

    println!("{}", state.describe_active());
    for event in &args.events {
        info!(?event, "replaying");
        state
            .handle_event(event)
            .with_context(|| format!("failed to apply {event:?}"))?;
        println!("{}", state.describe_active());
    }

    Ok(())
}
