use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use vdesks::{Output, WorkspaceId};

/// One step of a replay script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect { descriptor: String, windows: usize },
    Disable(String),
    Enable(String),
    Unplug(String),
    Windows { descriptor: String, windows: usize },
    Switch(u32),
    Assign { descriptor: String, workspace: WorkspaceId },
    Reset,
    Prune,
}

fn descriptor(arg: &str) -> anyhow::Result<String> {
    if arg.is_empty() {
        bail!("empty monitor description");
    }
    Ok(arg.to_owned())
}

/// Splits `DESC=VALUE`, where `VALUE` is optional when `default` is given.
fn descriptor_with<T>(arg: &str, default: Option<T>) -> anyhow::Result<(String, T)>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let (descriptor, value) = match (arg.rsplit_once('='), default) {
        (Some((descriptor, value)), _) => {
            let value = value
                .parse()
                .with_context(|| format!("invalid value {value:?}"))?;
            (descriptor, value)
        }
        (None, Some(default)) => (arg, default),
        (None, None) => bail!("expected DESC=VALUE, got {arg:?}"),
    };
    Ok((self::descriptor(descriptor)?, value))
}

/// Parses `DESC[=WINDOWS]` into an enabled output.
pub fn parse_output(arg: &str) -> anyhow::Result<Output> {
    let (descriptor, windows) = descriptor_with(arg, Some(0))?;
    Ok(Output::new(descriptor).with_windows(windows))
}

impl FromStr for Event {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, arg) = s.split_once(':').unwrap_or((s, ""));
        let event = match kind {
            "connect" => {
                let (descriptor, windows) = descriptor_with(arg, Some(0))?;
                Event::Connect {
                    descriptor,
                    windows,
                }
            }
            "disable" => Event::Disable(descriptor(arg)?),
            "enable" => Event::Enable(descriptor(arg)?),
            "unplug" => Event::Unplug(descriptor(arg)?),
            "windows" => {
                let (descriptor, windows) = descriptor_with(arg, None)?;
                Event::Windows {
                    descriptor,
                    windows,
                }
            }
            "switch" => {
                let id: u32 = arg
                    .parse()
                    .with_context(|| format!("invalid desk id {arg:?}"))?;
                if id == 0 {
                    bail!("desk ids start at 1");
                }
                Event::Switch(id)
            }
            "assign" => {
                let (descriptor, workspace) = descriptor_with(arg, None)?;
                Event::Assign {
                    descriptor,
                    workspace,
                }
            }
            "reset" => Event::Reset,
            "prune" => Event::Prune,
            _ => return Err(anyhow!("unknown event {kind:?}")),
        };
        Ok(event)
    }
}
