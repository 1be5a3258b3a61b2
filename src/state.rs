use anyhow::{bail, Context};
use tracing::{debug, info};
use vdesks::{Config, MonitorRegistry, Output, Outputs, VirtualDesk};

use crate::types::event::Event;

/// A set of desks sharing one monitor registry, driven by replayed events.
#[derive(Debug)]
pub struct VdeskState {
    pub config: Config,
    pub outputs: Outputs,
    pub vdesks: Vec<VirtualDesk>,
    pub active_vdesk: usize,
}

impl VdeskState {
    pub fn new(config: Config, outputs: Outputs, count: u32) -> anyhow::Result<Self> {
        if count == 0 {
            bail!("need at least one desk");
        }

        let vdesks = (1..=count)
            .map(|id| VirtualDesk::new(id, id.to_string(), &outputs))
            .collect();

        Ok(Self {
            config,
            outputs,
            vdesks,
            active_vdesk: 0,
        })
    }

    pub fn handle_event(&mut self, event: &Event) -> anyhow::Result<()> {
        let active = self.active_vdesk;
        match event {
            Event::Connect {
                descriptor,
                windows,
            } => {
                self.outputs
                    .add(Output::new(descriptor.as_str()).with_windows(*windows));
                self.invalidate_all();
            }
            Event::Disable(descriptor) => {
                if !self.outputs.set_enabled(descriptor, false) {
                    bail!("unknown monitor {descriptor:?}");
                }
                let repair = self.vdesks[active].remove_monitor(&self.outputs, descriptor);
                debug!(?repair, "repaired active layout");
                self.invalidate_all();
            }
            Event::Enable(descriptor) => {
                if !self.outputs.set_enabled(descriptor, true) {
                    bail!("unknown monitor {descriptor:?}");
                }
                self.invalidate_all();
            }
            Event::Unplug(descriptor) => {
                self.outputs
                    .remove(descriptor)
                    .with_context(|| format!("unknown monitor {descriptor:?}"))?;
                for vdesk in &mut self.vdesks {
                    let repair = vdesk.remove_monitor_everywhere(&self.outputs, descriptor);
                    debug!(vdesk = vdesk.id(), ?repair, "repaired layouts");
                }
                self.invalidate_all();
            }
            Event::Windows {
                descriptor,
                windows,
            } => {
                if !self.outputs.set_windows(descriptor, *windows) {
                    bail!("unknown monitor {descriptor:?}");
                }
            }
            Event::Switch(id) => {
                let Some(idx) = (*id as usize)
                    .checked_sub(1)
                    .filter(|idx| *idx < self.vdesks.len())
                else {
                    bail!("no desk {id}, there are {}", self.vdesks.len());
                };
                self.active_vdesk = idx;
                info!(vdesk = id, "switched desk");
            }
            Event::Assign {
                descriptor,
                workspace,
            } => {
                let monitor = self
                    .outputs
                    .find_by_descriptor(descriptor)
                    .with_context(|| format!("unknown monitor {descriptor:?}"))?;
                self.vdesks[active].change_workspace(&self.outputs, &monitor, *workspace);
            }
            Event::Reset => self.vdesks[active].reset_layout(&self.outputs),
            Event::Prune => {
                let repair = self.vdesks[active].remove_stale_entries(&self.outputs);
                debug!(?repair, "pruned active layout");
            }
        }
        Ok(())
    }

    /// Formats the active desk's layout, resolving it first if it went stale.
    pub fn describe_active(&mut self) -> String {
        let remember = self.config.remember_layout;
        let vdesk = &mut self.vdesks[self.active_vdesk];
        let layout = vdesk.active_layout(&self.outputs, remember).to_string();
        format!("desk {} ({}): {layout}", vdesk.id(), vdesk.name())
    }

    fn invalidate_all(&mut self) {
        for vdesk in &mut self.vdesks {
            vdesk.invalidate_active_layout();
        }
    }
}
