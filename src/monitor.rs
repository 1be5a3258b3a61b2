/// Read access to the physical displays the compositor currently knows about.
pub trait MonitorRegistry {
    type Monitor: Clone;

    /// Enabled monitors in registry order.
    fn enabled_monitors(&self) -> Vec<Self::Monitor>;

    /// Stable identity of a monitor, empty if the output has no description.
    fn descriptor(&self, monitor: &Self::Monitor) -> String;

    fn find_by_descriptor(&self, descriptor: &str) -> Option<Self::Monitor>;

    fn is_enabled(&self, monitor: &Self::Monitor) -> bool;

    /// Whether `descriptor` still names a live, enabled monitor.
    fn is_live(&self, descriptor: &str) -> bool {
        self.find_by_descriptor(descriptor)
            .is_some_and(|monitor| self.is_enabled(&monitor))
    }
}

pub trait WorkloadOracle: MonitorRegistry {
    fn windows_on_active_workspace(&self, monitor: &Self::Monitor) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub descriptor: String,
    pub enabled: bool,
    /// Windows on the workspace currently shown on this output.
    pub windows: usize,
}

impl Output {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            enabled: true,
            windows: 0,
        }
    }

    pub fn with_windows(mut self, windows: usize) -> Self {
        self.windows = windows;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// In-memory monitor registry, in connection order.
#[derive(Debug, Clone, Default)]
pub struct Outputs {
    outputs: Vec<Output>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `output`, replacing a known output with the same descriptor in place.
    pub fn add(&mut self, output: Output) {
        match self.get_mut(&output.descriptor) {
            Some(known) => *known = output,
            None => self.outputs.push(output),
        }
    }

    pub fn remove(&mut self, descriptor: &str) -> Option<Output> {
        let idx = self
            .outputs
            .iter()
            .position(|output| output.descriptor == descriptor)?;
        Some(self.outputs.remove(idx))
    }

    pub fn get(&self, descriptor: &str) -> Option<&Output> {
        self.outputs
            .iter()
            .find(|output| output.descriptor == descriptor)
    }

    pub fn get_mut(&mut self, descriptor: &str) -> Option<&mut Output> {
        self.outputs
            .iter_mut()
            .find(|output| output.descriptor == descriptor)
    }

    /// Returns false if no output has this descriptor.
    pub fn set_enabled(&mut self, descriptor: &str, enabled: bool) -> bool {
        match self.get_mut(descriptor) {
            Some(output) => {
                output.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Returns false if no output has this descriptor.
    pub fn set_windows(&mut self, descriptor: &str, windows: usize) -> bool {
        match self.get_mut(descriptor) {
            Some(output) => {
                output.windows = windows;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Output> {
        self.outputs.iter()
    }
}

impl FromIterator<Output> for Outputs {
    fn from_iter<I: IntoIterator<Item = Output>>(iter: I) -> Self {
        let mut outputs = Outputs::new();
        for output in iter {
            outputs.add(output);
        }
        outputs
    }
}

impl MonitorRegistry for Outputs {
    type Monitor = Output;

    fn enabled_monitors(&self) -> Vec<Output> {
        self.outputs
            .iter()
            .filter(|output| output.enabled)
            .cloned()
            .collect()
    }

    fn descriptor(&self, monitor: &Output) -> String {
        monitor.descriptor.clone()
    }

    fn find_by_descriptor(&self, descriptor: &str) -> Option<Output> {
        self.get(descriptor).cloned()
    }

    fn is_enabled(&self, monitor: &Output) -> bool {
        monitor.enabled
    }
}

impl WorkloadOracle for Outputs {
    fn windows_on_active_workspace(&self, monitor: &Output) -> usize {
        monitor.windows
    }
}
