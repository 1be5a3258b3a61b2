use clap::ValueEnum;

/// How a desk picks one of its remembered layouts after the monitor set changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RememberLayout {
    /// First layout whose monitors are all currently enabled.
    Monitors,
    /// First layout with as many monitors as are enabled, repaired in place.
    #[default]
    Size,
    /// Forget everything and generate a fresh layout.
    None,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub remember_layout: RememberLayout,
}

impl Config {
    pub fn new() -> Self {
        Self {
            remember_layout: RememberLayout::default(),
        }
    }

    pub fn with_remember_layout(remember_layout: RememberLayout) -> Self {
        Self { remember_layout }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
