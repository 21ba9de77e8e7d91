//! Toolmap library exports for testing

use clap::ValueEnum;

pub mod api;
pub mod core;
pub mod location;

#[cfg(test)]
pub mod test_support;

/// Where the device location fix comes from.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum LocationSource {
    #[default]
    Fixed,
    Ip,
}

impl LocationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationSource::Fixed => "fixed",
            LocationSource::Ip => "ip",
        }
    }
}
