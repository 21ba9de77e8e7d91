pub mod fixed;
pub mod ip;

pub use fixed::FixedLocation;
pub use ip::IpLocation;
