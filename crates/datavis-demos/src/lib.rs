//! Shared bits of the demo binaries.

use datavis::logging::{init_logging, LoggingConfig};
use datavis::Color;
use rand::Rng;

/// Installs logging: `RUST_LOG` when set, otherwise debug output for datavis.
pub fn init() {
    let config = if std::env::var_os("RUST_LOG").is_some() {
        LoggingConfig::default()
    } else {
        LoggingConfig::verbose()
    };
    init_logging(config);
}

pub fn random_color(rng: &mut impl Rng) -> Color {
    Color::rgb(rng.r#gen(), rng.r#gen(), rng.r#gen())
}
