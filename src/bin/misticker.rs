//! MiSticker CLI Tool
//!
//! Command-line interface for turning background-removed images into
//! square WebP stickers with a white die-cut border.

#[cfg(feature = "cli")]
use misticker::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
