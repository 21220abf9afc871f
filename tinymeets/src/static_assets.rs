//! Static files compiled into the binary.

use rust_embed::RustEmbed;

/// Everything under `static/`, e.g. the "No Image Available" placeholder
#[derive(RustEmbed)]
#[folder = "static/"]
pub struct Assets;

/// Name of the embedded placeholder shown for locations without an image
pub const PLACEHOLDER_IMAGE: &str = "placeholder.svg";
