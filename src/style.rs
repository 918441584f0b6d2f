use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;

/// Pretrained styles the tool knows how to provision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum Style {
    #[default]
    #[value(name = "mosaic")]
    Mosaic,
    #[value(name = "candy")]
    Candy,
    #[value(name = "rain_princess")]
    RainPrincess,
    #[value(name = "udnie")]
    Udnie,
}

impl Style {
    pub const ALL: [Style; 4] = [Style::Mosaic, Style::Candy, Style::RainPrincess, Style::Udnie];

    pub const fn as_str(self) -> &'static str {
        match self {
            Style::Mosaic => "mosaic",
            Style::Candy => "candy",
            Style::RainPrincess => "rain_princess",
            Style::Udnie => "udnie",
        }
    }

    /// File name of the exported graph for this style.
    pub fn artifact_file_name(self) -> String {
        format!("{}.onnx", self.as_str())
    }

    /// Cache location, derived from the style alone.
    pub fn artifact_path(self, cache_dir: &Path) -> PathBuf {
        cache_dir.join(self.artifact_file_name())
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
