//! Embedded sample molecules.

use molview::StructurePayload;
use rust_embed::RustEmbed;
use serde::Deserialize;
use thiserror::Error;

/// Embeds the assets/ directory. Debug builds read from disk.
#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Assets;

#[derive(Error, Debug)]
pub enum SampleLoadError {
    #[error("samples.ron not found in embedded assets")]
    SamplesNotFound,
    #[error("invalid UTF-8 in samples.ron: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("failed to parse samples.ron: {0}")]
    ParseError(#[from] ron::de::SpannedError),
}

/// A named structure offered in the sidebar.
#[derive(Debug, Clone, Deserialize)]
pub struct Sample {
    pub name: String,
    #[serde(default)]
    pub smiles: Option<String>,
    #[serde(default)]
    pub molfile: Option<String>,
}

impl Sample {
    pub fn payload(&self) -> StructurePayload {
        StructurePayload {
            structured: self.molfile.clone(),
            line_notation: self.smiles.clone(),
        }
    }
}

pub fn load_samples() -> Result<Vec<Sample>, SampleLoadError> {
    let file = Assets::get("samples.ron").ok_or(SampleLoadError::SamplesNotFound)?;
    let ron_string = std::str::from_utf8(&file.data)?;
    Ok(ron::from_str(ron_string)?)
}
