//! Contract with the structure-depiction library, plus an Open Babel backed
//! implementation that drives the `obabel` command-line tool.

use crate::bounds::raw_bounds;
use crate::geometry::{CanvasSize, ViewBox};
use crate::scene::Scene;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

/// Structure input, in one or both supported notations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructurePayload {
    /// Connection-table text (MDL molfile).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<String>,
    /// Line notation (SMILES).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_notation: Option<String>,
}

impl StructurePayload {
    pub fn from_line_notation(smiles: impl Into<String>) -> Self {
        Self {
            structured: None,
            line_notation: Some(smiles.into()),
        }
    }

    pub fn from_structured(molfile: impl Into<String>) -> Self {
        Self {
            structured: Some(molfile.into()),
            line_notation: None,
        }
    }

    /// Reads a payload from disk: `.smi`/`.smiles` files are line notation,
    /// anything else is treated as a connection table.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let is_smiles = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("smi") || ext.eq_ignore_ascii_case("smiles"));
        Ok(if is_smiles {
            Self::from_line_notation(text.split_whitespace().next().unwrap_or_default())
        } else {
            Self::from_structured(text)
        })
    }

    pub fn is_empty(&self) -> bool {
        let blank = |s: &Option<String>| s.as_deref().is_none_or(|s| s.trim().is_empty());
        blank(&self.structured) && blank(&self.line_notation)
    }
}

/// Which notation a parse attempt used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    Structured,
    LineNotation,
}

impl std::fmt::Display for Notation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Notation::Structured => "structured",
            Notation::LineNotation => "line notation",
        })
    }
}

/// Errors reported by a depiction backend.
#[derive(Error, Debug)]
pub enum DepictionError {
    #[error("failed to parse {notation} input: {message}")]
    Parse { notation: Notation, message: String },
    #[error("failed to normalize structure: {0}")]
    Normalize(String),
    #[error("failed to generate depiction: {0}")]
    Generate(String),
    #[error("depiction process failed: {0}")]
    Io(#[from] std::io::Error),
}

/// The depiction library could not be initialized.
#[derive(Error, Debug)]
pub enum LibraryLoadError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("'{program}' is not a usable depiction tool: {message}")]
    Unusable { program: PathBuf, message: String },
}

/// Structure-depiction library as seen by the renderer.
pub trait DepictionBackend {
    type Molecule;

    fn parse_structured(&self, text: &str) -> Result<Self::Molecule, DepictionError>;

    fn parse_line_notation(&self, text: &str) -> Result<Self::Molecule, DepictionError>;

    /// Adds implicit hydrogens and derives ring/neighbour data.
    fn normalize(&self, molecule: &mut Self::Molecule) -> Result<(), DepictionError>;

    /// Produces SVG sized to `size` pixels, cropped to the drawing plus
    /// `crop_margin` pixels.
    fn depict(
        &self,
        molecule: &Self::Molecule,
        size: CanvasSize,
        crop_margin: f64,
    ) -> Result<String, DepictionError>;
}

/// Molecule handle for [`ObabelBackend`]: validated input in its format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObabelMolecule {
    format: &'static str,
    text: String,
    add_hydrogens: bool,
}

/// Depicts structures by shelling out to Open Babel.
#[derive(Debug, Clone)]
pub struct ObabelBackend {
    program: PathBuf,
    version: String,
}

impl ObabelBackend {
    pub const DEFAULT_PROGRAM: &'static str = "obabel";

    /// Checks `program` once; the returned backend is ready to use.
    pub async fn load(program: PathBuf) -> Result<Self, LibraryLoadError> {
        let output = tokio::process::Command::new(&program)
            .arg("-V")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| LibraryLoadError::Spawn {
                program: program.clone(),
                source,
            })?;

        let version = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if !output.status.success() || !version.contains("Open Babel") {
            return Err(LibraryLoadError::Unusable {
                program,
                message: format!(
                    "exit status {}, output {:?}",
                    output.status,
                    version.lines().next().unwrap_or_default()
                ),
            });
        }

        log::info!("Depiction library ready: {version}");
        Ok(Self { program, version })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn run(&self, format: &str, input: &str, args: &[String]) -> Result<String, DepictionError> {
        let mut child = Command::new(&self.program)
            .arg(format!("-i{format}"))
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);

        // obabel reports "0 molecules converted" with a zero exit status.
        if !output.status.success() || stderr.contains("0 molecules converted") {
            return Err(DepictionError::Generate(stderr.trim().to_owned()));
        }
        Ok(stdout)
    }

    fn parse(&self, format: &'static str, notation: Notation, text: &str) -> Result<ObabelMolecule, DepictionError> {
        let parse_error = |message: String| DepictionError::Parse { notation, message };
        if text.trim().is_empty() {
            return Err(parse_error("empty input".to_owned()));
        }
        let canonical = self
            .run(format, text, &["-ocan".to_owned()])
            .map_err(|err| parse_error(err.to_string()))?;
        if canonical.trim().is_empty() {
            return Err(parse_error("no molecule recognised".to_owned()));
        }
        Ok(ObabelMolecule {
            format,
            text: text.to_owned(),
            add_hydrogens: false,
        })
    }
}

impl DepictionBackend for ObabelBackend {
    type Molecule = ObabelMolecule;

    fn parse_structured(&self, text: &str) -> Result<ObabelMolecule, DepictionError> {
        self.parse("mol", Notation::Structured, text)
    }

    fn parse_line_notation(&self, text: &str) -> Result<ObabelMolecule, DepictionError> {
        self.parse("smi", Notation::LineNotation, text.trim())
    }

    fn normalize(&self, molecule: &mut ObabelMolecule) -> Result<(), DepictionError> {
        // Hydrogens are added at depiction time; check that obabel accepts it.
        self.run(molecule.format, &molecule.text, &["-h".to_owned(), "-ocan".to_owned()])
            .map_err(|err| DepictionError::Normalize(err.to_string()))?;
        molecule.add_hydrogens = true;
        Ok(())
    }

    fn depict(
        &self,
        molecule: &ObabelMolecule,
        size: CanvasSize,
        crop_margin: f64,
    ) -> Result<String, DepictionError> {
        let mut args = vec![
            "-osvg".to_owned(),
            "-xd".to_owned(),
            "-xb".to_owned(),
            "none".to_owned(),
            "-xw".to_owned(),
            format!("{}", size.width.round()),
            "-xh".to_owned(),
            format!("{}", size.height.round()),
        ];
        if molecule.format == "smi" {
            args.push("--gen2D".to_owned());
        }
        if molecule.add_hydrogens {
            args.push("-h".to_owned());
        }

        let svg = self.run(molecule.format, &molecule.text, &args)?;
        auto_crop(&svg, size, crop_margin)
    }
}

/// Re-targets the depiction's view box onto its drawn content plus a margin
/// given in output pixels.
pub fn auto_crop(svg: &str, size: CanvasSize, crop_margin: f64) -> Result<String, DepictionError> {
    let mut scene = Scene::parse(svg).map_err(|err| DepictionError::Generate(err.to_string()))?;
    let Some(drawn) = raw_bounds(&scene) else {
        return Ok(svg.to_owned());
    };
    let current = scene.view_box().unwrap_or(ViewBox::new(0.0, 0.0, size.width, size.height));
    let units_per_px = (current.width / size.width).max(current.height / size.height);
    let cropped = ViewBox::from_rect(drawn).expanded(crop_margin * units_per_px);
    if cropped.is_valid() {
        scene.set_view_box(cropped);
    }
    scene.set_pixel_size(size);
    Ok(scene.to_svg())
}
