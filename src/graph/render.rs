//! Image rendering through the Graphviz toolchain.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::str::FromStr;
use tracing::debug;

/// Graphviz layout engine passed to `dot -K`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutEngine {
    /// Hierarchical layout
    Dot,
    /// Spring model
    Neato,
    /// Force-directed placement
    Fdp,
    /// Multiscale force-directed placement; copes best with large schemas
    #[default]
    Sfdp,
    /// Circular layout
    Circo,
    /// Radial layout
    Twopi,
}

impl LayoutEngine {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutEngine::Dot => "dot",
            LayoutEngine::Neato => "neato",
            LayoutEngine::Fdp => "fdp",
            LayoutEngine::Sfdp => "sfdp",
            LayoutEngine::Circo => "circo",
            LayoutEngine::Twopi => "twopi",
        }
    }
}

impl FromStr for LayoutEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dot" => Ok(LayoutEngine::Dot),
            "neato" => Ok(LayoutEngine::Neato),
            "fdp" => Ok(LayoutEngine::Fdp),
            "sfdp" => Ok(LayoutEngine::Sfdp),
            "circo" => Ok(LayoutEngine::Circo),
            "twopi" => Ok(LayoutEngine::Twopi),
            _ => Err(format!(
                "Unknown layout engine: {}. Valid options: dot, neato, fdp, sfdp, circo, twopi",
                s
            )),
        }
    }
}

impl fmt::Display for LayoutEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render DOT source to PNG/SVG/PDF using Graphviz.
///
/// The image format is taken from the output file's extension.
pub fn render_image(dot_source: &str, output_path: &Path, engine: LayoutEngine) -> Result<()> {
    let ext = output_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png")
        .to_lowercase();
    let ext = if ext == "jpeg" { "jpg".to_string() } else { ext };

    debug!(engine = %engine, format = %ext, path = %output_path.display(), "invoking graphviz");

    let mut child = Command::new("dot")
        .arg(format!("-K{}", engine))
        .arg(format!("-T{}", ext))
        .arg("-o")
        .arg(output_path)
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!(
                    "Graphviz 'dot' command not found. Install Graphviz or use --format dot instead."
                )
            } else {
                anyhow::anyhow!("Failed to run dot: {}", e)
            }
        })?;

    // stdin is dropped before waiting so dot sees EOF
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(dot_source.as_bytes()),
        None => Ok(()),
    };
    if let Err(e) = written {
        let _ = child.kill();
        let _ = child.wait();
        return Err(e).context("Failed to write DOT source to graphviz");
    }

    let status = child.wait()?;
    if !status.success() {
        bail!("Graphviz dot command failed with status: {}", status);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_round_trip() {
        for engine in [
            LayoutEngine::Dot,
            LayoutEngine::Neato,
            LayoutEngine::Fdp,
            LayoutEngine::Sfdp,
            LayoutEngine::Circo,
            LayoutEngine::Twopi,
        ] {
            assert_eq!(engine.to_string().parse::<LayoutEngine>(), Ok(engine));
        }
    }

    #[test]
    fn test_default_engine_is_sfdp() {
        assert_eq!(LayoutEngine::default(), LayoutEngine::Sfdp);
        assert!("graphviz".parse::<LayoutEngine>().is_err());
    }
}
