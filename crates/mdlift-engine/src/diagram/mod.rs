//! External diagram rendering for fenced `mermaid` blocks.
//!
//! Rendering is code-in/image-out: the walker hands over the fence body and
//! gets PNG bytes back, or an error it recovers from by keeping the code
//! block. The CLI renderer shells out to `mmdc` (mermaid-cli) inside the
//! conversion's scratch directory.

use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct DiagramOptions {
    pub enabled: bool,
    pub theme: String,
    pub background: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Default for DiagramOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            theme: "default".to_string(),
            background: "white".to_string(),
            width: None,
            height: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("mermaid renderer not found on PATH: {0}")]
    RendererNotFound(#[from] which::Error),
    #[error("failed to run mermaid renderer: {0}")]
    Io(#[from] std::io::Error),
    #[error("mermaid renderer exited with status {code:?}: {stderr}")]
    Failed {
        code: Option<i32>,
        stderr: String,
    },
}

pub trait DiagramRenderer {
    fn render(&self, source: &str) -> Result<Vec<u8>, RenderError>;
}

/// Renders diagrams by invoking the `mmdc` binary.
pub struct MermaidCli {
    options: DiagramOptions,
    work_dir: PathBuf,
}

impl MermaidCli {
    pub fn new(options: DiagramOptions, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            options,
            work_dir: work_dir.into(),
        }
    }
}

impl DiagramRenderer for MermaidCli {
    fn render(&self, source: &str) -> Result<Vec<u8>, RenderError> {
        let binary = which::which("mmdc")?;
        let input = self.work_dir.join("diagram.mmd");
        let output = self.work_dir.join("diagram.png");
        std::fs::write(&input, source)?;

        let mut command = Command::new(binary);
        command
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .arg("-t")
            .arg(&self.options.theme)
            .arg("-b")
            .arg(&self.options.background);
        if let Some(width) = self.options.width {
            command.arg("-w").arg(width.to_string());
        }
        if let Some(height) = self.options.height {
            command.arg("-H").arg(height.to_string());
        }

        let result = command.output()?;
        if !result.status.success() {
            return Err(RenderError::Failed {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            });
        }
        Ok(std::fs::read(&output)?)
    }
}
