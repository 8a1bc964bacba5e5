//! Font assets used by a render: the bytes to embed plus their metrics.

use std::path::Path;

use crate::config::FontSettings;
use crate::error::RenderError;
use crate::font_metrics::{self, FontMetrics};

/// Face selector used by the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
}

#[derive(Debug, Clone)]
pub enum FontSource {
    /// TrueType bytes embedded into the PDF.
    File(Vec<u8>),
    /// One of the standard 14 Helvetica faces, not embedded.
    Helvetica,
}

#[derive(Debug, Clone)]
pub struct LoadedFont {
    pub source: FontSource,
    pub metrics: FontMetrics,
}

/// Regular and bold faces for one document.
#[derive(Debug, Clone)]
pub struct FontAssets {
    pub regular: LoadedFont,
    pub bold: LoadedFont,
}

impl FontAssets {
    /// Load the configured faces. A missing or unparseable file fails the
    /// render with `RenderError::AssetLoad`.
    pub fn load(settings: &FontSettings) -> Result<Self, RenderError> {
        if settings.builtin {
            return Ok(Self::builtin());
        }

        Ok(FontAssets {
            regular: load_font(&settings.regular)?,
            bold: load_font(&settings.bold)?,
        })
    }

    /// Helvetica / Helvetica-Bold, nothing read from disk.
    pub fn builtin() -> Self {
        FontAssets {
            regular: LoadedFont {
                source: FontSource::Helvetica,
                metrics: font_metrics::helvetica().clone(),
            },
            bold: LoadedFont {
                source: FontSource::Helvetica,
                metrics: font_metrics::helvetica_bold().clone(),
            },
        }
    }

    pub fn get(&self, face: FontFace) -> &LoadedFont {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
        }
    }

    pub fn metrics(&self, face: FontFace) -> &FontMetrics {
        &self.get(face).metrics
    }
}

fn load_font(path: &Path) -> Result<LoadedFont, RenderError> {
    let asset_error = |reason: String| RenderError::AssetLoad {
        path: path.display().to_string(),
        reason,
    };

    let data = std::fs::read(path).map_err(|e| asset_error(e.to_string()))?;
    let metrics = FontMetrics::from_ttf(&data).map_err(|e| asset_error(e.to_string()))?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "loaded font");

    Ok(LoadedFont {
        source: FontSource::File(data),
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings(regular: &str, bold: &str) -> FontSettings {
        FontSettings {
            regular: PathBuf::from(regular),
            bold: PathBuf::from(bold),
            builtin: false,
        }
    }

    #[test]
    fn test_missing_font_is_asset_error() {
        let err = FontAssets::load(&settings("/nonexistent/Regular.ttf", "/nonexistent/Bold.ttf"))
            .unwrap_err();
        match err {
            RenderError::AssetLoad { path, .. } => assert!(path.contains("Regular.ttf")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unparseable_font_is_asset_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        let path = path.to_string_lossy().to_string();

        let err = FontAssets::load(&settings(&path, &path)).unwrap_err();
        assert!(matches!(err, RenderError::AssetLoad { .. }));
    }

    #[test]
    fn test_builtin_flag_skips_disk() {
        let mut s = settings("/nonexistent/a.ttf", "/nonexistent/b.ttf");
        s.builtin = true;
        let fonts = FontAssets::load(&s).unwrap();
        assert!(matches!(fonts.bold.source, FontSource::Helvetica));
        assert!(fonts.metrics(FontFace::Bold).char_width('b') > fonts.metrics(FontFace::Regular).char_width('b'));
    }
}
