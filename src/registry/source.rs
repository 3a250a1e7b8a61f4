// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Descriptor sources

use std::path::{Path, PathBuf};

use crate::errors::{ArtiflowError, ArtiflowResult};

/// One descriptor document to be merged into the registry
#[derive(Debug, Clone)]
pub enum DescriptorSource {
    /// A file on disk (typically `<flow>/dependency.yaml`)
    File(PathBuf),

    /// In-memory document with a label used for provenance
    Inline {
        /// Label reported as provenance; also the default namespace
        name: String,
        /// Document text
        text: String,
    },
}

impl DescriptorSource {
    /// File source
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Inline source
    pub fn inline(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Inline {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Label used in diagnostics and as step provenance
    pub fn label(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Inline { name, .. } => name.clone(),
        }
    }

    /// Namespace for steps declared at the document top level.
    ///
    /// Flow descriptors live at `<flow>/dependency.yaml`, so the parent
    /// directory name is the flow.
    pub fn default_namespace(&self) -> Option<String> {
        match self {
            Self::File(path) => path
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .filter(|n| !n.is_empty()),
            Self::Inline { name, .. } => Some(name.clone()),
        }
    }

    /// Read the document text
    pub fn read(&self) -> ArtiflowResult<String> {
        match self {
            Self::File(path) => {
                if !path.exists() {
                    return Err(ArtiflowError::SourceNotFound { path: path.clone() });
                }
                std::fs::read_to_string(path).map_err(|e| ArtiflowError::SourceParse {
                    source_name: path.display().to_string(),
                    message: e.to_string(),
                })
            }
            Self::Inline { text, .. } => Ok(text.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_namespace_from_parent_dir() {
        let source = DescriptorSource::file("config/common/pv_calibre/dependency.yaml");
        assert_eq!(source.default_namespace().as_deref(), Some("pv_calibre"));

        let bare = DescriptorSource::file("dependency.yaml");
        assert_eq!(bare.default_namespace(), None);
    }

    #[test]
    fn test_missing_file() {
        let source = DescriptorSource::file("/definitely/not/here/dependency.yaml");
        assert!(matches!(source.read(), Err(ArtiflowError::SourceNotFound { .. })));
    }
}
