//! Compilation, request and output values passed between the queue, the
//! driver and the analyzer.

use serde::{Deserialize, Serialize};

/// An opaque compilation unit record.
///
/// The driver never looks inside; analyzers decode whatever schema they
/// expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompilationUnit(pub serde_json::Value);

impl CompilationUnit {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// A compilation plus the metadata needed to analyze it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compilation {
    /// The compilation to analyze.
    pub unit: CompilationUnit,

    /// Revision marker attributed to the compilation.
    pub revision: String,
}

impl Compilation {
    pub fn new(unit: CompilationUnit, revision: impl Into<String>) -> Self {
        Self {
            unit,
            revision: revision.into(),
        }
    }
}

/// A single analysis request sent to a [`crate::CompilationAnalyzer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub compilation: CompilationUnit,

    /// Address of the file data service the analyzer reads inputs from.
    pub file_data_service: String,

    pub revision: String,
}

impl AnalysisRequest {
    pub fn new(compilation: &Compilation, file_data_service: &str) -> Self {
        Self {
            compilation: compilation.unit.clone(),
            file_data_service: file_data_service.to_string(),
            revision: compilation.revision.clone(),
        }
    }
}

/// One analysis output, forwarded verbatim to the output sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub value: Vec<u8>,
}

impl AnalysisOutput {
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
        }
    }
}
