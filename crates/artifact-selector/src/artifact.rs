//! Selected artifacts.

use serde::{Deserialize, Serialize};

use crate::event::File;

/// An artifact selected from the build event stream.
///
/// `id` is the label of the target or action that produced the files.
/// Files are carried exactly as the build reported them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub files: Vec<File>,
}

impl Artifact {
    /// File names in artifact order.
    pub fn file_names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }
}
