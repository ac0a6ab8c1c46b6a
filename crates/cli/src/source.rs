use std::io::Read;
use std::path::PathBuf;

use tripsplit_import::{BillSource, SourceError};

/// Bill export on disk, or stdin for `-`.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_stdin(&self) -> bool {
        self.path.as_os_str() == "-"
    }
}

impl BillSource for FileSource {
    fn name(&self) -> String {
        if self.is_stdin() {
            "stdin".to_string()
        } else {
            self.path.display().to_string()
        }
    }

    fn fetch(&self) -> Result<String, SourceError> {
        if self.is_stdin() {
            let mut payload = String::new();
            std::io::stdin()
                .read_to_string(&mut payload)
                .map_err(|e| SourceError::new(self.name(), e.to_string()))?;
            return Ok(payload);
        }
        std::fs::read_to_string(&self.path).map_err(|e| SourceError::new(self.name(), e.to_string()))
    }
}
