//! Tree entry modes
//!
//! A tree entry's mode decides how the history rewriters treat it:
//! blob-like modes are filtered as files, `Directory` recurses, `Submodule`
//! is logged and skipped, and `Empty` entries are dropped outright.

/// Mode of a single tree entry, stored as an octal string on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryMode {
    /// Regular file (100644)
    Regular,
    /// Executable file (100755)
    Executable,
    /// Symbolic link (120000)
    Symlink,
    /// Group-writable regular file, produced by ancient tooling (100664)
    Deprecated,
    /// Subdirectory (40000)
    Directory,
    /// Submodule reference (160000); never followed by this crate
    Submodule,
    /// Placeholder mode carried by some writers (0); always dropped
    Empty,
}

impl EntryMode {
    pub fn as_octal_str(&self) -> &str {
        match self {
            EntryMode::Regular => "100644",
            EntryMode::Executable => "100755",
            EntryMode::Symlink => "120000",
            EntryMode::Deprecated => "100664",
            EntryMode::Directory => "40000",
            EntryMode::Submodule => "160000",
            EntryMode::Empty => "0",
        }
    }

    pub fn from_octal_str(value: &str) -> anyhow::Result<Self> {
        match value {
            "100644" => Ok(EntryMode::Regular),
            "100755" => Ok(EntryMode::Executable),
            "120000" => Ok(EntryMode::Symlink),
            "100664" => Ok(EntryMode::Deprecated),
            "40000" | "040000" => Ok(EntryMode::Directory),
            "160000" => Ok(EntryMode::Submodule),
            "0" => Ok(EntryMode::Empty),
            _ => Err(anyhow::anyhow!("invalid entry mode: {value}")),
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }

    /// Modes whose entries reference blob content
    pub fn is_blob_like(&self) -> bool {
        matches!(
            self,
            EntryMode::Regular | EntryMode::Executable | EntryMode::Symlink | EntryMode::Deprecated
        )
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_octal_str())
    }
}
