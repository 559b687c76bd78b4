//! Storage result types
//!
//! Defines result structures returned by storage operations.

/// One listed or stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    /// Confined path, relative to the store base
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
    /// Last modification, unix seconds (0 if unknown)
    pub modified: u64,
}

impl FileEntry {
    /// Listing line: `name|size|modified|type`
    pub fn to_listing_line(&self) -> String {
        let kind = if self.is_dir { "dir" } else { "file" };
        format!("{}|{}|{}|{}", self.name, self.size, self.modified, kind)
    }
}

/// Result of a file retrieval operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDownload {
    pub name: String,
    pub bytes: Vec<u8>,
}
