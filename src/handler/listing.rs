//! Directory listing module
//!
//! Generates the HTML index shown for directories without an index file.

use crate::http::response::{escape_html, escape_html_text};
use std::io;
use std::path::Path;
use tokio::fs;

/// One immediate child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    /// Directory, or symlink to one
    pub is_dir: bool,
    pub is_symlink: bool,
}

impl ListingEntry {
    /// Name shown to the user: `name/` for directories, `name@` for symlinks
    pub fn display_name(&self) -> String {
        if self.is_symlink {
            format!("{}@", self.name)
        } else if self.is_dir {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Percent-encoded relative link
    pub fn href(&self) -> String {
        let encoded = urlencoding::encode(&self.name);
        if self.is_dir {
            format!("{encoded}/")
        } else {
            encoded.into_owned()
        }
    }
}

/// Read the immediate entries of `dir`, sorted case-insensitively by name
pub async fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let is_symlink = entry
            .file_type()
            .await
            .is_ok_and(|t| t.is_symlink());
        // Follows symlinks
        let is_dir = fs::metadata(entry.path())
            .await
            .is_ok_and(|m| m.is_dir());

        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
            is_symlink,
        });
    }

    entries.sort_by_cached_key(|e| e.name.to_lowercase());
    Ok(entries)
}

/// Render the listing page for the decoded URL path `display_path`
pub fn render(display_path: &str, entries: &[ListingEntry]) -> String {
    let title = format!("Directory listing for {}", escape_html_text(display_path));

    let mut html = String::from("<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n"));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{title}</h1>\n"));
    html.push_str("<hr>\n<ul>\n");
    for entry in entries {
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            escape_html(&entry.href()),
            escape_html_text(&entry.display_name()),
        ));
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}
