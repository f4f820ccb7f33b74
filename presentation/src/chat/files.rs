//! Reading local files selected for upload

use rosti_domain::PendingFile;
use std::io;
use std::path::Path;

/// Read a local file into a [`PendingFile`]; the MIME type comes from the
/// extension.
pub async fn read_attachment(path: &Path) -> io::Result<PendingFile> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Not a file: {}", path.display()),
            )
        })?;
    let data = tokio::fs::read(path).await?;
    Ok(PendingFile::new(filename, data))
}
