//! Zip-packaged document helpers shared by the OpenXML and OpenDocument parsers

use std::io::{Cursor, Read};

use zip::result::ZipError;
use zip::ZipArchive;

use super::ParseError;

/// Read one member of a zip archive as UTF-8 text
pub(crate) fn read_entry(bytes: &[u8], path: &str) -> Result<String, ParseError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entry = match archive.by_name(path) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(ParseError::MissingArchiveEntry(path.to_string()))
        }
        Err(err) => return Err(err.into()),
    };

    let mut raw = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut raw)?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

/// Run CPU-bound archive decoding on the blocking pool. A panic inside the
/// closure is resumed on the calling task.
pub(crate) async fn decode_blocking<T, F>(work: F) -> Result<T, ParseError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ParseError> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(_) => Err(ParseError::Cancelled),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Build an in-memory zip archive from `(path, contents)` pairs
    pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
            for (path, contents) in entries {
                zip.start_file(*path, options).unwrap();
                zip.write_all(contents.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::zip_bytes;
    use super::*;

    #[test]
    fn test_read_entry_and_missing_entry() {
        let bytes = zip_bytes(&[("word/document.xml", "<w:document/>")]);
        assert_eq!(read_entry(&bytes, "word/document.xml").unwrap(), "<w:document/>");
        assert!(matches!(
            read_entry(&bytes, "content.xml"),
            Err(ParseError::MissingArchiveEntry(path)) if path == "content.xml"
        ));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(read_entry(b"plain text", "x"), Err(ParseError::Archive(_))));
    }
}
