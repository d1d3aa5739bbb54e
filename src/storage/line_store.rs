use std::{
    future::Future,
    io::{self, ErrorKind, SeekFrom},
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};

use tokio::{
    fs::{self, File},
    io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader},
};
use tracing::debug;

/// Interface for abstracting storage of ledger lines.
pub trait LineStore {
    /// Reads every line in order. A store that doesn't exist yet is empty.
    fn read_lines(&self) -> impl Future<Output = io::Result<Vec<String>>>;

    /// Appends a single line. Nothing already stored is ever rewritten.
    fn append_line(&mut self, line: &str) -> impl Future<Output = io::Result<()>>;
}

impl<T: DerefMut> LineStore for T
where
    T::Target: LineStore,
{
    fn read_lines(&self) -> impl Future<Output = io::Result<Vec<String>>> {
        self.deref().read_lines()
    }

    fn append_line(&mut self, line: &str) -> impl Future<Output = io::Result<()>> {
        self.deref_mut().append_line(line)
    }
}

/// The main realization of [LineStore], backed by a text file.
#[derive(Debug, Clone)]
pub struct FileLineStore {
    path: PathBuf,
}

impl FileLineStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file has content that isn't terminated by a new line. Happens after the file
    /// was edited by hand.
    async fn needs_line_break(file: &mut File) -> io::Result<bool> {
        if file.metadata().await?.len() == 0 {
            return Ok(false);
        }
        file.seek(SeekFrom::End(-1)).await?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last).await?;
        Ok(last[0] != b'\n')
    }
}

impl LineStore for FileLineStore {
    async fn read_lines(&self) -> io::Result<Vec<String>> {
        debug!("Reading {:?}", self.path);
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e),
        };

        // Invalid utf-8 is replaced, not rejected.
        let mut reader = BufReader::new(file);
        let mut result = vec![];
        let mut buffer = Vec::new();
        while reader.read_until(b'\n', &mut buffer).await? > 0 {
            let line = buffer.strip_suffix(b"\n").unwrap_or(&buffer[..]);
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            result.push(String::from_utf8_lossy(line).into_owned());
            buffer.clear();
        }
        Ok(result)
    }

    async fn append_line(&mut self, line: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut file = File::options()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;

        let mut buffer = Vec::with_capacity(line.len() + 2);
        if Self::needs_line_break(&mut file).await? {
            buffer.push(b'\n');
        }
        buffer.extend_from_slice(line.as_bytes());
        buffer.push(b'\n');

        debug!("Appending {line:?} to {:?}", self.path);
        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Keeps lines in memory. Used for tests and for replaying lines that don't come from a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryLineStore {
    lines: Vec<String>,
}

impl MemoryLineStore {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl LineStore for MemoryLineStore {
    async fn read_lines(&self) -> io::Result<Vec<String>> {
        Ok(self.lines.clone())
    }

    async fn append_line(&mut self, line: &str) -> io::Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use tempfile::{tempdir, NamedTempFile};

    use super::{FileLineStore, LineStore, MemoryLineStore};

    #[tokio::test]
    async fn test_missing_file_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = FileLineStore::new(dir.path().join("clock.txt"));

        assert!(store.read_lines().await?.is_empty());
        assert!(!store.path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_append_creates_file_and_directories() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("clock.txt");
        let mut store = FileLineStore::new(path.clone());

        store.append_line("[2022-10-10]").await?;
        store.append_line("09:00 Task .1").await?;

        assert_eq!(std::fs::read_to_string(&path)?, "[2022-10-10]\n09:00 Task .1\n");
        assert_eq!(store.read_lines().await?, ["[2022-10-10]", "09:00 Task .1"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_append_after_unterminated_line() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"[2022-10-10]\n09:00 Edited by hand")?;

        let mut store = FileLineStore::new(file.path().to_path_buf());
        store.append_line("10:00 Next").await?;

        assert_eq!(
            store.read_lines().await?,
            ["[2022-10-10]", "09:00 Edited by hand", "10:00 Next"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_read_strips_line_endings() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"[2022-10-10]\r\n09:00 Task\r\n")?;

        let store = FileLineStore::new(file.path().to_path_buf());
        assert_eq!(store.read_lines().await?, ["[2022-10-10]", "09:00 Task"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_replaces_invalid_utf8() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"[2022-10-10]\n09:00 Caf\xe9 meeting\n10:00 Next\n")?;

        let store = FileLineStore::new(file.path().to_path_buf());

        assert_eq!(
            store.read_lines().await?,
            ["[2022-10-10]", "09:00 Caf\u{FFFD} meeting", "10:00 Next"]
        );
        Ok(())
    }

    async fn append_through(mut store: impl LineStore, line: &str) -> std::io::Result<()> {
        store.append_line(line).await
    }

    #[tokio::test]
    async fn test_memory_store_through_reference() -> Result<()> {
        let mut memory = MemoryLineStore::new(["a"]);
        append_through(&mut memory, "b").await?;
        assert_eq!(memory.lines(), ["a", "b"]);
        Ok(())
    }
}
