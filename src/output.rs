use anyhow::anyhow;
use formatx::formatx;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt::Debug;
use std::fs::File;
use std::io;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::rc::Rc;

/// Destination for the result files of a calculation run. Implementations
/// hand out one writer per location key ("results.json", "rooms.csv").
pub trait Output: Debug {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write>;
    /// Whether this output can be considered a no-op and therefore that any
    /// code that only writes to the output can be skipped.
    fn is_noop(&self) -> bool {
        false
    }
}

#[derive(Debug)]
pub struct FileOutput {
    directory_path: PathBuf,
    file_template: String,
}

impl FileOutput {
    pub fn new(directory_path: PathBuf, file_template: String) -> Self {
        Self {
            directory_path,
            file_template,
        }
    }
}

impl Output for FileOutput {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
        let file_name = formatx!(&self.file_template, location_key)
            .map_err(|error| anyhow!("invalid output file template: {error}"))?;
        Ok(BufWriter::new(File::create(
            self.directory_path.join(file_name),
        )?))
    }
}

impl Output for &FileOutput {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
        <FileOutput as Output>::writer_for_location_key(self, location_key)
    }
}

/// An output collecting everything written to it in memory, keyed by
/// location. For embedding callers and tests that want the produced files
/// without touching the filesystem.
#[derive(Debug, Default)]
pub struct BufferOutput {
    buffers: RefCell<IndexMap<String, Rc<RefCell<Vec<u8>>>>>,
}

impl BufferOutput {
    pub fn contents(&self, location_key: &str) -> Option<String> {
        self.buffers
            .borrow()
            .get(location_key)
            .map(|buffer| String::from_utf8_lossy(&buffer.borrow()).into_owned())
    }
}

#[derive(Debug)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Output for BufferOutput {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
        let buffer = self
            .buffers
            .borrow_mut()
            .entry(location_key.to_string())
            .or_default()
            .clone();
        Ok(SharedBuffer(buffer))
    }
}

impl Output for &BufferOutput {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
        <BufferOutput as Output>::writer_for_location_key(self, location_key)
    }
}

/// An output that goes to nowhere/ a "sink"/ /dev/null.
#[derive(Debug, Default)]
pub struct SinkOutput;

impl Output for SinkOutput {
    fn writer_for_location_key(&self, _location_key: &str) -> anyhow::Result<impl Write> {
        Ok(io::sink())
    }

    fn is_noop(&self) -> bool {
        true
    }
}
