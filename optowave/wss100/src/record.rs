//! Persistence of acquisition blocks, one labeled text file per measurement.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{WssError, acquire::AcquisitionBlock};

/// One acquisition block together with the command that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct AcquisitionRecord {
    /// The captured samples.
    pub block: AcquisitionBlock,
    /// The pattern-set command that was active during the capture.
    pub command: String,
    /// Whether the device read-back confirmed the pattern before measuring.
    /// Unverified records should be discounted by downstream analysis.
    pub verified: bool,
}

/// Durable storage for acquisition records.
pub trait SampleStore {
    /// Persist one record under the given sequence index.
    fn store(&mut self, index: usize, record: &AcquisitionRecord) -> Result<(), WssError>;
}

/// Hands records to a [`SampleStore`] with a monotonically increasing index.
///
/// The index starts at 0 and advances only when a record was stored
/// successfully, so stored artifacts can always be correlated back to their
/// position in the plan without collision: abandoned sweep steps simply never
/// produce a record, and thus never consume an index.
pub struct ResultRecorder<S: SampleStore> {
    store: S,
    next_index: usize,
}

impl<S: SampleStore> ResultRecorder<S> {
    /// Create a recorder that writes to the given store.
    pub fn new(store: S) -> Self {
        ResultRecorder {
            store,
            next_index: 0,
        }
    }

    /// Persist a record and return the sequence index it was stored under.
    pub fn record(&mut self, record: &AcquisitionRecord) -> Result<usize, WssError> {
        let index = self.next_index;
        self.store.store(index, record)?;
        self.next_index += 1;
        Ok(index)
    }

    /// Number of records stored so far.
    pub fn stored(&self) -> usize {
        self.next_index
    }

    /// Consume the recorder and give the underlying store back.
    pub fn into_store(self) -> S {
        self.store
    }
}

/// A [`SampleStore`] writing one text file per record.
///
/// Files are named `<prefix>_NNN.txt` with a zero-padded three digit index,
/// so lexical ordering equals chronological ordering. Each file starts with a
/// header line carrying the originating command (marked `[unverified]` when
/// the read-back disagreed), followed by one `timestamp,sample` row per
/// sample.
pub struct TextFileStore {
    dir: PathBuf,
    prefix: String,
}

impl TextFileStore {
    /// Create a store writing into the given directory.
    ///
    /// The directory is created on first write if it does not exist. The file
    /// prefix defaults to `"reading"`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        TextFileStore {
            dir: dir.as_ref().to_path_buf(),
            prefix: "reading".to_string(),
        }
    }

    /// Use a different file prefix.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// The file path used for a given sequence index.
    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}_{index:03}.txt", self.prefix))
    }
}

impl SampleStore for TextFileStore {
    fn store(&mut self, index: usize, record: &AcquisitionRecord) -> Result<(), WssError> {
        fs::create_dir_all(&self.dir)?;
        let mut file = BufWriter::new(File::create(self.path_for(index))?);

        let marker = if record.verified { "" } else { " [unverified]" };
        writeln!(file, "# {}{marker}", record.command)?;
        for (timestamp, sample) in record.block.timestamps.iter().zip(&record.block.samples) {
            writeln!(file, "{timestamp},{sample}")?;
        }
        file.flush()?;
        Ok(())
    }
}
