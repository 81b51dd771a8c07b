use serde::{Deserialize, Serialize};
use serde_json::de::IoRead;
use serde_json::{Deserializer, StreamDeserializer};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::reduce_partition::constants::*;
use crate::reduce_partition::ReduceError;

/// Serialized as `{"Key":...,"Value":...}` plus a newline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn estimated_size(&self) -> usize {
        self.key.len() + self.value.len() + RECORD_OVERHEAD_BYTES
    }
}

pub struct RecordReader<R: Read> {
    path: PathBuf,
    stream: StreamDeserializer<'static, IoRead<BufReader<R>>, KeyValue>,
    records_read: usize,
    failed: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(path: &Path, source: R, buffer_size: usize) -> Self {
        let reader = BufReader::with_capacity(buffer_size, source);
        Self {
            path: path.to_path_buf(),
            stream: Deserializer::from_reader(reader).into_iter::<KeyValue>(),
            records_read: 0,
            failed: false,
        }
    }

    pub fn records_read(&self) -> usize {
        self.records_read
    }

    pub fn byte_offset(&self) -> usize {
        self.stream.byte_offset()
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<KeyValue, ReduceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.stream.next()? {
            Ok(record) => {
                self.records_read += 1;
                Some(Ok(record))
            }
            Err(source) => {
                self.failed = true;
                Some(Err(ReduceError::Decode {
                    path: self.path.clone(),
                    record_index: self.records_read,
                    source,
                }))
            }
        }
    }
}

pub struct RecordWriter<W: Write> {
    path: PathBuf,
    writer: BufWriter<CountingWriter<W>>,
    records_written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(path: &Path, sink: W, buffer_size: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            writer: BufWriter::with_capacity(buffer_size, CountingWriter::new(sink)),
            records_written: 0,
        }
    }

    pub fn write_record(&mut self, record: &KeyValue) -> Result<(), ReduceError> {
        serde_json::to_writer(&mut self.writer, record).map_err(|e| ReduceError::Write {
            path: self.path.clone(),
            source: e.into(),
        })?;
        self.writer
            .write_all(&[RECORD_SEPARATOR])
            .map_err(|source| self.write_error(source))?;
        self.records_written += 1;
        Ok(())
    }

    /// Flushes buffered output, returning the record and byte counts.
    pub fn finish(mut self) -> Result<(usize, u64), ReduceError> {
        self.writer.flush().map_err(|source| self.write_error(source))?;
        Ok((self.records_written, self.writer.get_ref().bytes_written))
    }

    fn write_error(&self, source: io::Error) -> ReduceError {
        ReduceError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes_written: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.bytes_written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub fn decode_all(path: &Path, bytes: &[u8]) -> Result<Vec<KeyValue>, ReduceError> {
    RecordReader::new(path, bytes, bytes.len().max(1)).collect()
}

