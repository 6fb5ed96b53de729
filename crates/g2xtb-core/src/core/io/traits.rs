use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing one record of a text file format.
///
/// Implementors handle format-specific parsing and serialization.
pub trait RecordFile {
    /// The record described by one file.
    type Record;

    /// Information needed to read a file that does not describe its own layout.
    type Shape;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a record from a buffered reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The buffered reader to read from.
    /// * `shape` - Layout information the file itself does not carry.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead, shape: &Self::Shape)
    -> Result<Self::Record, Self::Error>;

    /// Writes a record to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(record: &Self::Record, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads a record from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(
        path: P,
        shape: &Self::Shape,
    ) -> Result<Self::Record, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, shape)
    }

    /// Writes a record to a file path, flushing before returning so that
    /// write failures are reported rather than lost on drop.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(record: &Self::Record, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(record, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
