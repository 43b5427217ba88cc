use crate::core::models::snapshot::AssemblySnapshot;
use crate::core::models::topology::Topology;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing coordinate file formats.
///
/// Coordinate files carry positions only; the molecular identity of each atom
/// comes from a [`Topology`], whose composition splits the file's atoms into
/// molecule instances. Implementors handle format-specific parsing and
/// serialization.
pub trait CoordinateFile {
    /// The type of metadata associated with the file format.
    type Metadata;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a snapshot from a buffered reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The buffered reader to read from.
    /// * `topology` - The topology describing the molecules in the file.
    ///
    /// # Return
    ///
    /// Returns the instantiated snapshot and associated metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails, the topology does not match the
    /// coordinates, or I/O operations encounter issues.
    fn read_from(
        reader: &mut impl BufRead,
        topology: Topology,
    ) -> Result<(AssemblySnapshot, Self::Metadata), Self::Error>;

    /// Writes a snapshot and metadata to a writer.
    ///
    /// # Arguments
    ///
    /// * `snapshot` - The snapshot to write.
    /// * `metadata` - The metadata to include in the output.
    /// * `writer` - The writer to output to.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(
        snapshot: &AssemblySnapshot,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Reads a snapshot from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(
        path: P,
        topology: Topology,
    ) -> Result<(AssemblySnapshot, Self::Metadata), Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, topology)
    }

    /// Writes a snapshot and metadata to a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(
        snapshot: &AssemblySnapshot,
        metadata: &Self::Metadata,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(snapshot, metadata, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
