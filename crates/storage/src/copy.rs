use std::io::{self, BufReader, Read, Write};

use crate::DEFAULT_COPY_BUFFER_SIZE;

/// Copies every byte from `reader` to `writer`, then flushes the writer.
///
/// No partial-write recovery: the first I/O error is returned as is.
/// If `buffer_size` is 0, [`DEFAULT_COPY_BUFFER_SIZE`] is used.
pub fn copy_stream<R, W>(reader: R, writer: &mut W, buffer_size: usize) -> io::Result<u64>
where
    R: Read,
    W: Write + ?Sized,
{
    let buffer_size = if buffer_size == 0 {
        DEFAULT_COPY_BUFFER_SIZE
    } else {
        buffer_size
    };
    let mut reader = BufReader::with_capacity(buffer_size, reader);
    let copied = io::copy(&mut reader, writer)?;
    writer.flush()?;
    Ok(copied)
}
