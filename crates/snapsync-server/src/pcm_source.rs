//! The server core receives pre-framed PCM from an opaque blocking byte
//! source (spec §1: pipe/file/process ingest formats are external
//! collaborators). Anything that implements `std::io::Read` qualifies.

use std::io;

/// A blocking PCM byte source. The pacer assumes this is "real-time": a
/// `read_exact` call blocks until enough bytes are available rather than
/// returning short reads (spec §4.3 step 1).
pub trait PcmSource: Send {
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()>;
}

impl<R: io::Read + Send> PcmSource for R {
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        io::Read::read_exact(self, buf)
    }
}
