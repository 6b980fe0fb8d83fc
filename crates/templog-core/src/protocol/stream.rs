//! Channel abstraction over the device connection

use serialport::SerialPort;
use std::io::{self, Read, Write};

/// Byte stream to a datalogger.
///
/// Implemented by [`SerialChannel`] for real hardware and by the demo device.
/// Reads are expected to time out periodically (`ErrorKind::TimedOut` or
/// `WouldBlock`) rather than block forever, so the reader can notice a
/// disconnect request.
pub trait CommunicationChannel: Read + Write + Send {
    /// Discard anything received but not yet read
    fn clear_input_buffer(&mut self) -> io::Result<()>;

    /// Second handle to the same device, used for writing while another
    /// thread reads
    fn try_clone(&self) -> io::Result<Box<dyn CommunicationChannel>>;
}

/// Serial port wrapper implementing CommunicationChannel
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Wrap an opened port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl CommunicationChannel for SerialChannel {
    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::other)
    }

    fn try_clone(&self) -> io::Result<Box<dyn CommunicationChannel>> {
        let port_clone = self.port.try_clone().map_err(io::Error::other)?;
        Ok(Box::new(SerialChannel::new(port_clone)))
    }
}
