use serialport::SerialPort;
use std::fs::File;
use std::io::{self, Read, Write};

/// Abstraction for byte channels a timer can be reached through (serial port or plain file)
pub trait TimerChannel: Read + Write + Send {
    /// Drop anything the device sent before we started listening
    fn clear_input_buffer(&mut self) -> io::Result<()>;

    /// Human-readable description of the endpoint, for logs
    fn describe(&self) -> String;
}

/// Serial port wrapper implementing TimerChannel
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
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

impl TimerChannel for SerialChannel {
    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::other)
    }

    fn describe(&self) -> String {
        match self.port.name() {
            Some(name) => format!("serial {} @ {} baud", name, self.port.baud_rate().unwrap_or(0)),
            None => "serial (unnamed)".to_string(),
        }
    }
}

/// Plain file wrapper implementing TimerChannel.
///
/// Used in debug mode, where the device path is opened without any line
/// configuration (a FIFO, a pty, or a recorded capture).
pub struct FileChannel {
    file: File,
    path: String,
}

impl FileChannel {
    pub fn new(file: File, path: impl Into<String>) -> Self {
        Self {
            file,
            path: path.into(),
        }
    }
}

impl Read for FileChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FileChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl TimerChannel for FileChannel {
    fn clear_input_buffer(&mut self) -> io::Result<()> {
        // A capture file is replayed from the start; nothing to discard
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path)
    }
}
