//! Timer link
//!
//! Owns the line-oriented connection to the timer and the handshake that
//! establishes the lane count.

use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Write};
use tracing::{debug, info, warn};

use super::{
    parse_init_banner, serial::open_port, FileChannel, LaneCount, ProtocolError, SerialChannel,
    TimerChannel, MAX_LINE_LEN,
};
use crate::operator::Operator;

/// A line-oriented connection to a race timer.
///
/// Reads block until the device emits a full line; there is no timeout,
/// since the timer only talks when a run completes.
pub trait TimerLink {
    /// Read one line, without its terminator
    fn read_line(&mut self) -> Result<String, ProtocolError>;

    /// Write a single byte to the device
    fn write_byte(&mut self, byte: u8) -> Result<(), ProtocolError>;

    /// Close the connection
    fn close(self)
    where
        Self: Sized,
    {
    }
}

/// Something that can (re)open the timer link
pub trait LinkOpener {
    /// Link type produced by this opener
    type Link: TimerLink;

    /// Open a fresh connection to the timer
    fn open(&mut self) -> Result<Self::Link, ProtocolError>;

    /// Target description for logs and operator messages
    fn target(&self) -> String;
}

/// A live link together with the lane count it was validated against
pub struct LinkSession<L> {
    /// The connection
    pub link: L,
    /// Lane count reported by the timer's banner
    pub lanes: LaneCount,
}

/// [`TimerLink`] over any byte channel, with bounded line reads
pub struct LineLink<C> {
    reader: BufReader<C>,
}

impl<C: TimerChannel> LineLink<C> {
    /// Wrap a channel
    pub fn new(channel: C) -> Self {
        Self {
            reader: BufReader::new(channel),
        }
    }

    /// Access the underlying channel
    pub fn channel(&self) -> &C {
        self.reader.get_ref()
    }

    /// Read up to the next newline, keeping at most `MAX_LINE_LEN - 1`
    /// bytes. Returns the kept bytes and whether anything was dropped.
    fn read_bounded(&mut self) -> Result<(Vec<u8>, bool), ProtocolError> {
        let limit = MAX_LINE_LEN - 1;
        let mut line: Vec<u8> = Vec::with_capacity(MAX_LINE_LEN);
        let mut truncated = false;

        loop {
            let (used, done) = {
                let available = match self.reader.fill_buf() {
                    Ok(buf) => buf,
                    // Serial drivers report an idle line as a timeout; keep waiting
                    Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {
                        continue
                    }
                    Err(e) => return Err(e.into()),
                };

                if available.is_empty() {
                    if line.is_empty() {
                        return Err(ProtocolError::EndOfStream);
                    }
                    break;
                }

                let (chunk, used, done) = match available.iter().position(|&b| b == b'\n') {
                    Some(pos) => {
                        let chunk = &available[..pos];
                        let chunk = chunk.strip_suffix(b"\r").unwrap_or(chunk);
                        (chunk, pos + 1, true)
                    }
                    None => (available, available.len(), false),
                };

                let room = limit.saturating_sub(line.len());
                if chunk.len() > room {
                    truncated = true;
                }
                line.extend_from_slice(&chunk[..chunk.len().min(room)]);
                (used, done)
            };

            self.reader.consume(used);
            if done {
                break;
            }
        }

        Ok((line, truncated))
    }
}

impl<C: TimerChannel> TimerLink for LineLink<C> {
    fn read_line(&mut self) -> Result<String, ProtocolError> {
        let (line, truncated) = self.read_bounded()?;
        if truncated {
            warn!("Timer line exceeded {} bytes; truncated", MAX_LINE_LEN - 1);
        }

        let text = String::from_utf8_lossy(&line)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        debug!("Timer line: {:?}", text);
        Ok(text)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), ProtocolError> {
        let channel = self.reader.get_mut();
        channel.write_all(&[byte])?;
        channel.flush()?;
        Ok(())
    }

    fn close(self) {
        debug!("Closing {}", self.reader.get_ref().describe());
    }
}

/// Opens the timer device, configured as a serial port or as a plain file
#[derive(Debug, Clone)]
pub struct DeviceOpener {
    path: String,
    baud_rate: u32,
    configure: bool,
}

impl DeviceOpener {
    /// Open `path` as a serial port with the timer's line settings
    pub fn serial(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            configure: true,
        }
    }

    /// Open `path` without configuring it (debug mode)
    pub fn unconfigured(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: 0,
            configure: false,
        }
    }

    /// Whether the port gets serial line configuration
    pub fn is_configured(&self) -> bool {
        self.configure
    }
}

impl LinkOpener for DeviceOpener {
    type Link = LineLink<Box<dyn TimerChannel>>;

    fn open(&mut self) -> Result<Self::Link, ProtocolError> {
        let mut channel: Box<dyn TimerChannel> = if self.configure {
            let port = open_port(&self.path, Some(self.baud_rate))?;
            Box::new(SerialChannel::new(port))
        } else {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(&self.path)
                .map_err(|e| ProtocolError::OpenFailed {
                    port: self.path.clone(),
                    reason: e.to_string(),
                })?;
            Box::new(FileChannel::new(file, self.path.clone()))
        };

        if let Err(e) = channel.clear_input_buffer() {
            warn!("Failed to clear timer input buffer: {} (continuing)", e);
        }
        info!("Opened timer link: {}", channel.describe());
        Ok(LineLink::new(channel))
    }

    fn target(&self) -> String {
        self.path.clone()
    }
}

impl<T: TimerChannel + ?Sized> TimerChannel for Box<T> {
    fn clear_input_buffer(&mut self) -> io::Result<()> {
        (**self).clear_input_buffer()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Open the timer and read its init banner.
///
/// The operator is asked to reset the timer, which makes it print its
/// banner. On success the banner and lane count are reported back.
pub fn establish<O, P>(
    opener: &mut O,
    operator: &mut P,
) -> Result<LinkSession<O::Link>, ProtocolError>
where
    O: LinkOpener,
    P: Operator + ?Sized,
{
    let mut link = opener.open()?;

    operator.notice("\nPlease reset the timer. Hold switch closed for 1 second, then open.")?;
    let banner = match link.read_line() {
        Ok(banner) => banner,
        Err(e) => {
            link.close();
            return Err(e);
        }
    };

    let lanes = match parse_init_banner(&banner) {
        Ok(lanes) => lanes,
        Err(e) => {
            link.close();
            return Err(e);
        }
    };

    info!("Timer on {} reports {} lanes ({:?})", opener.target(), lanes, banner);
    operator.notice(&format!(
        "Timer initialized. Timer reports \n\t{}\nFound {} lanes",
        banner, lanes
    ))?;

    Ok(LinkSession { link, lanes })
}
