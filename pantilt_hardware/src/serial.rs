//! Serial link to the camera / servo microcontroller.
//!
//! One port carries both directions: frames in, `PT:`/`ANG:` commands out.
//! `try_clone` splits it so the receiver thread can own the reading half.

use std::io::{Read, Write};
use std::time::Duration;

use pantilt_traits::{ByteSource, CommandSink};

use crate::error::{HwError, Result};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
    name: String,
    /// Last timeout pushed to the driver; re-set only when it changes.
    timeout: Duration,
}

impl SerialLink {
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        let timeout = Duration::from_secs(1);
        let port = serialport::new(path, baud).timeout(timeout).open()?;
        tracing::info!(port = path, baud, "serial port open");
        Ok(Self {
            port,
            name: path.to_string(),
            timeout,
        })
    }

    /// A second handle on the same port.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            port: self.port.try_clone()?,
            name: self.name.clone(),
            timeout: self.timeout,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        if timeout != self.timeout {
            self.port.set_timeout(timeout)?;
            self.timeout = timeout;
        }
        Ok(())
    }
}

impl ByteSource for SerialLink {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> std::result::Result<usize, BoxError> {
        self.set_timeout(timeout)?;
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(0),
            Err(e) => {
                tracing::error!(port = %self.name, error = %e, "serial read failed");
                Err(Box::new(HwError::Io(e)))
            }
        }
    }

    fn clear_input(&mut self) -> std::result::Result<(), BoxError> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| Box::new(HwError::from(e)) as BoxError)
    }
}

impl CommandSink for SerialLink {
    fn send(&mut self, bytes: &[u8]) -> std::result::Result<(), BoxError> {
        self.port.write_all(bytes).map_err(HwError::Io)?;
        self.port.flush().map_err(HwError::Io)?;
        Ok(())
    }
}
