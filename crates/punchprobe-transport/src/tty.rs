use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{PortConfig, SerialPort};

/// A Unix TTY device in raw 8N1 mode.
pub struct TtyPort {
    file: File,
    path: PathBuf,
}

impl TtyPort {
    /// Open and configure a serial device.
    pub fn open(path: impl AsRef<Path>, config: &PortConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !is_supported_baud(config.baud_rate) {
            return Err(TransportError::UnsupportedBaud(config.baud_rate));
        }

        // O_NONBLOCK keeps open() from waiting on carrier detect.
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;

        configure(&file, config).map_err(|e| TransportError::Configure {
            path: path.clone(),
            source: e,
        })?;

        debug!(?path, baud = config.baud_rate, "serial port open");
        Ok(Self { file, path })
    }

    /// Path the port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ioctl_count(&self, request: libc::c_ulong) -> Result<usize> {
        let mut count: libc::c_int = 0;
        // SAFETY: `count` is a valid writable c_int, which is what FIONREAD and
        // TIOCOUTQ write, and the descriptor is owned by `self.file`.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), request as _, &mut count) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(count.max(0) as usize)
    }
}

impl SerialPort for TtyPort {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.file.write_all(data)?;
        Ok(())
    }

    #[cfg(target_os = "linux")]
    fn output_pending(&self) -> Result<usize> {
        self.ioctl_count(libc::TIOCOUTQ as libc::c_ulong)
    }

    #[cfg(not(target_os = "linux"))]
    fn output_pending(&self) -> Result<usize> {
        // No portable output-queue query: wait for the queue to empty instead.
        // SAFETY: the descriptor is owned by `self.file` and open.
        if unsafe { libc::tcdrain(self.file.as_raw_fd()) } != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(0)
    }

    fn bytes_available(&self) -> Result<usize> {
        self.ioctl_count(libc::FIONREAD as libc::c_ulong)
    }

    fn read_available(&mut self, dst: &mut Vec<u8>) -> Result<usize> {
        let available = self.bytes_available()?;
        if available == 0 {
            return Ok(0);
        }

        let start = dst.len();
        dst.resize(start + available, 0);
        let read = loop {
            match self.file.read(&mut dst[start..]) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break 0,
                Err(err) => {
                    dst.truncate(start);
                    return Err(err.into());
                }
            }
        };
        dst.truncate(start + read);
        Ok(read)
    }
}

impl std::fmt::Debug for TtyPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtyPort").field("path", &self.path).finish()
    }
}

fn configure(file: &File, config: &PortConfig) -> std::io::Result<()> {
    let fd = file.as_raw_fd();
    let speed = speed_for(config.baud_rate)
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "unsupported baud rate"))?;

    // SAFETY: termios is a plain C struct; tcgetattr fully initializes it
    // before any field is read.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };
    // SAFETY: `fd` is open and `tio` is a valid writable termios.
    if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `tio` is a valid termios for all calls below.
    unsafe {
        libc::cfmakeraw(&mut tio);
        libc::cfsetispeed(&mut tio, speed);
        libc::cfsetospeed(&mut tio, speed);
    }
    tio.c_cflag &= !(libc::PARENB | libc::CSTOPB | libc::CSIZE);
    tio.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;
    tio.c_cc[libc::VMIN] = 0;
    tio.c_cc[libc::VTIME] = vtime_for(config.read_timeout);

    // SAFETY: `fd` is open and `tio` was initialized by tcgetattr.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // Back to blocking mode; VMIN/VTIME bound the reads.
    // SAFETY: F_GETFL/F_SETFL on an open descriptor.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 || libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) < 0 {
            return Err(std::io::Error::last_os_error());
        }
    }

    Ok(())
}

fn speed_for(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        _ => return None,
    };
    Some(speed)
}

/// Returns true if `baud` maps onto a termios speed.
pub fn is_supported_baud(baud: u32) -> bool {
    speed_for(baud).is_some()
}

/// VTIME is in tenths of a second, capped at 25.5 s.
fn vtime_for(timeout: std::time::Duration) -> libc::cc_t {
    let tenths = timeout.as_millis().div_ceil(100);
    tenths.min(u128::from(u8::MAX)) as libc::cc_t
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn standard_rates_are_supported() {
        for baud in [9600, 19_200, 38_400, 57_600, 115_200] {
            assert!(is_supported_baud(baud), "{baud}");
        }
        assert!(!is_supported_baud(12_345));
    }

    #[test]
    fn vtime_rounds_up_and_caps() {
        assert_eq!(vtime_for(Duration::ZERO), 0);
        assert_eq!(vtime_for(Duration::from_millis(1)), 1);
        assert_eq!(vtime_for(Duration::from_secs(1)), 10);
        assert_eq!(vtime_for(Duration::from_secs(60)), 255);
    }

    #[test]
    fn missing_device_is_open_error() {
        let err = TtyPort::open("/dev/punchprobe-does-not-exist", &PortConfig::default())
            .unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
    }

    #[test]
    fn odd_baud_is_rejected_before_open() {
        let config = PortConfig {
            baud_rate: 12_345,
            ..PortConfig::default()
        };
        let err = TtyPort::open("/dev/null", &config).unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedBaud(12_345)));
    }

    #[test]
    fn non_tty_is_configure_error() {
        let err = TtyPort::open("/dev/null", &PortConfig::default()).unwrap_err();
        assert!(matches!(err, TransportError::Configure { .. }));
    }
}
