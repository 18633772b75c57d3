use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{GateLevel, GateLine, GatePolarity};

/// Default sysfs GPIO class directory.
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// The export node may appear before udev has fixed its permissions.
const EXPORT_SETTLE_ATTEMPTS: usize = 20;
const EXPORT_SETTLE_DELAY: Duration = Duration::from_millis(10);

/// A GPIO output line driven through sysfs.
#[derive(Debug)]
pub struct SysfsGate {
    pin: u32,
    value_path: PathBuf,
    polarity: GatePolarity,
}

impl SysfsGate {
    /// Export `pin`, make it an output, and leave the gate disabled.
    pub fn open(pin: u32, polarity: GatePolarity) -> Result<Self> {
        Self::open_at(Path::new(SYSFS_GPIO_ROOT), pin, polarity)
    }

    /// Same as [`SysfsGate::open`] under an alternative sysfs root.
    pub fn open_at(root: &Path, pin: u32, polarity: GatePolarity) -> Result<Self> {
        let gpio_err = |source| TransportError::Gpio { pin, source };
        let pin_dir = root.join(format!("gpio{pin}"));

        if !pin_dir.exists() {
            debug!(pin, "exporting gpio");
            std::fs::write(root.join("export"), pin.to_string()).map_err(gpio_err)?;
        }

        let direction = pin_dir.join("direction");
        let mut attempt = 0;
        loop {
            match std::fs::write(&direction, "out") {
                Ok(()) => break,
                Err(err) if attempt + 1 < EXPORT_SETTLE_ATTEMPTS => {
                    debug!(pin, %err, "gpio direction not writable yet");
                    attempt += 1;
                    std::thread::sleep(EXPORT_SETTLE_DELAY);
                }
                Err(err) => return Err(gpio_err(err)),
            }
        }

        let mut gate = Self {
            pin,
            value_path: pin_dir.join("value"),
            polarity,
        };
        gate.set(GateLevel::Disable)?;
        Ok(gate)
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }
}

impl GateLine for SysfsGate {
    fn set(&mut self, level: GateLevel) -> Result<()> {
        let value = if self.polarity.is_high(level) { "1" } else { "0" };
        std::fs::write(&self.value_path, value).map_err(|source| TransportError::Gpio {
            pin: self.pin,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_sysfs(tag: &str, pin: u32) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "punchprobe-gpio-{tag}-{}",
            std::process::id()
        ));
        let pin_dir = root.join(format!("gpio{pin}"));
        std::fs::create_dir_all(&pin_dir).unwrap();
        std::fs::write(pin_dir.join("direction"), "in").unwrap();
        std::fs::write(pin_dir.join("value"), "0").unwrap();
        root
    }

    fn read(path: PathBuf) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn open_sets_direction_and_disables() {
        let root = fake_sysfs("open", 17);
        let gate = SysfsGate::open_at(&root, 17, GatePolarity::ActiveLow).unwrap();

        assert_eq!(gate.pin(), 17);
        assert_eq!(read(root.join("gpio17/direction")), "out");
        assert_eq!(read(root.join("gpio17/value")), "1");
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn set_follows_polarity() {
        let root = fake_sysfs("polarity", 4);
        let mut low = SysfsGate::open_at(&root, 4, GatePolarity::ActiveLow).unwrap();
        low.set(GateLevel::Enable).unwrap();
        assert_eq!(read(root.join("gpio4/value")), "0");

        let mut high = SysfsGate::open_at(&root, 4, GatePolarity::ActiveHigh).unwrap();
        high.set(GateLevel::Enable).unwrap();
        assert_eq!(read(root.join("gpio4/value")), "1");
        high.set(GateLevel::Disable).unwrap();
        assert_eq!(read(root.join("gpio4/value")), "0");
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_root_is_gpio_error() {
        let root = std::env::temp_dir().join(format!(
            "punchprobe-gpio-missing-{}",
            std::process::id()
        ));
        let err = SysfsGate::open_at(&root, 9, GatePolarity::ActiveLow).unwrap_err();
        assert!(matches!(err, TransportError::Gpio { pin: 9, .. }));
    }
}
