// src/serial/line_discipline.rs
//! Save and restore the terminal settings of a serial device

#[cfg(unix)]
mod imp {
    use nix::fcntl::OFlag;
    use nix::sys::termios::{self, SetArg, Termios};
    use std::fs::{File, OpenOptions};
    use std::io;
    use std::os::unix::fs::OpenOptionsExt;

    /// Terminal settings captured before the device is reconfigured.
    ///
    /// Holds its own descriptor on the device; the settings are written back when
    /// [`restore`](SavedLineDiscipline::restore) is called or the value is dropped.
    #[derive(Debug)]
    pub struct SavedLineDiscipline {
        device: File,
        saved: Option<Termios>,
    }

    impl SavedLineDiscipline {
        pub fn capture(path: &str) -> io::Result<Self> {
            let device = OpenOptions::new()
                .read(true)
                .write(true)
                .custom_flags((OFlag::O_NOCTTY | OFlag::O_NONBLOCK).bits())
                .open(path)?;
            let saved = termios::tcgetattr(&device).map_err(io::Error::from)?;

            Ok(Self {
                device,
                saved: Some(saved),
            })
        }

        pub fn restore(&mut self) -> io::Result<()> {
            match self.saved.take() {
                Some(saved) => termios::tcsetattr(&self.device, SetArg::TCSANOW, &saved)
                    .map_err(io::Error::from),
                None => Ok(()),
            }
        }
    }

    impl Drop for SavedLineDiscipline {
        fn drop(&mut self) {
            if let Err(e) = self.restore() {
                tracing::error!("Failed to restore terminal settings: {}", e);
            }
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use std::io;

    /// Terminal settings are not tracked on this platform
    #[derive(Debug)]
    pub struct SavedLineDiscipline;

    impl SavedLineDiscipline {
        pub fn capture(_path: &str) -> io::Result<Self> {
            Ok(Self)
        }

        pub fn restore(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

pub use imp::SavedLineDiscipline;

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use nix::pty::openpty;
    use nix::sys::termios::{self, LocalFlags, SetArg};
    use nix::unistd::ttyname;

    fn canonical_pty() -> nix::pty::OpenptyResult {
        let pty = openpty(None, None).unwrap();
        let mut settings = termios::tcgetattr(&pty.slave).unwrap();
        settings.local_flags.insert(LocalFlags::ICANON | LocalFlags::ECHO);
        termios::tcsetattr(&pty.slave, SetArg::TCSANOW, &settings).unwrap();
        pty
    }

    fn scramble(pty: &nix::pty::OpenptyResult) {
        let mut raw = termios::tcgetattr(&pty.slave).unwrap();
        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(&pty.slave, SetArg::TCSANOW, &raw).unwrap();
        let now = termios::tcgetattr(&pty.slave).unwrap();
        assert!(!now.local_flags.contains(LocalFlags::ICANON));
    }

    #[test]
    fn test_restore_puts_settings_back() {
        let pty = canonical_pty();
        let path = ttyname(&pty.slave).unwrap();
        let before = termios::tcgetattr(&pty.slave).unwrap();

        let mut saved = SavedLineDiscipline::capture(path.to_str().unwrap()).unwrap();
        scramble(&pty);
        saved.restore().unwrap();

        let after = termios::tcgetattr(&pty.slave).unwrap();
        assert_eq!(after.local_flags, before.local_flags);
        assert_eq!(after.control_flags, before.control_flags);

        // Only the first restore writes
        scramble(&pty);
        saved.restore().unwrap();
        drop(saved);
        let again = termios::tcgetattr(&pty.slave).unwrap();
        assert!(!again.local_flags.contains(LocalFlags::ICANON));
    }

    #[test]
    fn test_drop_restores_settings() {
        let pty = canonical_pty();
        let path = ttyname(&pty.slave).unwrap();
        let before = termios::tcgetattr(&pty.slave).unwrap();

        let saved = SavedLineDiscipline::capture(path.to_str().unwrap()).unwrap();
        scramble(&pty);
        drop(saved);

        let after = termios::tcgetattr(&pty.slave).unwrap();
        assert_eq!(after.local_flags, before.local_flags);
        assert_eq!(after.input_flags, before.input_flags);
    }

    #[test]
    fn test_capture_missing_device_fails() {
        assert!(SavedLineDiscipline::capture("/dev/gga-fix-no-such-device").is_err());
    }
}
