#![allow(dead_code)]

use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

/// Scratch directory with a config whose profile requires X×3 and Y×1.
pub struct TestContext {
    pub dir: TempDir,
    pub config: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("autoprov.json");
        let mount_point = dir.path().join("usbkey");
        std::fs::write(
            &config,
            format!(
                r#"{{
                    "mount_point": {:?},
                    "descriptor_name": "task.xidml",
                    "required_instruments": {{"X": 3, "Y": 1}},
                    "settle_delay_secs": 0
                }}"#,
                mount_point
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("autoprov").unwrap();
        cmd.arg("--config").arg(&self.config);
        cmd.timeout(std::time::Duration::from_secs(30));
        cmd
    }

    pub fn write_descriptor(&self, name: &str, parts: &[&str]) -> PathBuf {
        let instruments: String = parts
            .iter()
            .map(|part| {
                format!(
                    "<Instrument><Manufacturer><PartReference>{part}</PartReference></Manufacturer></Instrument>"
                )
            })
            .collect();
        let xml = format!(
            "<Xidml><Instrumentation><InstrumentSet>{instruments}</InstrumentSet></Instrumentation></Xidml>"
        );
        let path = self.dir.path().join(name);
        std::fs::write(&path, xml).unwrap();
        path
    }
}
