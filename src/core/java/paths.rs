use std::path::{Path, PathBuf};

const ADOPTIUM_BINARY_BASE: &str = "https://api.adoptium.net/v3/binary/latest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    MacOs,
    Linux,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

/// OS family + CPU architecture a runtime is provisioned for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: OsFamily,
    pub arch: String,
}

impl Platform {
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "windows" => OsFamily::Windows,
            "macos" => OsFamily::MacOs,
            "linux" => OsFamily::Linux,
            _ => OsFamily::Other,
        };
        Self {
            os,
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    pub fn new(os: OsFamily, arch: &str) -> Self {
        Self {
            os,
            arch: arch.to_string(),
        }
    }

    pub fn java_exe(&self) -> &'static str {
        if self.os == OsFamily::Windows {
            "java.exe"
        } else {
            "java"
        }
    }

    /// Where the executable lives for an archive laid out the canonical way.
    pub fn expected_java_path(&self, install_dir: &Path) -> PathBuf {
        match self.os {
            OsFamily::MacOs => install_dir
                .join("Contents")
                .join("Home")
                .join("bin")
                .join(self.java_exe()),
            _ => install_dir.join("bin").join(self.java_exe()),
        }
    }

    pub fn archive_kind(&self) -> ArchiveKind {
        if self.os == OsFamily::Windows {
            ArchiveKind::Zip
        } else {
            ArchiveKind::TarGz
        }
    }

    pub fn archive_name(&self) -> &'static str {
        match self.archive_kind() {
            ArchiveKind::Zip => "java.zip",
            ArchiveKind::TarGz => "java.tar.gz",
        }
    }

    fn adoptium_os(&self) -> Option<&'static str> {
        match self.os {
            OsFamily::Windows => Some("windows"),
            OsFamily::MacOs => Some("mac"),
            OsFamily::Linux => Some("linux"),
            OsFamily::Other => None,
        }
    }

    fn adoptium_arch(&self) -> Option<&'static str> {
        match self.arch.as_str() {
            "x86_64" | "x64" => Some("x64"),
            "aarch64" | "arm64" => Some("aarch64"),
            _ => None,
        }
    }

    /// Download URL of the latest GA JDK build for `major`, if this platform
    /// has one.
    pub fn runtime_download_url(&self, major: u32) -> Option<String> {
        let os = self.adoptium_os()?;
        let arch = self.adoptium_arch()?;
        Some(format!(
            "{ADOPTIUM_BINARY_BASE}/{major}/ga/{os}/{arch}/jdk/hotspot/normal/eclipse?project=jdk"
        ))
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}/{}", self.os, self.arch)
    }
}
