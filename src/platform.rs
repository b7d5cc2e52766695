// src/platform.rs

//! Host platform detection and the pinned runtime release
//!
//! The runtime is a relocatable CPython build published as
//! `cpython-<version>+<release>-<arch>-<triplet>-install_only_stripped.tar.gz`.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Pinned runtime version recorded in the lock file
pub const RUNTIME_VERSION: &str = "3.12.8";

/// Release tag of the standalone build for `RUNTIME_VERSION`
pub const RUNTIME_RELEASE: &str = "20241219";

/// Default download host for runtime archives
pub const DEFAULT_RUNTIME_MIRROR: &str =
    "https://github.com/astral-sh/python-build-standalone/releases/download";

/// CPU architecture of a runtime build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
}

impl Arch {
    /// Architecture of the running binary
    pub fn host() -> Result<Self> {
        Self::parse(std::env::consts::ARCH)
            .ok_or_else(|| Error::UnsupportedPlatform(format!("architecture {}", std::env::consts::ARCH)))
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Some(Self::X86_64),
            "aarch64" | "arm64" => Some(Self::Aarch64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operating system of a runtime build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

impl Os {
    /// Operating system of the running binary
    pub fn host() -> Result<Self> {
        Self::parse(std::env::consts::OS)
            .ok_or_else(|| Error::UnsupportedPlatform(format!("operating system {}", std::env::consts::OS)))
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "macos" | "darwin" => Some(Self::MacOs),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Vendor/OS/ABI part of the target triple
    pub fn triplet(&self) -> &'static str {
        match self {
            Self::Linux => "unknown-linux-gnu",
            Self::MacOs => "apple-darwin",
            Self::Windows => "pc-windows-msvc",
        }
    }
}

/// A runtime release for one (arch, os) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeRelease {
    pub version: String,
    pub release: String,
    pub arch: Arch,
    pub os: Os,
}

impl RuntimeRelease {
    /// The pinned release for the host platform
    pub fn pinned() -> Result<Self> {
        Ok(Self::new(RUNTIME_VERSION, RUNTIME_RELEASE, Arch::host()?, Os::host()?))
    }

    pub fn new(version: &str, release: &str, arch: Arch, os: Os) -> Self {
        Self {
            version: version.to_string(),
            release: release.to_string(),
            arch,
            os,
        }
    }

    /// `major.minor` part of the version
    pub fn short_version(&self) -> String {
        self.version.splitn(3, '.').take(2).collect::<Vec<_>>().join(".")
    }

    /// Archive file name for this release
    pub fn archive_name(&self) -> String {
        format!(
            "cpython-{}+{}-{}-{}-install_only_stripped.tar.gz",
            self.version,
            self.release,
            self.arch,
            self.os.triplet()
        )
    }

    /// Full download URL below the given mirror
    pub fn download_url(&self, mirror: &str) -> String {
        format!(
            "{}/{}/{}",
            mirror.trim_end_matches('/'),
            self.release,
            self.archive_name()
        )
    }

    /// Shared library inside an extracted runtime
    pub fn shared_library(&self, runtime_dir: &Path) -> PathBuf {
        let short = self.short_version();
        match self.os {
            Os::Linux => runtime_dir.join("lib").join(format!("libpython{short}.so.1.0")),
            Os::MacOs => runtime_dir.join("lib").join(format!("libpython{short}.dylib")),
            Os::Windows => runtime_dir.join(format!("python{}.dll", short.replace('.', ""))),
        }
    }

    /// Interpreter executable inside an extracted runtime
    pub fn interpreter(&self, runtime_dir: &Path) -> PathBuf {
        match self.os {
            Os::Linux | Os::MacOs => runtime_dir.join("bin").join("python3"),
            Os::Windows => runtime_dir.join("python.exe"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(arch: Arch, os: Os) -> RuntimeRelease {
        RuntimeRelease::new("3.12.8", "20241219", arch, os)
    }

    #[test]
    fn test_arch_parse() {
        assert_eq!(Arch::parse("amd64"), Some(Arch::X86_64));
        assert_eq!(Arch::parse("arm64"), Some(Arch::Aarch64));
        assert_eq!(Arch::parse("riscv64"), None);
    }

    #[test]
    fn test_os_parse() {
        assert_eq!(Os::parse("darwin"), Some(Os::MacOs));
        assert_eq!(Os::parse("freebsd"), None);
    }

    #[test]
    fn test_archive_name() {
        assert_eq!(
            release(Arch::X86_64, Os::Linux).archive_name(),
            "cpython-3.12.8+20241219-x86_64-unknown-linux-gnu-install_only_stripped.tar.gz"
        );
        assert_eq!(
            release(Arch::Aarch64, Os::MacOs).archive_name(),
            "cpython-3.12.8+20241219-aarch64-apple-darwin-install_only_stripped.tar.gz"
        );
    }

    #[test]
    fn test_download_url_trims_mirror_slash() {
        let url = release(Arch::X86_64, Os::Windows).download_url("https://mirror.example.com/");
        assert_eq!(
            url,
            "https://mirror.example.com/20241219/cpython-3.12.8+20241219-x86_64-pc-windows-msvc-install_only_stripped.tar.gz"
        );
    }

    #[test]
    fn test_shared_library_paths() {
        let dir = Path::new("/root/python");
        assert_eq!(
            release(Arch::X86_64, Os::Linux).shared_library(dir),
            PathBuf::from("/root/python/lib/libpython3.12.so.1.0")
        );
        assert_eq!(
            release(Arch::Aarch64, Os::MacOs).shared_library(dir),
            PathBuf::from("/root/python/lib/libpython3.12.dylib")
        );
        assert_eq!(
            release(Arch::X86_64, Os::Windows).shared_library(dir),
            PathBuf::from("/root/python/python312.dll")
        );
    }

    #[test]
    fn test_short_version() {
        assert_eq!(release(Arch::X86_64, Os::Linux).short_version(), "3.12");
    }
}
