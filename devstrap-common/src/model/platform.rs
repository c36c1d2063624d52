// devstrap-common/src/model/platform.rs

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::DevstrapError;

/// Operating systems the bootstrapper targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Macos,
    Windows,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Linux, Platform::Macos, Platform::Windows];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Macos => "macos",
            Platform::Windows => "windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = DevstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" => Ok(Platform::Linux),
            "macos" | "darwin" => Ok(Platform::Macos),
            "windows" => Ok(Platform::Windows),
            other => Err(DevstrapError::Validation(format!(
                "unknown platform '{other}'"
            ))),
        }
    }
}

/// CPU architectures the bootstrapper targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X64,
    X86,
    Arm64,
    Arm,
}

impl Architecture {
    pub const ALL: [Architecture; 4] = [
        Architecture::X64,
        Architecture::X86,
        Architecture::Arm64,
        Architecture::Arm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X64 => "x64",
            Architecture::X86 => "x86",
            Architecture::Arm64 => "arm64",
            Architecture::Arm => "arm",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = DevstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x64" | "x86_64" | "amd64" => Ok(Architecture::X64),
            "x86" | "i686" => Ok(Architecture::X86),
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            "arm" => Ok(Architecture::Arm),
            other => Err(DevstrapError::Validation(format!(
                "unknown architecture '{other}'"
            ))),
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PlatformSet: u8 {
        const LINUX   = 0b001;
        const MACOS   = 0b010;
        const WINDOWS = 0b100;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ArchSet: u8 {
        const X64   = 0b0001;
        const X86   = 0b0010;
        const ARM64 = 0b0100;
        const ARM   = 0b1000;
    }
}

impl PlatformSet {
    pub fn from_platform(platform: Platform) -> Self {
        match platform {
            Platform::Linux => PlatformSet::LINUX,
            Platform::Macos => PlatformSet::MACOS,
            Platform::Windows => PlatformSet::WINDOWS,
        }
    }

    pub fn from_platforms(platforms: &[Platform]) -> Self {
        platforms
            .iter()
            .fold(PlatformSet::empty(), |acc, p| acc | Self::from_platform(*p))
    }

    pub fn contains_platform(&self, platform: Platform) -> bool {
        self.contains(Self::from_platform(platform))
    }

    pub fn platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .iter()
            .copied()
            .filter(|p| self.contains_platform(*p))
            .collect()
    }
}

impl Default for PlatformSet {
    fn default() -> Self {
        PlatformSet::all()
    }
}

impl ArchSet {
    pub fn from_architecture(arch: Architecture) -> Self {
        match arch {
            Architecture::X64 => ArchSet::X64,
            Architecture::X86 => ArchSet::X86,
            Architecture::Arm64 => ArchSet::ARM64,
            Architecture::Arm => ArchSet::ARM,
        }
    }

    pub fn from_architectures(archs: &[Architecture]) -> Self {
        archs
            .iter()
            .fold(ArchSet::empty(), |acc, a| acc | Self::from_architecture(*a))
    }

    pub fn contains_architecture(&self, arch: Architecture) -> bool {
        self.contains(Self::from_architecture(arch))
    }

    pub fn architectures(&self) -> Vec<Architecture> {
        Architecture::ALL
            .iter()
            .copied()
            .filter(|a| self.contains_architecture(*a))
            .collect()
    }
}

impl Default for ArchSet {
    fn default() -> Self {
        ArchSet::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_set_membership() {
        let set = PlatformSet::from_platforms(&[Platform::Linux, Platform::Macos]);
        assert!(set.contains_platform(Platform::Linux));
        assert!(set.contains_platform(Platform::Macos));
        assert!(!set.contains_platform(Platform::Windows));
        assert_eq!(set.platforms(), vec![Platform::Linux, Platform::Macos]);
    }

    #[test]
    fn arch_aliases_parse() {
        assert_eq!(
            "x86_64".parse::<Architecture>().unwrap(),
            Architecture::X64
        );
        assert_eq!(
            "aarch64".parse::<Architecture>().unwrap(),
            Architecture::Arm64
        );
        assert!("mips".parse::<Architecture>().is_err());
    }

    #[test]
    fn default_sets_are_universal() {
        assert_eq!(PlatformSet::default(), PlatformSet::all());
        assert_eq!(ArchSet::default().architectures().len(), 4);
    }
}
