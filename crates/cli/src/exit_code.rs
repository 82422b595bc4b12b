//! Process exit codes.
//!
//! Scripts and CI can tell a project with errors apart from a project that
//! could not be loaded at all.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// No error diagnostics
    Success = 0,
    /// Documents have error diagnostics
    ValidationError = 1,
    /// Config file missing, unreadable or invalid
    ConfigError = 2,
    /// No service schema, or it failed to load
    SchemaError = 3,
    /// A document could not be read
    IoError = 4,
}

impl ExitCode {
    pub fn exit(self) -> ! {
        std::process::exit(self.code())
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::ValidationError => write!(f, "validation error"),
            Self::ConfigError => write!(f, "configuration error"),
            Self::SchemaError => write!(f, "schema load error"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
