use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while opening a rubric database or migrating its schema.
#[derive(Debug)]
pub enum DbError {
    /// Connection could not be opened or configured.
    Sqlite(rusqlite::Error),
    /// File was written by a build with newer rubric migrations.
    SchemaTooNew { found: u32, supported: u32 },
    /// A rubric migration failed; the whole pending batch was rolled back.
    MigrationFailed {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "rubric schema version {found} is newer than supported {supported}"
            ),
            Self::MigrationFailed { version, name, .. } => {
                write!(f, "rubric migration {version} `{name}` failed")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::MigrationFailed { source, .. } => Some(source),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
