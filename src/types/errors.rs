use std::fmt;

// === BookmarkError ===

/// Errors raised by the bookmark, category, tag and import/export stores.
#[derive(Debug, Clone, PartialEq)]
pub enum BookmarkError {
    /// A required field is missing or malformed. Raised before any write.
    Validation(String),
    /// No user id was supplied for a per-user operation.
    Unauthenticated,
    /// Bookmark with the given ID was not found.
    NotFound(String),
    /// The referenced category was not found.
    CategoryNotFound(String),
    /// Database operation failed.
    DatabaseError(String),
    /// Failed to encode or decode an import/export document.
    SerializationError(String),
}

impl BookmarkError {
    /// Returns true for problems the user can fix by editing their input.
    pub fn is_validation(&self) -> bool {
        matches!(self, BookmarkError::Validation(_) | BookmarkError::Unauthenticated)
    }
}

impl fmt::Display for BookmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookmarkError::Validation(msg) => write!(f, "{}", msg),
            BookmarkError::Unauthenticated => write!(f, "User ID is required"),
            BookmarkError::NotFound(id) => write!(f, "Bookmark not found: {}", id),
            BookmarkError::CategoryNotFound(id) => write!(f, "Category not found: {}", id),
            BookmarkError::DatabaseError(msg) => {
                write!(f, "Bookmark database error: {}", msg)
            }
            BookmarkError::SerializationError(msg) => {
                write!(f, "Bookmark serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for BookmarkError {}

// === BookmarkActionError ===

/// User-facing mutation performed through the view model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkAction {
    Add,
    Update,
    Delete,
}

impl fmt::Display for BookmarkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookmarkAction::Add => write!(f, "add bookmark"),
            BookmarkAction::Update => write!(f, "update bookmark"),
            BookmarkAction::Delete => write!(f, "delete bookmark"),
        }
    }
}

/// A store error annotated with the action that triggered it.
///
/// Displays as `Failed to <action>: <cause>`.
#[derive(Debug, Clone, PartialEq)]
pub struct BookmarkActionError {
    pub action: BookmarkAction,
    pub source: BookmarkError,
}

impl BookmarkActionError {
    pub fn new(action: BookmarkAction, source: BookmarkError) -> Self {
        Self { action, source }
    }

    /// Whether the failure came from input validation rather than the backend.
    pub fn is_validation(&self) -> bool {
        self.source.is_validation()
    }
}

impl fmt::Display for BookmarkActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to {}: {}", self.action, self.source)
    }
}

impl std::error::Error for BookmarkActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}
