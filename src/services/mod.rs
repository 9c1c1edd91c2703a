//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They own:
//! - Field validation and the per-field error map
//! - Password hashing and session handling
//! - Media storage for uploaded images
//! - The in-memory feedback list

pub mod feedback;
pub mod library;
pub mod password;
pub mod photo;
pub mod storage;
pub mod todo;
pub mod user;
pub mod validation;

pub use feedback::FeedbackStore;
pub use library::{
    AuthorForm, BookForm, DateHierarchy, DateLink, InlineBookForm, LibraryService,
    LibraryServiceError, PublisherForm,
};
pub use password::{hash_password, verify_password};
pub use photo::{PhotoService, PhotoServiceError, PhotoView};
pub use storage::{MediaStorage, StorageError, MEDIA_URL};
pub use todo::{TodoService, TodoServiceError};
pub use user::{UserService, UserServiceError};
pub use validation::ValidationErrors;
