//! Data models
//!
//! Plain data shared by the repositories, services and handlers:
//! - Database entities (User, Session, Todo, Publisher, Author, Book, Photo)
//! - The in-memory Feedback entry
//! - Validated input types and changelist query types

mod feedback;
mod library;
mod photo;
mod session;
mod todo;
mod upload;
mod user;

pub use feedback::{Feedback, FeedbackForm};
pub use library::{
    next_month, Author, AuthorInput, Book, BookFilter, BookInput, BookSummary, DateBounds,
    DateDrillDown, DateRange, InlineBookInput, LibraryModel, ListQuery, PagedResult, Publisher,
    PublisherInput, LIST_PER_PAGE,
};
pub use photo::Photo;
pub use session::Session;
pub use todo::{Todo, TodoInput, TodoPatch};
pub use upload::UploadedFile;
pub use user::{CreateUserInput, ProfileResponse, ProfileUpdate, User};
