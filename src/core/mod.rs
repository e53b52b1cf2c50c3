pub mod error;
pub mod types;

pub use error::{DeskError, Result};
pub use types::{
    GuestRequest, RESERVED_FIELDS, RequestStatus, Submission, format_timestamp, now_timestamp,
};
