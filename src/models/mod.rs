//! Data models for Equiplend

pub mod borrowing;
pub mod enums;
pub mod equipment;
pub mod guest;
pub mod otp;
pub mod return_record;
pub mod user;

// Re-export commonly used types
pub use borrowing::{BorrowingRequest, BorrowingStatus};
pub use enums::{BorrowerType, DamageSeverity, EquipmentStatus, ItemCondition, UserRole};
pub use equipment::EquipmentItem;
pub use guest::{GuestBorrowingRequest, GuestBorrowingStatus};
pub use return_record::{ReturnRecord, ReturnStatus};
