//! Request DTOs

pub mod booking;

pub use booking::{
    BookingRequest, CancelVisitRequest, ChangeApplicationRequest, ContactDto,
    CreateApplicationRequest, SupportDto, VisitorDto,
};
