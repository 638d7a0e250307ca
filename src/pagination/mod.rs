//! Pagination window and the proximity observer that drives it.

mod observer;
mod window;

pub use observer::ProximityObserver;
pub use window::PaginationWindow;
