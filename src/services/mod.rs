// Core services
pub mod allocations;
pub mod borrowings;
pub mod issuance;
pub mod items;
pub mod requests;

pub use allocations::AllocationService;
pub use borrowings::BorrowingService;
pub use issuance::IssuanceService;
pub use items::ItemService;
pub use requests::RequestService;
