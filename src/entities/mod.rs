pub mod allocation;
pub mod borrow_request;
pub mod borrowing;
pub mod history_entry;
pub mod item;
pub mod stock_transaction;
