pub mod business;
pub mod customer;
pub mod draft;
