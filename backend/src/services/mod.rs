//! Business logic services for the FahamPesa platform

pub mod auth;
pub mod branch;
pub mod inventory;
pub mod notification;
pub mod product;
pub mod purchase_order;
pub mod supplier;
pub mod transfer;

pub use auth::AuthService;
pub use branch::BranchService;
pub use inventory::InventoryService;
pub use notification::NotificationService;
pub use product::ProductService;
pub use purchase_order::PurchaseOrderService;
pub use supplier::SupplierService;
pub use transfer::TransferService;
