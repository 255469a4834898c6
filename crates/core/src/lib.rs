pub mod catalog;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod errors;

pub use catalog::TitleQuery;
pub use checkout::{price_sale, SaleRequest};
pub use domain::product::{Product, ProductId};
pub use domain::sale::Sale;
pub use errors::{ApplicationError, DomainError, InterfaceError};
