//! Domain models shared by the server and its clients

pub mod menu;
pub mod merchant;
pub mod order;

pub use menu::{
    MenuCategory, MenuItem, MenuItemCreate, MenuItemSummary, MenuItemUpdate, SpecOption,
    SpecOptionInput, Specification, SpecificationInput,
};
pub use merchant::Merchant;
pub use order::{
    Assignee, ClaimDetails, ClaimOrderRequest, CreateOrderItemRequest, CreateOrderRequest, Order,
    OrderItem, OrderStatus, SelectedOption, SelectedSpecification, UnknownOrderStatus,
};
