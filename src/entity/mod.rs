pub mod cart_lines;
pub mod carts;

pub use cart_lines::Entity as CartLines;
pub use carts::Entity as Carts;
