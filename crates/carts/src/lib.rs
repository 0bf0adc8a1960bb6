//! Shopping cart domain module.
//!
//! One cart per user, mutated through commands that emit events. The running
//! total always equals the sum of line subtotals; every event moves it by the
//! exact delta of the lines it touches.

pub mod cart;

pub use cart::{
    AddItem, Cart, CartCleared, CartCommand, CartEvent, CartItem, CartItemId, ClearCart,
    ItemAdded, ItemMerged, ItemQuantityChanged, ItemRemoved, ItemsRestored, RemoveItem,
    RestoreItems, UpdateItemQuantity,
};
