use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use forgeshop_core::money::{ensure_positive_price, ensure_positive_quantity};
use forgeshop_core::{
    Aggregate, AggregateRoot, DomainError, Event, ExpectedVersion, Money, UserId, adjust_total,
    domain_id, line_subtotal,
};
use forgeshop_products::ProductId;

domain_id!(
    /// Cart line identifier.
    CartItemId
);

/// Cart line: product, quantity, unit price snapshot taken when added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Aggregate root: Cart (keyed by its owner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    user_id: UserId,
    items: Vec<CartItem>,
    total: Money,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// A fresh, empty cart (materialized lazily on first access).
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            total: Decimal::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn item(&self, item_id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn item_for_product(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Recompute the total from scratch (used by tests and integrity checks).
    pub fn computed_total(&self) -> Money {
        self.items.iter().map(|i| i.subtotal).sum()
    }

    fn item_mut(&mut self, item_id: CartItemId) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }

    fn reprice_line(&mut self, item_id: CartItemId, quantity: i64, unit_price: Money, subtotal: Money) {
        if let Some(item) = self.item_mut(item_id) {
            item.quantity = quantity;
            item.unit_price = unit_price;
            item.subtotal = subtotal;
        }
    }

    /// Total after replacing `current` with `replacement`; the sum is checked
    /// here so `apply` never does fallible arithmetic.
    fn total_after(&self, current: Money, replacement: Money) -> Result<Money, DomainError> {
        adjust_total(self.total, current, replacement)
            .map_err(|_| DomainError::validation("cart total overflows"))
    }
}

impl AggregateRoot for Cart {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.user_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: AddItem.
///
/// `unit_price` and `available_stock` come from the live product record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItem {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub available_stock: i64,
    /// Id used if the product is not in the cart yet.
    pub new_item_id: CartItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateItemQuantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItemQuantity {
    pub user_id: UserId,
    pub item_id: CartItemId,
    pub quantity: i64,
    pub available_stock: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveItem {
    pub user_id: UserId,
    pub item_id: CartItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ClearCart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearCart {
    pub user_id: UserId,
    /// Checkout clears only the revision it priced.
    pub expected_version: ExpectedVersion,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RestoreItems (checkout compensation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreItems {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartCommand {
    AddItem(AddItem),
    UpdateItemQuantity(UpdateItemQuantity),
    RemoveItem(RemoveItem),
    ClearCart(ClearCart),
    RestoreItems(RestoreItems),
}

/// Event: ItemAdded (new line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    pub user_id: UserId,
    pub item: CartItem,
    /// Cart total after the event.
    pub total: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemMerged (repeated add of a product already in the cart).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMerged {
    pub user_id: UserId,
    pub item_id: CartItemId,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
    pub total: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemQuantityChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemQuantityChanged {
    pub user_id: UserId,
    pub item_id: CartItemId,
    pub quantity: i64,
    pub subtotal: Money,
    pub total: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    pub user_id: UserId,
    pub item_id: CartItemId,
    pub total: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CartCleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCleared {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemsRestored.
///
/// `items` are the resulting lines: restored products already in the cart
/// appear with their merged quantity under the existing line id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsRestored {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub total: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartEvent {
    ItemAdded(ItemAdded),
    ItemMerged(ItemMerged),
    ItemQuantityChanged(ItemQuantityChanged),
    ItemRemoved(ItemRemoved),
    CartCleared(CartCleared),
    ItemsRestored(ItemsRestored),
}

impl Event for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::ItemAdded(_) => "carts.cart.item_added",
            CartEvent::ItemMerged(_) => "carts.cart.item_merged",
            CartEvent::ItemQuantityChanged(_) => "carts.cart.item_quantity_changed",
            CartEvent::ItemRemoved(_) => "carts.cart.item_removed",
            CartEvent::CartCleared(_) => "carts.cart.cleared",
            CartEvent::ItemsRestored(_) => "carts.cart.items_restored",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CartEvent::ItemAdded(e) => e.occurred_at,
            CartEvent::ItemMerged(e) => e.occurred_at,
            CartEvent::ItemQuantityChanged(e) => e.occurred_at,
            CartEvent::ItemRemoved(e) => e.occurred_at,
            CartEvent::CartCleared(e) => e.occurred_at,
            CartEvent::ItemsRestored(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Cart {
    type Command = CartCommand;
    type Event = CartEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CartEvent::ItemAdded(e) => {
                self.items.push(e.item.clone());
                self.total = e.total;
            }
            CartEvent::ItemMerged(e) => {
                self.reprice_line(e.item_id, e.quantity, e.unit_price, e.subtotal);
                self.total = e.total;
            }
            CartEvent::ItemQuantityChanged(e) => {
                let unit_price = self.item(e.item_id).map(|i| i.unit_price).unwrap_or_default();
                self.reprice_line(e.item_id, e.quantity, unit_price, e.subtotal);
                self.total = e.total;
            }
            CartEvent::ItemRemoved(e) => {
                self.items.retain(|i| i.id != e.item_id);
                self.total = e.total;
            }
            CartEvent::CartCleared(_) => {
                self.items.clear();
                self.total = Decimal::ZERO;
            }
            CartEvent::ItemsRestored(e) => {
                for item in &e.items {
                    match self.item_mut(item.id) {
                        Some(line) => *line = item.clone(),
                        None => self.items.push(item.clone()),
                    }
                }
                self.total = e.total;
            }
        }

        self.updated_at = event.occurred_at();
        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CartCommand::AddItem(cmd) => self.handle_add(cmd),
            CartCommand::UpdateItemQuantity(cmd) => self.handle_update_quantity(cmd),
            CartCommand::RemoveItem(cmd) => self.handle_remove(cmd),
            CartCommand::ClearCart(cmd) => self.handle_clear(cmd),
            CartCommand::RestoreItems(cmd) => self.handle_restore(cmd),
        }
    }
}

impl Cart {
    fn ensure_owner(&self, user_id: UserId) -> Result<(), DomainError> {
        if self.user_id != user_id {
            return Err(DomainError::invariant("cart owner mismatch"));
        }
        Ok(())
    }

    fn handle_add(&self, cmd: &AddItem) -> Result<Vec<CartEvent>, DomainError> {
        self.ensure_owner(cmd.user_id)?;
        ensure_positive_quantity(cmd.quantity)?;
        ensure_positive_price(cmd.unit_price)?;

        match self.item_for_product(cmd.product_id) {
            Some(existing) => {
                let quantity = existing
                    .quantity
                    .checked_add(cmd.quantity)
                    .ok_or_else(|| DomainError::validation("quantity overflows"))?;
                if quantity > cmd.available_stock {
                    return Err(DomainError::insufficient_stock(
                        cmd.product_id,
                        quantity,
                        cmd.available_stock,
                    ));
                }
                let subtotal = line_subtotal(cmd.unit_price, quantity)?;
                Ok(vec![CartEvent::ItemMerged(ItemMerged {
                    user_id: cmd.user_id,
                    item_id: existing.id,
                    quantity,
                    unit_price: cmd.unit_price,
                    subtotal,
                    total: self.total_after(existing.subtotal, subtotal)?,
                    occurred_at: cmd.occurred_at,
                })])
            }
            None => {
                if cmd.quantity > cmd.available_stock {
                    return Err(DomainError::insufficient_stock(
                        cmd.product_id,
                        cmd.quantity,
                        cmd.available_stock,
                    ));
                }
                if self.item(cmd.new_item_id).is_some() {
                    return Err(DomainError::conflict("cart item id already in use"));
                }
                let subtotal = line_subtotal(cmd.unit_price, cmd.quantity)?;
                Ok(vec![CartEvent::ItemAdded(ItemAdded {
                    user_id: cmd.user_id,
                    item: CartItem {
                        id: cmd.new_item_id,
                        product_id: cmd.product_id,
                        quantity: cmd.quantity,
                        unit_price: cmd.unit_price,
                        subtotal,
                    },
                    total: self.total_after(Decimal::ZERO, subtotal)?,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }

    fn handle_update_quantity(&self, cmd: &UpdateItemQuantity) -> Result<Vec<CartEvent>, DomainError> {
        self.ensure_owner(cmd.user_id)?;
        ensure_positive_quantity(cmd.quantity)?;

        let item = self
            .item(cmd.item_id)
            .ok_or_else(|| DomainError::ItemNotFound(cmd.item_id.to_string()))?;

        if cmd.quantity > cmd.available_stock {
            return Err(DomainError::insufficient_stock(
                item.product_id,
                cmd.quantity,
                cmd.available_stock,
            ));
        }

        let subtotal = line_subtotal(item.unit_price, cmd.quantity)?;
        Ok(vec![CartEvent::ItemQuantityChanged(ItemQuantityChanged {
            user_id: cmd.user_id,
            item_id: cmd.item_id,
            quantity: cmd.quantity,
            subtotal,
            total: self.total_after(item.subtotal, subtotal)?,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove(&self, cmd: &RemoveItem) -> Result<Vec<CartEvent>, DomainError> {
        self.ensure_owner(cmd.user_id)?;
        let item = self
            .item(cmd.item_id)
            .ok_or_else(|| DomainError::ItemNotFound(cmd.item_id.to_string()))?;
        Ok(vec![CartEvent::ItemRemoved(ItemRemoved {
            user_id: cmd.user_id,
            item_id: cmd.item_id,
            total: self.total_after(item.subtotal, Decimal::ZERO)?,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_clear(&self, cmd: &ClearCart) -> Result<Vec<CartEvent>, DomainError> {
        self.ensure_owner(cmd.user_id)?;
        cmd.expected_version.check(self.version)?;
        Ok(vec![CartEvent::CartCleared(CartCleared {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_restore(&self, cmd: &RestoreItems) -> Result<Vec<CartEvent>, DomainError> {
        self.ensure_owner(cmd.user_id)?;
        if cmd.items.is_empty() {
            return Ok(vec![]);
        }

        let mut lines: Vec<CartItem> = Vec::with_capacity(cmd.items.len());
        let mut total = self.total;
        for restored in &cmd.items {
            let current = lines
                .iter()
                .find(|l| l.product_id == restored.product_id)
                .or_else(|| self.item_for_product(restored.product_id))
                .cloned();
            let line = match current {
                Some(existing) => {
                    let quantity = existing
                        .quantity
                        .checked_add(restored.quantity)
                        .ok_or_else(|| DomainError::validation("quantity overflows"))?;
                    CartItem {
                        quantity,
                        subtotal: line_subtotal(existing.unit_price, quantity)?,
                        ..existing
                    }
                }
                None => CartItem {
                    subtotal: line_subtotal(restored.unit_price, restored.quantity)?,
                    ..restored.clone()
                },
            };
            let previous = lines
                .iter()
                .chain(self.items.iter())
                .find(|l| l.id == line.id)
                .map(|l| l.subtotal)
                .unwrap_or(Decimal::ZERO);
            total = adjust_total(total, previous, line.subtotal)
                .map_err(|_| DomainError::validation("cart total overflows"))?;
            match lines.iter_mut().find(|l| l.id == line.id) {
                Some(slot) => *slot = line,
                None => lines.push(line),
            }
        }

        Ok(vec![CartEvent::ItemsRestored(ItemsRestored {
            user_id: cmd.user_id,
            items: lines,
            total,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(cents: i64) -> Money {
        Decimal::new(cents, 2)
    }

    fn add(cart: &Cart, product_id: ProductId, quantity: i64, unit_price: Money, stock: i64) -> CartCommand {
        CartCommand::AddItem(AddItem {
            user_id: cart.user_id(),
            product_id,
            quantity,
            unit_price,
            available_stock: stock,
            new_item_id: CartItemId::generate(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn add_items_accumulates_total() {
        let mut cart = Cart::new(UserId::new(), Utc::now());
        let p1 = ProductId::generate();
        let p2 = ProductId::generate();

        cart.execute(&add(&cart, p1, 2, price(1000), 5)).unwrap();
        cart.execute(&add(&cart, p2, 1, price(350), 9)).unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.total(), price(2350));
        assert_eq!(cart.version(), 2);
    }

    #[test]
    fn repeated_add_merges_into_one_line() {
        let mut cart = Cart::new(UserId::new(), Utc::now());
        let p1 = ProductId::generate();

        cart.execute(&add(&cart, p1, 1, price(1000), 5)).unwrap();
        let events = cart.execute(&add(&cart, p1, 2, price(1000), 5)).unwrap();

        assert!(matches!(events[0], CartEvent::ItemMerged(_)));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.total(), price(3000));
    }

    #[test]
    fn merge_respects_stock() {
        let mut cart = Cart::new(UserId::new(), Utc::now());
        let p1 = ProductId::generate();
        cart.execute(&add(&cart, p1, 4, price(100), 5)).unwrap();
        let err = cart.handle(&add(&cart, p1, 2, price(100), 5)).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(p1, 6, 5));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let cart = Cart::new(UserId::new(), Utc::now());
        let p1 = ProductId::generate();
        assert!(matches!(
            cart.handle(&add(&cart, p1, 0, price(100), 5)),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            cart.handle(&add(&cart, p1, -3, price(100), 5)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn update_quantity_moves_total_by_delta() {
        let mut cart = Cart::new(UserId::new(), Utc::now());
        let p1 = ProductId::generate();
        let p2 = ProductId::generate();
        cart.execute(&add(&cart, p1, 2, price(1000), 5)).unwrap();
        cart.execute(&add(&cart, p2, 1, price(350), 5)).unwrap();
        let item_id = cart.items()[0].id;

        cart.execute(&CartCommand::UpdateItemQuantity(UpdateItemQuantity {
            user_id: cart.user_id(),
            item_id,
            quantity: 4,
            available_stock: 5,
            occurred_at: Utc::now(),
        }))
        .unwrap();

        assert_eq!(cart.item(item_id).unwrap().subtotal, price(4000));
        assert_eq!(cart.total(), price(4350));
    }

    #[test]
    fn unknown_item_is_reported() {
        let cart = Cart::new(UserId::new(), Utc::now());
        let item_id = CartItemId::generate();
        let err = cart
            .handle(&CartCommand::RemoveItem(RemoveItem {
                user_id: cart.user_id(),
                item_id,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::ItemNotFound(item_id.to_string()));

        let err = cart
            .handle(&CartCommand::UpdateItemQuantity(UpdateItemQuantity {
                user_id: cart.user_id(),
                item_id,
                quantity: 1,
                available_stock: 10,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::ItemNotFound(_)));
    }

    #[test]
    fn remove_subtracts_line_subtotal() {
        let mut cart = Cart::new(UserId::new(), Utc::now());
        let p1 = ProductId::generate();
        let p2 = ProductId::generate();
        cart.execute(&add(&cart, p1, 2, price(1000), 5)).unwrap();
        cart.execute(&add(&cart, p2, 1, price(350), 5)).unwrap();
        let item_id = cart.item_for_product(p1).unwrap().id;

        cart.execute(&CartCommand::RemoveItem(RemoveItem {
            user_id: cart.user_id(),
            item_id,
            occurred_at: Utc::now(),
        }))
        .unwrap();

        assert_eq!(cart.total(), price(350));
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn clear_checks_expected_version() {
        let mut cart = Cart::new(UserId::new(), Utc::now());
        cart.execute(&add(&cart, ProductId::generate(), 1, price(100), 5)).unwrap();

        let stale = CartCommand::ClearCart(ClearCart {
            user_id: cart.user_id(),
            expected_version: ExpectedVersion::Exact(0),
            occurred_at: Utc::now(),
        });
        assert!(matches!(cart.handle(&stale), Err(DomainError::Conflict(_))));

        cart.execute(&CartCommand::ClearCart(ClearCart {
            user_id: cart.user_id(),
            expected_version: ExpectedVersion::Exact(1),
            occurred_at: Utc::now(),
        }))
        .unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn restore_merges_back_into_existing_lines() {
        let mut cart = Cart::new(UserId::new(), Utc::now());
        let p1 = ProductId::generate();
        cart.execute(&add(&cart, p1, 1, price(1000), 5)).unwrap();
        let snapshot = cart.items().to_vec();
        cart.execute(&add(&cart, p1, 1, price(1000), 5)).unwrap();

        cart.execute(&CartCommand::RestoreItems(RestoreItems {
            user_id: cart.user_id(),
            items: snapshot,
            occurred_at: Utc::now(),
        }))
        .unwrap();

        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.total(), price(3000));
    }

    #[test]
    fn events_are_named_and_carry_the_running_total() {
        let mut cart = Cart::new(UserId::new(), Utc::now());
        let p1 = ProductId::generate();

        let added = cart.execute(&add(&cart, p1, 1, price(1000), 5)).unwrap();
        let merged = cart.execute(&add(&cart, p1, 2, price(1000), 5)).unwrap();

        assert_eq!(added[0].event_type(), "carts.cart.item_added");
        assert_eq!(merged[0].event_type(), "carts.cart.item_merged");
        match &merged[0] {
            CartEvent::ItemMerged(e) => assert_eq!(e.total, price(3000)),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn total_overflow_is_rejected_without_touching_the_cart() {
        let huge = Decimal::MAX / Decimal::from(2) + Decimal::ONE;
        let mut cart = Cart::new(UserId::new(), Utc::now());
        cart.execute(&add(&cart, ProductId::generate(), 1, huge, 5)).unwrap();
        let before = cart.clone();

        let err = cart
            .execute(&add(&cart, ProductId::generate(), 1, huge, 5))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(cart, before);

        let snapshot = cart.items().to_vec();
        let err = cart
            .execute(&CartCommand::RestoreItems(RestoreItems {
                user_id: cart.user_id(),
                items: snapshot,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(cart, before);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let cart = Cart::new(UserId::new(), Utc::now());
        let before = cart.clone();
        let _ = cart.handle(&add(&cart, ProductId::generate(), 1, price(100), 5)).unwrap();
        assert_eq!(cart, before);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add { product: usize, quantity: i64, cents: i64 },
            Update { line: prop::sample::Index, quantity: i64 },
            Remove { line: prop::sample::Index },
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0usize..4, -1i64..6, 1i64..10_000)
                    .prop_map(|(product, quantity, cents)| Op::Add { product, quantity, cents }),
                (any::<prop::sample::Index>(), -1i64..8)
                    .prop_map(|(line, quantity)| Op::Update { line, quantity }),
                any::<prop::sample::Index>().prop_map(|line| Op::Remove { line }),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: after any sequence of accepted or rejected commands the
            /// running total equals the sum of line subtotals, every line has a
            /// positive quantity and each product appears at most once.
            #[test]
            fn total_equals_sum_of_subtotals(ops in prop::collection::vec(op(), 0..60)) {
                let products: Vec<ProductId> = (0..4).map(|_| ProductId::generate()).collect();
                let mut cart = Cart::new(UserId::new(), Utc::now());

                for op in ops {
                    let cmd = match op {
                        Op::Add { product, quantity, cents } => add(&cart, products[product], quantity, price(cents), 25),
                        Op::Update { line, quantity } => {
                            if cart.items().is_empty() { continue; }
                            let item_id = cart.items()[line.index(cart.items().len())].id;
                            CartCommand::UpdateItemQuantity(UpdateItemQuantity {
                                user_id: cart.user_id(),
                                item_id,
                                quantity,
                                available_stock: 25,
                                occurred_at: Utc::now(),
                            })
                        }
                        Op::Remove { line } => {
                            if cart.items().is_empty() { continue; }
                            let item_id = cart.items()[line.index(cart.items().len())].id;
                            CartCommand::RemoveItem(RemoveItem { user_id: cart.user_id(), item_id, occurred_at: Utc::now() })
                        }
                    };
                    let _ = cart.execute(&cmd);

                    prop_assert_eq!(cart.total(), cart.computed_total());
                    prop_assert!(cart.items().iter().all(|i| i.quantity >= 1));
                    let mut seen = std::collections::HashSet::new();
                    prop_assert!(cart.items().iter().all(|i| seen.insert(i.product_id)));
                }
            }
        }
    }
}
