use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{entity::products::Model as ProductModel, error::AppError};

/// Product fields a sale depends on, read once before checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub purchase_price: i64,
    pub stock: i32,
}

impl From<ProductModel> for ProductSnapshot {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: model.price,
            purchase_price: model.purchase_price,
            stock: model.stock,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product: ProductSnapshot,
    pub quantity: i32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Insufficient stock for {name}")]
    InsufficientStock {
        name: String,
        requested: i32,
        available: i32,
    },

    #[error("Product {0} is not in the cart")]
    NotInCart(Uuid),
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// In-memory cart. Each product appears at most once and its quantity never
/// exceeds the stock seen when it was added or incremented.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add one unit of `product`.
    pub fn add(&mut self, product: ProductSnapshot) -> Result<(), CartError> {
        self.add_quantity(product, 1)
    }

    pub fn add_quantity(&mut self, product: ProductSnapshot, quantity: i32) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }

        match self.lines.iter_mut().find(|l| l.product.id == product.id) {
            Some(line) => {
                let requested = line.quantity.saturating_add(quantity);
                check_stock(&product, requested)?;
                // the newer snapshot wins so prices match what was checked
                line.product = product;
                line.quantity = requested;
            }
            None => {
                check_stock(&product, quantity)?;
                self.lines.push(CartLine { product, quantity });
            }
        }
        Ok(())
    }

    /// Set the quantity of a line; zero or less removes it.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: i32) -> Result<(), CartError> {
        if quantity <= 0 {
            return if self.remove(product_id) {
                Ok(())
            } else {
                Err(CartError::NotInCart(product_id))
            };
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product.id == product_id)
            .ok_or(CartError::NotInCart(product_id))?;
        if quantity > line.quantity {
            check_stock(&line.product, quantity)?;
        }
        line.quantity = quantity;
        Ok(())
    }

    pub fn remove(&mut self, product_id: Uuid) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product.id != product_id);
        self.lines.len() != before
    }

    pub fn totals(&self) -> Option<CartTotals> {
        CartTotals::from_lines(&self.lines)
    }
}

fn check_stock(product: &ProductSnapshot, requested: i32) -> Result<(), CartError> {
    if requested > product.stock {
        return Err(CartError::InsufficientStock {
            name: product.name.clone(),
            requested,
            available: product.stock,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartTotals {
    pub total: i64,
    pub total_purchase_price: i64,
}

impl CartTotals {
    /// Sum extended sale and purchase prices. `None` on overflow.
    pub fn from_lines(lines: &[CartLine]) -> Option<Self> {
        lines.iter().try_fold(
            CartTotals {
                total: 0,
                total_purchase_price: 0,
            },
            |acc, line| {
                let qty = i64::from(line.quantity);
                Some(CartTotals {
                    total: acc.total.checked_add(line.product.price.checked_mul(qty)?)?,
                    total_purchase_price: acc
                        .total_purchase_price
                        .checked_add(line.product.purchase_price.checked_mul(qty)?)?,
                })
            },
        )
    }

    pub fn margin(&self) -> i64 {
        self.total - self.total_purchase_price
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn snapshot(name: &str, price: i64, purchase_price: i64, stock: i32) -> ProductSnapshot {
        ProductSnapshot {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            purchase_price,
            stock,
        }
    }

    #[test]
    fn totals_match_worked_example() {
        let mut cart = Cart::new();
        cart.add_quantity(snapshot("A", 10_000, 6_000, 5), 2).unwrap();
        cart.add_quantity(snapshot("B", 5_000, 3_000, 5), 1).unwrap();

        let totals = cart.totals().unwrap();
        assert_eq!(totals.total, 25_000);
        assert_eq!(totals.total_purchase_price, 15_000);
        assert_eq!(totals.margin(), 10_000);
    }

    #[test]
    fn totals_do_not_depend_on_line_order() {
        let a = CartLine {
            product: snapshot("A", 1_250, 900, 10),
            quantity: 3,
        };
        let b = CartLine {
            product: snapshot("B", 7_000, 4_100, 10),
            quantity: 2,
        };
        let c = CartLine {
            product: snapshot("C", 15, 1, 100),
            quantity: 40,
        };

        let forward = CartTotals::from_lines(&[a.clone(), b.clone(), c.clone()]);
        let backward = CartTotals::from_lines(&[c, a, b]);
        assert_eq!(forward, backward);
        assert_eq!(forward.unwrap().total, 3 * 1_250 + 2 * 7_000 + 40 * 15);
    }

    #[test]
    fn totals_report_overflow_as_none() {
        let line = CartLine {
            product: snapshot("huge", i64::MAX, 0, i32::MAX),
            quantity: 2,
        };
        assert_eq!(CartTotals::from_lines(&[line]), None);
    }

    #[test]
    fn adding_the_same_product_merges_lines() {
        let product = snapshot("Tea", 3_000, 2_000, 3);
        let mut cart = Cart::new();
        cart.add(product.clone()).unwrap();
        cart.add(product.clone()).unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn adding_beyond_stock_is_refused_and_leaves_cart_unchanged() {
        let product = snapshot("Tea", 3_000, 2_000, 2);
        let mut cart = Cart::new();
        cart.add_quantity(product.clone(), 2).unwrap();

        let err = cart.add(product.clone()).unwrap_err();
        assert_eq!(
            err,
            CartError::InsufficientStock {
                name: "Tea".into(),
                requested: 3,
                available: 2,
            }
        );
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn zero_quantity_is_rejected_on_add() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.add_quantity(snapshot("X", 1, 1, 1), 0),
            Err(CartError::InvalidQuantity)
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn set_quantity_checks_stock_only_when_increasing() {
        let product = snapshot("Mug", 50_000, 30_000, 4);
        let id = product.id;
        let mut cart = Cart::new();
        cart.add_quantity(product, 3).unwrap();

        cart.set_quantity(id, 1).unwrap();
        assert_eq!(cart.lines()[0].quantity, 1);
        assert!(cart.set_quantity(id, 5).is_err());
        cart.set_quantity(id, 4).unwrap();
        assert_eq!(cart.lines()[0].quantity, 4);
    }

    #[test]
    fn set_quantity_to_zero_removes_line() {
        let product = snapshot("Mug", 50_000, 30_000, 4);
        let id = product.id;
        let mut cart = Cart::new();
        cart.add(product).unwrap();

        cart.set_quantity(id, 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.set_quantity(id, 0), Err(CartError::NotInCart(id)));
    }
}
